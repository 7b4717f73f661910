//! 宿主补丁：共用同一边界框和时间轴的栅格与矢量图层容器

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::{
    raster::RasterData, table::GeometryTable, window::SpatialWindow, ConversionError, Result,
};

/// 要素类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureType {
    Data,
    Mask,
    Scalar,
    Label,
    Vector,
    DataTimeless,
    MaskTimeless,
    ScalarTimeless,
    LabelTimeless,
    VectorTimeless,
}

/// 要素是否带有时间轴
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temporality {
    Timeless,
    TimeVarying,
}

impl FeatureType {
    pub fn temporality(&self) -> Temporality {
        match self {
            FeatureType::Data
            | FeatureType::Mask
            | FeatureType::Scalar
            | FeatureType::Label
            | FeatureType::Vector => Temporality::TimeVarying,
            _ => Temporality::Timeless,
        }
    }

    pub fn is_timeless(&self) -> bool {
        self.temporality() == Temporality::Timeless
    }

    /// 是否带有空间维度（栅格或矢量）
    pub fn is_spatial(&self) -> bool {
        matches!(
            self,
            FeatureType::Data
                | FeatureType::Mask
                | FeatureType::Vector
                | FeatureType::DataTimeless
                | FeatureType::MaskTimeless
                | FeatureType::VectorTimeless
        )
    }

    /// 取值是否为离散的类别
    pub fn is_discrete(&self) -> bool {
        matches!(
            self,
            FeatureType::Mask
                | FeatureType::MaskTimeless
                | FeatureType::Label
                | FeatureType::LabelTimeless
        )
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, FeatureType::Vector | FeatureType::VectorTimeless)
    }

    pub fn is_raster(&self) -> bool {
        !self.is_vector()
    }

    /// 该类型栅格数组的维数；矢量类型返回`None`
    pub fn ndim(&self) -> Option<usize> {
        match self {
            FeatureType::Vector | FeatureType::VectorTimeless => None,
            FeatureType::Data | FeatureType::Mask => Some(4),
            FeatureType::DataTimeless | FeatureType::MaskTimeless => Some(3),
            FeatureType::Scalar | FeatureType::Label => Some(2),
            FeatureType::ScalarTimeless | FeatureType::LabelTimeless => Some(1),
        }
    }

    /// 与该栅格类型时间属性相同的矢量类型
    pub fn vector_counterpart(&self) -> FeatureType {
        match self.temporality() {
            Temporality::Timeless => FeatureType::VectorTimeless,
            Temporality::TimeVarying => FeatureType::Vector,
        }
    }
}

/// 宿主补丁需要提供的能力
pub trait HostPatch {
    /// 地理边界框及其坐标参考系
    fn bbox(&self) -> &SpatialWindow;

    /// 与时变要素第一维对齐的时间戳
    fn timestamps(&self) -> &[NaiveDateTime];

    fn raster(&self, feature_type: FeatureType, name: &str) -> Option<&RasterData>;

    fn vector(&self, feature_type: FeatureType, name: &str) -> Option<&GeometryTable>;

    fn set_raster(&mut self, feature_type: FeatureType, name: &str, data: RasterData)
        -> Result<()>;

    fn set_vector(
        &mut self,
        feature_type: FeatureType,
        name: &str,
        table: GeometryTable,
    ) -> Result<()>;

    /// 栅格要素的空间形状`(height, width)`
    fn spatial_dimension(&self, feature_type: FeatureType, name: &str) -> Result<(usize, usize)> {
        if !(feature_type.is_spatial() && feature_type.is_raster()) {
            return Err(ConversionError::UnsupportedFeatureType {
                feature_type,
                reason: "只有空间栅格要素才有空间形状",
            });
        }
        let data = self
            .raster(feature_type, name)
            .ok_or_else(|| ConversionError::MissingFeature(feature_type, name.to_string()))?;
        let shape = data.shape();
        match feature_type.temporality() {
            Temporality::Timeless => Ok((shape[0], shape[1])),
            Temporality::TimeVarying => Ok((shape[1], shape[2])),
        }
    }
}

/// 内存中的补丁
#[derive(Debug, Clone)]
pub struct EOPatch {
    bbox: SpatialWindow,
    timestamps: Vec<NaiveDateTime>,
    rasters: HashMap<(FeatureType, String), RasterData>,
    vectors: HashMap<(FeatureType, String), GeometryTable>,
}

impl EOPatch {
    pub fn new(bbox: SpatialWindow) -> Self {
        EOPatch {
            bbox,
            timestamps: Vec::new(),
            rasters: HashMap::new(),
            vectors: HashMap::new(),
        }
    }

    pub fn with_timestamps(mut self, timestamps: Vec<NaiveDateTime>) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// 链式插入栅格要素
    pub fn with_raster(
        mut self,
        feature_type: FeatureType,
        name: &str,
        data: RasterData,
    ) -> Result<Self> {
        self.set_raster(feature_type, name, data)?;
        Ok(self)
    }
}

impl HostPatch for EOPatch {
    fn bbox(&self) -> &SpatialWindow {
        &self.bbox
    }

    fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    fn raster(&self, feature_type: FeatureType, name: &str) -> Option<&RasterData> {
        self.rasters.get(&(feature_type, name.to_string()))
    }

    fn vector(&self, feature_type: FeatureType, name: &str) -> Option<&GeometryTable> {
        self.vectors.get(&(feature_type, name.to_string()))
    }

    /// 写入栅格要素，维数必须与要素类型相符
    fn set_raster(
        &mut self,
        feature_type: FeatureType,
        name: &str,
        data: RasterData,
    ) -> Result<()> {
        let Some(expected) = feature_type.ndim() else {
            return Err(ConversionError::UnsupportedFeatureType {
                feature_type,
                reason: "矢量要素不能存放栅格数据",
            });
        };
        if data.ndim() != expected {
            return Err(ConversionError::InvalidDimensions {
                feature_type,
                expected,
                found: data.ndim(),
            });
        }
        self.rasters.insert((feature_type, name.to_string()), data);
        Ok(())
    }

    fn set_vector(
        &mut self,
        feature_type: FeatureType,
        name: &str,
        table: GeometryTable,
    ) -> Result<()> {
        if !feature_type.is_vector() {
            return Err(ConversionError::UnsupportedFeatureType {
                feature_type,
                reason: "栅格要素不能存放矢量数据",
            });
        }
        self.vectors.insert((feature_type, name.to_string()), table);
        Ok(())
    }
}
