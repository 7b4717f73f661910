//! 作用在宿主补丁上的两种转换请求
//!
//! [VectorToRaster]把矢量表烧录进一个无时间维的栅格要素，
//! [RasterToVector]把离散栅格要素矢量化为矢量要素。
//! 两者都通过构建器创建，并在构建时检查配置；执行时先算出全部结果，
//! 只有全部成功才写回补丁。

use std::borrow::Cow;

use ndarray::{Axis, Ix3};
use tracing::debug;

use crate::{
    burn::{BurnOptions, MergeAlgorithm},
    clip::clip_to_window,
    compose::compose_layer,
    patch::{FeatureType, HostPatch},
    raster::{DType, RasterElement},
    rasterize::{rasterize, BaseGrid},
    table::GeometryTable,
    trace::Connectivity,
    vectorize::{ValueFilter, VectorizeParams},
    window::GeoTransform,
    ConversionError, Result,
};

/// 输出栅格形状的来源
#[derive(Debug, Clone, PartialEq)]
pub enum RasterShape {
    /// 直接给定`(height, width)`
    Explicit { height: usize, width: usize },
    /// 与补丁中已有的某个栅格要素相同
    Reference(FeatureType, String),
    /// 由像素大小和补丁边界框推算
    Resolution { x: f64, y: f64 },
}

impl RasterShape {
    fn validate(&self) -> Result<()> {
        match self {
            RasterShape::Explicit { height, width } if *height == 0 || *width == 0 => {
                Err(ConversionError::UnresolvableShape(format!(
                    "输出形状 ({height}, {width}) 不能为空"
                )))
            }
            RasterShape::Reference(feature_type, _)
                if !(feature_type.is_spatial() && feature_type.is_raster()) =>
            {
                Err(ConversionError::UnsupportedFeatureType {
                    feature_type: *feature_type,
                    reason: "参考形状必须来自空间栅格要素",
                })
            }
            RasterShape::Resolution { x, y }
                if !(x.is_finite() && y.is_finite() && *x > 0. && *y > 0.) =>
            {
                Err(ConversionError::UnresolvableShape(format!(
                    "非法的像素大小 ({x}, {y})"
                )))
            }
            _ => Ok(()),
        }
    }

    /// 在补丁的边界框上确定像素网格
    fn resolve(&self, patch: &impl HostPatch) -> Result<GeoTransform> {
        let bbox = patch.bbox();
        match self {
            RasterShape::Explicit { height, width } => {
                GeoTransform::from_bounds(bbox, *height, *width)
            }
            RasterShape::Reference(feature_type, name) => {
                let (height, width) = patch.spatial_dimension(*feature_type, name)?;
                GeoTransform::from_bounds(bbox, height, width)
            }
            RasterShape::Resolution { x, y } => GeoTransform::from_resolution(bbox, *x, *y),
        }
    }
}

/// [VectorToRaster]的构建器
///
/// 必须提供`raster_value`和`raster_shape`；未指定的`no_data_value`为零。
///
/// # 示例
///
/// ```rust
/// # fn main() -> eopatch_vectorize::Result<()> {
/// use eopatch_vectorize::{
///     Crs, FeatureType, GeometryTable, RasterShape, VectorToRasterBuilder,
/// };
///
/// let fields = GeometryTable::from_geometries(Crs::new(32633), Vec::<geo::Polygon>::new());
/// let task = VectorToRasterBuilder::new(fields, FeatureType::MaskTimeless, "FIELDS")
///     .raster_value(1u8)
///     .raster_shape(RasterShape::Explicit { height: 64, width: 64 })
///     .build()?;
/// # Ok(())}
/// ```
#[derive(Debug, Clone)]
pub struct VectorToRasterBuilder<T> {
    vector: GeometryTable,
    feature_type: FeatureType,
    name: String,
    raster_value: Option<T>,
    no_data_value: Option<T>,
    raster_shape: Option<RasterShape>,
    options: BurnOptions,
}

impl<T: RasterElement> VectorToRasterBuilder<T> {
    /// 把`vector`烧录进`(feature_type, name)`要素
    pub fn new(vector: GeometryTable, feature_type: FeatureType, name: &str) -> Self {
        VectorToRasterBuilder {
            vector,
            feature_type,
            name: name.to_string(),
            raster_value: None,
            no_data_value: None,
            raster_shape: None,
            options: BurnOptions::default(),
        }
    }

    /// 多边形内部像素的值
    pub fn raster_value(mut self, value: T) -> Self {
        self.raster_value = Some(value);
        self
    }

    /// 新建栅格时多边形外部像素的值
    pub fn no_data_value(mut self, value: T) -> Self {
        self.no_data_value = Some(value);
        self
    }

    pub fn raster_shape(mut self, shape: RasterShape) -> Self {
        self.raster_shape = Some(shape);
        self
    }

    /// 是否烧录所有被边界触及的像素
    pub fn all_touched(mut self, all_touched: bool) -> Self {
        self.options.all_touched = all_touched;
        self
    }

    pub fn merge_algorithm(mut self, algorithm: MergeAlgorithm) -> Self {
        self.options.merge_algorithm = algorithm;
        self
    }

    /// # 错误
    /// - 目标不是无时间维的空间栅格要素时返回[ConversionError::UnsupportedFeatureType]
    /// - 缺少`raster_value`或`raster_shape`时返回相应的错误
    /// - 形状参数本身非法时返回[ConversionError::UnresolvableShape]
    pub fn build(self) -> Result<VectorToRaster<T>> {
        let feature_type = self.feature_type;
        if !(feature_type.is_raster() && feature_type.is_spatial() && feature_type.is_timeless()) {
            return Err(ConversionError::UnsupportedFeatureType {
                feature_type,
                reason: "只能烧录到无时间维的空间栅格要素",
            });
        }
        let raster_value = self
            .raster_value
            .ok_or(ConversionError::MissingRasterValue)?;
        let raster_shape = self
            .raster_shape
            .ok_or(ConversionError::MissingRasterShape)?;
        raster_shape.validate()?;

        Ok(VectorToRaster {
            vector: self.vector,
            feature_type,
            name: self.name,
            raster_value,
            no_data_value: self.no_data_value.unwrap_or_else(T::zero),
            raster_shape,
            options: self.options,
        })
    }
}

/// 把矢量表烧录进补丁的栅格要素
///
/// 矢量数据先裁剪到补丁边界框；目标要素已存在时在其内容之上烧录，
/// 否则新建一个填充`no_data_value`的栅格。输出形状为`(height, width, 1)`。
#[derive(Debug, Clone)]
pub struct VectorToRaster<T> {
    vector: GeometryTable,
    feature_type: FeatureType,
    name: String,
    raster_value: T,
    no_data_value: T,
    raster_shape: RasterShape,
    options: BurnOptions,
}

impl<T: RasterElement> VectorToRaster<T> {
    /// 烧录并写回补丁；出错时补丁保持不变
    ///
    /// # 错误
    /// - 已有目标要素的数据类型不是`T`时返回[ConversionError::DTypeMismatch]
    /// - 已有目标要素的形状不是`(height, width, 1)`时返回[ConversionError::ShapeMismatch]
    /// - 矢量表与补丁的坐标参考系不同时返回[ConversionError::CrsMismatch]
    pub fn execute(&self, patch: &mut impl HostPatch) -> Result<()> {
        let transform = self.raster_shape.resolve(&*patch)?;
        let (height, width) = transform.shape();

        let base = match patch.raster(self.feature_type, &self.name) {
            Some(existing) => {
                let view = existing
                    .view::<T>()
                    .ok_or(ConversionError::DTypeMismatch {
                        expected: T::DTYPE,
                        found: existing.dtype(),
                    })?;
                let mismatch = || ConversionError::ShapeMismatch {
                    expected: vec![height, width, 1],
                    found: existing.shape().to_vec(),
                };
                if view.shape() != [height, width, 1] {
                    return Err(mismatch());
                }
                let view = view.into_dimensionality::<Ix3>().map_err(|_| mismatch())?;
                BaseGrid::Existing(view.index_axis(Axis(2), 0).to_owned())
            }
            None => BaseGrid::New {
                height,
                width,
                fill: self.no_data_value,
            },
        };

        let clipped = clip_to_window(&self.vector, patch.bbox())?;
        debug!(
            feature_type = ?self.feature_type,
            name = %self.name,
            height,
            width,
            rows = clipped.len(),
            "rasterizing vector data"
        );
        let grid = rasterize(&clipped, base, self.raster_value, &transform, &self.options)?;
        patch.set_raster(self.feature_type, &self.name, T::into_data(grid.into_dyn()))
    }
}

/// 一个待矢量化的要素及其输出名称
#[derive(Debug, Clone, PartialEq)]
struct FeatureRequest {
    feature_type: FeatureType,
    name: String,
    new_name: String,
}

/// [RasterToVector]的构建器
///
/// # 示例
///
/// ```rust
/// # fn main() -> eopatch_vectorize::Result<()> {
/// use eopatch_vectorize::{Connectivity, FeatureType, RasterToVectorBuilder};
///
/// let task = RasterToVectorBuilder::new()
///     .feature(FeatureType::Mask, "CLM")
///     .renamed_feature(FeatureType::MaskTimeless, "LULC", "LULC_POLYGONS")
///     .values([1., 2.])
///     .connectivity(Connectivity::Eight)
///     .build()?;
/// # Ok(())}
/// ```
#[derive(Debug, Clone, Default)]
pub struct RasterToVectorBuilder {
    features: Vec<FeatureRequest>,
    params: VectorizeParams,
    raster_dtype: Option<DType>,
}

impl RasterToVectorBuilder {
    pub fn new() -> Self {
        RasterToVectorBuilder::default()
    }

    /// 矢量化`(feature_type, name)`，输出使用同一个名称
    pub fn feature(self, feature_type: FeatureType, name: &str) -> Self {
        self.renamed_feature(feature_type, name, name)
    }

    /// 矢量化`(feature_type, name)`，输出名为`new_name`
    pub fn renamed_feature(
        mut self,
        feature_type: FeatureType,
        name: &str,
        new_name: &str,
    ) -> Self {
        self.features.push(FeatureRequest {
            feature_type,
            name: name.to_string(),
            new_name: new_name.to_string(),
        });
        self
    }

    /// 只矢量化这些取值；不调用或给出空集合时所有取值都参与
    pub fn values(mut self, values: impl IntoIterator<Item = f64>) -> Self {
        self.params.values = Some(ValueFilter::new(values));
        self
    }

    /// 值列的名称，默认为`VALUE`
    pub fn value_column_name(mut self, name: &str) -> Self {
        self.params.value_column = Some(name.to_string());
        self
    }

    /// 输出表不带值列
    pub fn without_value_column(mut self) -> Self {
        self.params.value_column = None;
        self
    }

    /// 矢量化之前先把栅格显式转换为该类型
    pub fn raster_dtype(mut self, dtype: DType) -> Self {
        self.raster_dtype = Some(dtype);
        self
    }

    pub fn connectivity(mut self, connectivity: Connectivity) -> Self {
        self.params.connectivity = connectivity;
        self
    }

    /// 一次性替换全部矢量化参数
    pub fn params(mut self, params: VectorizeParams) -> Self {
        self.params = params;
        self
    }

    /// # 错误
    /// - 没有任何要素时返回[ConversionError::NoFeatures]
    /// - 要素不是离散的空间栅格时返回[ConversionError::UnsupportedFeatureType]
    /// - `raster_dtype`不能直接追踪时返回[ConversionError::UnsupportedDType]
    pub fn build(self) -> Result<RasterToVector> {
        if self.features.is_empty() {
            return Err(ConversionError::NoFeatures);
        }
        for request in &self.features {
            let feature_type = request.feature_type;
            let traceable =
                feature_type.is_spatial() && feature_type.is_discrete() && feature_type.is_raster();
            if !traceable {
                return Err(ConversionError::UnsupportedFeatureType {
                    feature_type,
                    reason: "只能矢量化离散的空间栅格要素",
                });
            }
        }
        if let Some(dtype) = self.raster_dtype {
            if !dtype.is_traceable() {
                return Err(ConversionError::UnsupportedDType(dtype));
            }
        }
        Ok(RasterToVector {
            features: self.features,
            params: self.params,
            raster_dtype: self.raster_dtype,
        })
    }
}

/// 把离散栅格要素矢量化为矢量要素
///
/// 每个要素得到一张独立的表，写入与源要素时间属性相同的矢量类型。
#[derive(Debug, Clone)]
pub struct RasterToVector {
    features: Vec<FeatureRequest>,
    params: VectorizeParams,
    raster_dtype: Option<DType>,
}

impl RasterToVector {
    pub fn params(&self) -> &VectorizeParams {
        &self.params
    }

    /// 矢量化全部要素并写回补丁；任何一个要素出错时补丁保持不变
    ///
    /// # 错误
    /// 要素不存在时返回[ConversionError::MissingFeature]，
    /// 其余错误来自类型转换和[compose_layer]
    pub fn execute(&self, patch: &mut impl HostPatch) -> Result<()> {
        let mut outputs = Vec::with_capacity(self.features.len());
        for request in &self.features {
            let FeatureRequest {
                feature_type,
                name,
                new_name,
            } = request;
            let data = patch
                .raster(*feature_type, name)
                .ok_or_else(|| ConversionError::MissingFeature(*feature_type, name.clone()))?;
            let data = match self.raster_dtype {
                Some(dtype) => Cow::Owned(data.cast(dtype)?),
                None => Cow::Borrowed(data),
            };

            let (height, width) = patch.spatial_dimension(*feature_type, name)?;
            let transform = GeoTransform::from_bounds(patch.bbox(), height, width)?;
            let table = compose_layer(
                &data,
                *feature_type,
                &transform,
                patch.bbox().crs(),
                patch.timestamps(),
                &self.params,
            )?;
            debug!(
                feature_type = ?feature_type,
                name = %name,
                rows = table.len(),
                "vectorized raster feature"
            );
            outputs.push((feature_type.vector_counterpart(), new_name.as_str(), table));
        }

        for (feature_type, name, table) in outputs {
            patch.set_vector(feature_type, name, table)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};
    use geo::{Area, Geometry, Rect};
    use ndarray::{s, Array, Array3};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        patch::EOPatch,
        raster::RasterData,
        window::{Crs, SpatialWindow},
    };

    const UTM: Crs = Crs::new(32633);

    fn patch() -> EOPatch {
        EOPatch::new(SpatialWindow::new((0., 0.), (10., 10.), UTM).unwrap())
    }

    fn square() -> GeometryTable {
        GeometryTable::from_geometries(UTM, vec![Rect::new((2., 2.), (6., 6.))])
    }

    fn stamp(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 7, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap()
    }

    fn explicit() -> RasterShape {
        RasterShape::Explicit {
            height: 10,
            width: 10,
        }
    }

    #[test]
    fn burn_square_into_new_feature() {
        let mut patch = patch();
        VectorToRasterBuilder::new(square(), FeatureType::MaskTimeless, "SQUARE")
            .raster_value(1u8)
            .raster_shape(explicit())
            .build()
            .unwrap()
            .execute(&mut patch)
            .unwrap();

        let data = patch.raster(FeatureType::MaskTimeless, "SQUARE").unwrap();
        assert_eq!(data.shape(), &[10, 10, 1]);
        let grid = data.view::<u8>().unwrap();
        assert_eq!(grid.iter().filter(|&&v| v == 1).count(), 16);
        let mut expected = Array3::<u8>::zeros((10, 10, 1));
        expected.slice_mut(s![4..8, 2..6, 0]).fill(1);
        assert_eq!(grid, expected.into_dyn());
    }

    #[test]
    fn no_data_fills_the_outside() {
        let mut patch = patch();
        VectorToRasterBuilder::new(square(), FeatureType::DataTimeless, "HEIGHT")
            .raster_value(2.5f32)
            .no_data_value(-1.)
            .raster_shape(RasterShape::Resolution { x: 2., y: 2. })
            .build()
            .unwrap()
            .execute(&mut patch)
            .unwrap();
        let data = patch.raster(FeatureType::DataTimeless, "HEIGHT").unwrap();
        assert_eq!(data.shape(), &[5, 5, 1]);
        let grid = data.view::<f32>().unwrap();
        assert_eq!(grid.iter().filter(|&&v| v == 2.5).count(), 4);
        assert_eq!(grid.iter().filter(|&&v| v == -1.).count(), 21);
    }

    #[test]
    fn reference_shape_and_existing_content() {
        let mut existing = Array3::<u16>::zeros((20, 20, 1));
        existing[[0, 0, 0]] = 42;
        let mut patch = patch()
            .with_raster(
                FeatureType::MaskTimeless,
                "LULC",
                RasterData::U16(existing.into_dyn()),
            )
            .unwrap();
        VectorToRasterBuilder::new(square(), FeatureType::MaskTimeless, "LULC")
            .raster_value(7u16)
            .raster_shape(RasterShape::Reference(FeatureType::MaskTimeless, "LULC".into()))
            .build()
            .unwrap()
            .execute(&mut patch)
            .unwrap();
        let grid = patch.raster(FeatureType::MaskTimeless, "LULC").unwrap();
        let grid = grid.view::<u16>().unwrap();
        assert_eq!(grid[[0, 0, 0].as_slice()], 42);
        assert_eq!(grid.iter().filter(|&&v| v == 7).count(), 64);
    }

    #[test]
    fn existing_feature_must_match() {
        let wrong_dtype = patch()
            .with_raster(
                FeatureType::MaskTimeless,
                "SQUARE",
                RasterData::I32(Array::zeros((10, 10, 1)).into_dyn()),
            )
            .unwrap();
        let task = VectorToRasterBuilder::new(square(), FeatureType::MaskTimeless, "SQUARE")
            .raster_value(1u8)
            .raster_shape(explicit())
            .build()
            .unwrap();
        let mut target = wrong_dtype.clone();
        assert_eq!(
            task.execute(&mut target),
            Err(ConversionError::DTypeMismatch {
                expected: DType::U8,
                found: DType::I32
            })
        );
        assert_eq!(
            target.raster(FeatureType::MaskTimeless, "SQUARE"),
            wrong_dtype.raster(FeatureType::MaskTimeless, "SQUARE")
        );

        let mut two_channels = patch()
            .with_raster(
                FeatureType::MaskTimeless,
                "SQUARE",
                RasterData::U8(Array::zeros((10, 10, 2)).into_dyn()),
            )
            .unwrap();
        assert_eq!(
            task.execute(&mut two_channels),
            Err(ConversionError::ShapeMismatch {
                expected: vec![10, 10, 1],
                found: vec![10, 10, 2]
            })
        );
    }

    #[test]
    fn vector_to_raster_configuration_errors() {
        let missing_value =
            VectorToRasterBuilder::<u8>::new(square(), FeatureType::MaskTimeless, "M")
                .raster_shape(explicit())
                .build();
        assert_eq!(missing_value.unwrap_err(), ConversionError::MissingRasterValue);

        let missing_shape = VectorToRasterBuilder::new(square(), FeatureType::MaskTimeless, "M")
            .raster_value(1u8)
            .build();
        assert_eq!(missing_shape.unwrap_err(), ConversionError::MissingRasterShape);

        for feature_type in [
            FeatureType::Mask,
            FeatureType::LabelTimeless,
            FeatureType::VectorTimeless,
        ] {
            let err = VectorToRasterBuilder::new(square(), feature_type, "M")
                .raster_value(1u8)
                .raster_shape(explicit())
                .build()
                .unwrap_err();
            assert!(matches!(err, ConversionError::UnsupportedFeatureType { .. }));
        }

        let zero = VectorToRasterBuilder::new(square(), FeatureType::MaskTimeless, "M")
            .raster_value(1u8)
            .raster_shape(RasterShape::Explicit { height: 0, width: 3 })
            .build()
            .unwrap_err();
        assert!(matches!(zero, ConversionError::UnresolvableShape(_)));
    }

    #[test]
    fn foreign_crs_leaves_patch_untouched() {
        let mut patch = patch();
        let data = GeometryTable::from_geometries(Crs::WGS84, vec![Rect::new((2., 2.), (6., 6.))]);
        let err = VectorToRasterBuilder::new(data, FeatureType::MaskTimeless, "SQUARE")
            .raster_value(1u8)
            .raster_shape(explicit())
            .build()
            .unwrap()
            .execute(&mut patch)
            .unwrap_err();
        assert!(matches!(err, ConversionError::CrsMismatch { .. }));
        assert!(patch.raster(FeatureType::MaskTimeless, "SQUARE").is_none());
    }

    fn cloud_patch() -> EOPatch {
        let mut clouds = Array::zeros((2, 10, 10, 1));
        clouds.slice_mut(s![0, 0..2, 0..2, 0]).fill(1u8);
        clouds.slice_mut(s![1, 5..10, 5..10, 0]).fill(1u8);
        patch()
            .with_timestamps(vec![stamp(1), stamp(6)])
            .with_raster(FeatureType::Mask, "CLM", RasterData::U8(clouds.into_dyn()))
            .unwrap()
    }

    #[test]
    fn vectorize_time_varying_mask() {
        let mut patch = cloud_patch();
        RasterToVectorBuilder::new()
            .renamed_feature(FeatureType::Mask, "CLM", "CLOUDS")
            .values([1.])
            .build()
            .unwrap()
            .execute(&mut patch)
            .unwrap();

        let table = patch.vector(FeatureType::Vector, "CLOUDS").unwrap();
        assert_eq!(table.crs(), UTM);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].timestamp, Some(stamp(1)));
        assert_eq!(table.rows()[1].timestamp, Some(stamp(6)));
        assert_eq!(table.rows()[0].geometry.unsigned_area(), 4.);
        assert_eq!(table.rows()[1].geometry.unsigned_area(), 25.);
        assert!(table.iter().all(|row| matches!(row.geometry, Geometry::Polygon(_))));
    }

    #[test]
    fn cast_before_vectorizing() {
        let labels = Array3::from_shape_fn((10, 10, 1), |(r, _, _)| (r / 5) as i64);
        let mut patch = patch()
            .with_raster(
                FeatureType::MaskTimeless,
                "LABELS",
                RasterData::I64(labels.into_dyn()),
            )
            .unwrap();

        let plain = RasterToVectorBuilder::new()
            .feature(FeatureType::MaskTimeless, "LABELS")
            .build()
            .unwrap();
        assert_eq!(
            plain.execute(&mut patch),
            Err(ConversionError::UnsupportedDType(DType::I64))
        );

        RasterToVectorBuilder::new()
            .feature(FeatureType::MaskTimeless, "LABELS")
            .raster_dtype(DType::U8)
            .without_value_column()
            .build()
            .unwrap()
            .execute(&mut patch)
            .unwrap();
        let table = patch.vector(FeatureType::VectorTimeless, "LABELS").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.schema().columns(), vec!["geometry"]);
    }

    #[test]
    fn missing_feature_writes_nothing() {
        let mut patch = cloud_patch();
        let err = RasterToVectorBuilder::new()
            .feature(FeatureType::Mask, "CLM")
            .feature(FeatureType::MaskTimeless, "ABSENT")
            .build()
            .unwrap()
            .execute(&mut patch)
            .unwrap_err();
        assert_eq!(
            err,
            ConversionError::MissingFeature(FeatureType::MaskTimeless, "ABSENT".into())
        );
        assert!(patch.vector(FeatureType::Vector, "CLM").is_none());
    }

    #[test]
    fn raster_to_vector_configuration_errors() {
        assert_eq!(
            RasterToVectorBuilder::new().build().unwrap_err(),
            ConversionError::NoFeatures
        );
        for feature_type in [FeatureType::Data, FeatureType::LabelTimeless, FeatureType::Vector] {
            assert!(matches!(
                RasterToVectorBuilder::new()
                    .feature(feature_type, "X")
                    .build()
                    .unwrap_err(),
                ConversionError::UnsupportedFeatureType { .. }
            ));
        }
        assert_eq!(
            RasterToVectorBuilder::new()
                .feature(FeatureType::Mask, "CLM")
                .raster_dtype(DType::F64)
                .build()
                .unwrap_err(),
            ConversionError::UnsupportedDType(DType::F64)
        );
    }

    #[test]
    fn empty_values_vectorize_everything() {
        let mut patch = cloud_patch();
        RasterToVectorBuilder::new()
            .feature(FeatureType::Mask, "CLM")
            .values(Vec::new())
            .build()
            .unwrap()
            .execute(&mut patch)
            .unwrap();

        let table = patch.vector(FeatureType::Vector, "CLM").unwrap();
        let values: Vec<_> = table.iter().filter_map(|row| row.value).collect();
        assert_eq!(values, vec![1., 0., 0., 1.]);
    }

    #[test]
    fn custom_value_column() {
        let mut patch = cloud_patch();
        let task = RasterToVectorBuilder::new()
            .feature(FeatureType::Mask, "CLM")
            .values([1.])
            .value_column_name("CLOUD")
            .build()
            .unwrap();
        assert_eq!(task.params().value_column.as_deref(), Some("CLOUD"));
        task.execute(&mut patch).unwrap();
        let table = patch.vector(FeatureType::Vector, "CLM").unwrap();
        assert_eq!(
            table.schema().columns(),
            vec!["geometry", "CLOUD", "TIMESTAMP"]
        );
    }
}
