//! 按时间轴组合一个栅格要素的矢量化结果

use chrono::NaiveDateTime;
use ndarray::{ArrayViewD, Axis, Ix3, Ix4};
use tracing::{debug, trace};

use crate::{
    patch::{FeatureType, Temporality},
    raster::{RasterData, TraceElement},
    table::GeometryTable,
    vectorize::{vectorize, VectorizeParams},
    window::{Crs, GeoTransform},
    ConversionError, Result,
};

/// 把一个`feature_type`类型的栅格要素矢量化为一张表
///
/// 无时间维的要素是`(height, width, channels)`数组，只调用一次矢量化；
/// 时变要素是`(time, height, width, channels)`数组，按时间顺序逐帧矢量化，
/// 每帧附带对应的时间戳，再按时间顺序拼接（空帧跳过）。
///
/// # 错误
/// - 数据类型不能直接追踪时返回[ConversionError::UnsupportedDType]
/// - 数组维数与时间属性不符时返回[ConversionError::InvalidDimensions]
/// - 时间轴长度与`timestamps`数量不一致时返回[ConversionError::TimestampMismatch]
pub fn compose_layer(
    raster: &RasterData,
    feature_type: FeatureType,
    transform: &GeoTransform,
    crs: Crs,
    timestamps: &[NaiveDateTime],
    params: &VectorizeParams,
) -> Result<GeometryTable> {
    let layer = Layer {
        feature_type,
        transform,
        crs,
        timestamps,
        params,
    };
    match raster {
        RasterData::U8(array) => layer.compose(array.view()),
        RasterData::U16(array) => layer.compose(array.view()),
        RasterData::I16(array) => layer.compose(array.view()),
        RasterData::I32(array) => layer.compose(array.view()),
        RasterData::F32(array) => layer.compose(array.view()),
        other => Err(ConversionError::UnsupportedDType(other.dtype())),
    }
}

struct Layer<'a> {
    feature_type: FeatureType,
    transform: &'a GeoTransform,
    crs: Crs,
    timestamps: &'a [NaiveDateTime],
    params: &'a VectorizeParams,
}

impl Layer<'_> {
    fn compose<T: TraceElement>(&self, raster: ArrayViewD<T>) -> Result<GeometryTable> {
        let found = raster.ndim();
        let dimensions = |expected: usize| {
            let feature_type = self.feature_type;
            move |_| ConversionError::InvalidDimensions {
                feature_type,
                expected,
                found,
            }
        };

        match self.feature_type.temporality() {
            Temporality::Timeless => {
                let slice = raster.into_dimensionality::<Ix3>().map_err(dimensions(3))?;
                vectorize(slice, self.transform, self.crs, self.params, None)
            }
            Temporality::TimeVarying => {
                let frames = raster.into_dimensionality::<Ix4>().map_err(dimensions(4))?;
                let length = frames.len_of(Axis(0));
                if length != self.timestamps.len() {
                    return Err(ConversionError::TimestampMismatch {
                        raster: length,
                        timestamps: self.timestamps.len(),
                    });
                }

                let tables = frames
                    .axis_iter(Axis(0))
                    .zip(self.timestamps)
                    .map(|(slice, &timestamp)| {
                        let table = vectorize(
                            slice,
                            self.transform,
                            self.crs,
                            self.params,
                            Some(timestamp),
                        )?;
                        if table.is_empty() {
                            trace!(%timestamp, "empty frame");
                        }
                        Ok(table)
                    })
                    .collect::<Result<Vec<_>>>()?;
                let joined = GeometryTable::concat(self.crs, self.params.schema(true), tables)?;
                debug!(
                    feature_type = ?self.feature_type,
                    frames = length,
                    rows = joined.len(),
                    "composed time-varying layer"
                );
                Ok(joined)
            }
        }
    }
}
