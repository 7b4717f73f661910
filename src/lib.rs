#![doc = include_str!("../README.md")]
use euclid::{Transform2D, UnknownUnit};
use thiserror::Error;

mod burn;
pub mod clip;
pub mod compose;
mod line;
pub mod patch;
mod poly;
pub mod raster;
pub mod rasterize;
pub mod table;
pub mod task;
pub mod trace;
pub mod vectorize;
pub mod window;
#[cfg(test)]
mod proptests;

pub use burn::{BurnOptions, BurnValue, Burner, MergeAlgorithm, Rasterize};
pub use clip::{clip_to_window, union_polygons};
pub use compose::compose_layer;
pub use patch::{EOPatch, FeatureType, HostPatch, Temporality};
pub use raster::{DType, RasterData, RasterElement, TraceElement};
pub use rasterize::{rasterize, BaseGrid};
pub use table::{GeometryRow, GeometryTable, TableSchema, TIMESTAMP_COLUMN};
pub use task::{
    RasterShape, RasterToVector, RasterToVectorBuilder, VectorToRaster, VectorToRasterBuilder,
};
pub use trace::{trace, Connectivity, TracedShape};
pub use vectorize::{vectorize, ValueFilter, VectorizeParams};
pub use window::{Crs, GeoTransform, SpatialWindow};

/// 仿射变换，用于在世界坐标与像素坐标之间相互转换。
pub type Transform = Transform2D<f64, UnknownUnit, UnknownUnit>;
/// 欧几里得点类型，用于内部坐标计算和转换操作。
type EuclidPoint = euclid::Point2D<f64, UnknownUnit>;

/// 错误的类别
///
/// 配置错误在修改任何宿主状态之前抛出；一致性错误在组合阶段发现。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 请求本身无法执行（形状、要素类型、数据类型等）
    Configuration,
    /// 输入数据彼此矛盾（坐标参考系、时间轴等）
    Consistency,
}

/// 本库的错误类型
#[derive(Error, Clone, Debug, PartialEq)]
pub enum ConversionError {
    /// 提供的几何图形或变换中至少有一个坐标是NaN或无限的
    #[error("提供的几何图形中至少有一个坐标是NaN或无限的")]
    NonFiniteCoordinate,

    /// 构建器中缺少必需的`raster_value`参数
    #[error("构建器中缺少必需的`raster_value`参数")]
    MissingRasterValue,

    /// 构建器中缺少必需的`raster_shape`参数
    #[error("构建器中缺少必需的`raster_shape`参数")]
    MissingRasterShape,

    /// 无法确定输出栅格的形状
    #[error("无法确定栅格图像的形状: {0}")]
    UnresolvableShape(String),

    /// 窗口边界非法（最小值大于最大值或不是有限值）
    #[error("非法的窗口边界 [{min_x}, {min_y}, {max_x}, {max_y}]")]
    InvalidBounds {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },

    /// 该操作不接受这种要素类型
    #[error("不支持的要素类型 {feature_type:?}: {reason}")]
    UnsupportedFeatureType {
        feature_type: patch::FeatureType,
        reason: &'static str,
    },

    /// 边界追踪不支持该数据类型，需要先显式转换
    #[error("边界追踪不支持数据类型 {0:?}，请显式指定 raster_dtype 进行转换")]
    UnsupportedDType(DType),

    /// 已存在的栅格数据类型与请求的不一致
    #[error("数据类型不一致: 期望 {expected:?}，实际为 {found:?}")]
    DTypeMismatch { expected: DType, found: DType },

    /// 栅格形状与期望不一致
    #[error("栅格形状不一致: 期望 {expected:?}，实际为 {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// 栅格维数与要素类型不符
    #[error("要素类型 {feature_type:?} 需要 {expected} 维数组，实际为 {found} 维")]
    InvalidDimensions {
        feature_type: patch::FeatureType,
        expected: usize,
        found: usize,
    },

    /// 宿主中不存在该要素
    #[error("找不到要素 ({0:?}, {1})")]
    MissingFeature(patch::FeatureType, String),

    /// 请求中没有任何要素
    #[error("至少需要指定一个要素")]
    NoFeatures,

    /// 数值无法转换到目标数据类型
    #[error("无法将 {from:?} 类型的值转换为 {to:?}")]
    CastFailed { from: DType, to: DType },

    /// 坐标参考系不一致
    #[error("坐标参考系不一致: 期望 {expected}，实际为 {found}")]
    CrsMismatch { expected: Crs, found: Crs },

    /// 时间轴长度与时间戳数量不一致
    #[error("栅格时间轴长度为 {raster}，但宿主有 {timestamps} 个时间戳")]
    TimestampMismatch { raster: usize, timestamps: usize },

    /// 表格的列结构不一致
    #[error("表格列结构不一致")]
    SchemaMismatch,
}

impl ConversionError {
    /// 返回错误所属的类别
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConversionError::CrsMismatch { .. }
            | ConversionError::TimestampMismatch { .. }
            | ConversionError::SchemaMismatch => ErrorKind::Consistency,
            _ => ErrorKind::Configuration,
        }
    }
}

/// 本库使用的结果类型，使用[ConversionError]作为错误类型。
pub type Result<T> = std::result::Result<T, ConversionError>;
