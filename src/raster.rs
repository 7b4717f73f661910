//! 动态数据类型的栅格数组
//!
//! 宿主中的栅格要素可能是任意标量类型；[RasterData]把具体的`ndarray`数组
//! 包在一个封闭的枚举里，[RasterElement]在泛型代码和枚举之间来回转换。

use std::fmt::Debug;

use ndarray::{ArrayD, ArrayViewD};
use num_traits::NumCast;
use serde::{Deserialize, Serialize};

use crate::{burn::BurnValue, ConversionError, Result};

/// 栅格的标量数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    U8,
    U16,
    U32,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl DType {
    /// 边界追踪原语能否直接处理该类型
    pub fn is_traceable(&self) -> bool {
        matches!(
            self,
            DType::U8 | DType::U16 | DType::I16 | DType::I32 | DType::F32
        )
    }
}

/// 带有运行时数据类型标签的栅格数组
#[derive(Debug, Clone, PartialEq)]
pub enum RasterData {
    U8(ArrayD<u8>),
    U16(ArrayD<u16>),
    U32(ArrayD<u32>),
    I16(ArrayD<i16>),
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
}

/// 对每个变体中的数组执行同一段泛型代码
macro_rules! with_array {
    ($data:expr, $array:ident => $body:expr) => {
        match $data {
            RasterData::U8($array) => $body,
            RasterData::U16($array) => $body,
            RasterData::U32($array) => $body,
            RasterData::I16($array) => $body,
            RasterData::I32($array) => $body,
            RasterData::I64($array) => $body,
            RasterData::F32($array) => $body,
            RasterData::F64($array) => $body,
        }
    };
}

impl RasterData {
    pub fn dtype(&self) -> DType {
        match self {
            RasterData::U8(_) => DType::U8,
            RasterData::U16(_) => DType::U16,
            RasterData::U32(_) => DType::U32,
            RasterData::I16(_) => DType::I16,
            RasterData::I32(_) => DType::I32,
            RasterData::I64(_) => DType::I64,
            RasterData::F32(_) => DType::F32,
            RasterData::F64(_) => DType::F64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        with_array!(self, array => array.shape())
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// 按目标类型取得视图；类型不符时返回`None`
    pub fn view<T: RasterElement>(&self) -> Option<ArrayViewD<'_, T>> {
        T::view(self)
    }

    /// 显式转换为另一种数据类型
    ///
    /// 不做位重解释；任何无法表示的值（例如NaN转整数、越界）都会导致
    /// [ConversionError::CastFailed]。
    pub fn cast(&self, dtype: DType) -> Result<RasterData> {
        if self.dtype() == dtype {
            return Ok(self.clone());
        }
        with_array!(self, array => cast_to(array, dtype))
    }
}

fn cast_array<S, T>(array: &ArrayD<S>) -> Result<ArrayD<T>>
where
    S: RasterElement,
    T: RasterElement,
{
    let failed = || ConversionError::CastFailed {
        from: S::DTYPE,
        to: T::DTYPE,
    };
    let values = array
        .iter()
        .map(|&v| <T as NumCast>::from(v))
        .collect::<Option<Vec<T>>>()
        .ok_or_else(failed)?;
    ArrayD::from_shape_vec(array.raw_dim(), values).map_err(|_| failed())
}

fn cast_to<S: RasterElement>(array: &ArrayD<S>, dtype: DType) -> Result<RasterData> {
    Ok(match dtype {
        DType::U8 => RasterData::U8(cast_array(array)?),
        DType::U16 => RasterData::U16(cast_array(array)?),
        DType::U32 => RasterData::U32(cast_array(array)?),
        DType::I16 => RasterData::I16(cast_array(array)?),
        DType::I32 => RasterData::I32(cast_array(array)?),
        DType::I64 => RasterData::I64(cast_array(array)?),
        DType::F32 => RasterData::F32(cast_array(array)?),
        DType::F64 => RasterData::F64(cast_array(array)?),
    })
}

/// 可以存放在[RasterData]中的标量类型
pub trait RasterElement: BurnValue + NumCast + PartialEq + Debug + 'static {
    const DTYPE: DType;

    fn into_data(array: ArrayD<Self>) -> RasterData;

    fn view(data: &RasterData) -> Option<ArrayViewD<'_, Self>>;
}

macro_rules! raster_element {
    ($t:ty, $variant:ident) => {
        impl RasterElement for $t {
            const DTYPE: DType = DType::$variant;

            fn into_data(array: ArrayD<Self>) -> RasterData {
                RasterData::$variant(array)
            }

            fn view(data: &RasterData) -> Option<ArrayViewD<'_, Self>> {
                match data {
                    RasterData::$variant(array) => Some(array.view()),
                    _ => None,
                }
            }
        }
    };
}

raster_element!(u8, U8);
raster_element!(u16, U16);
raster_element!(u32, U32);
raster_element!(i16, I16);
raster_element!(i32, I32);
raster_element!(i64, I64);
raster_element!(f32, F32);
raster_element!(f64, F64);

/// 边界追踪原语支持的标量类型
///
/// 取值可以无损转换为`f64`，用作属性表中的值列。
pub trait TraceElement: RasterElement + Into<f64> {
    /// 两个像素是否属于同一取值；所有NaN视为同一取值
    fn same_value(self, other: Self) -> bool {
        let a: f64 = self.into();
        let b: f64 = other.into();
        a == b || (a.is_nan() && b.is_nan())
    }

    /// 把过滤条件中的取值转换为本类型，无法精确表示的取值返回`None`
    fn from_filter_value(value: f64) -> Option<Self> {
        let cast = <Self as NumCast>::from(value)?;
        (cast.into() == value).then_some(cast)
    }
}

impl TraceElement for u8 {}
impl TraceElement for u16 {}
impl TraceElement for i16 {}
impl TraceElement for i32 {}

impl TraceElement for f32 {
    /// 与栅格相同的单精度下比较，`0.1`匹配`0.1f32`
    fn from_filter_value(value: f64) -> Option<Self> {
        <f32 as NumCast>::from(value)
    }
}
