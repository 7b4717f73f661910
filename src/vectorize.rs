//! 将多通道栅格切片矢量化为带属性的几何表

use chrono::NaiveDateTime;
use ndarray::{ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    raster::TraceElement,
    table::{GeometryRow, GeometryTable, TableSchema},
    trace::{trace, Connectivity},
    window::{Crs, GeoTransform},
    ConversionError, Result,
};

/// 默认的值列名称
pub const DEFAULT_VALUE_COLUMN: &str = "VALUE";

/// 允许矢量化的像素取值集合
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueFilter(Vec<f64>);

impl ValueFilter {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        ValueFilter(values.into_iter().collect())
    }

    pub fn contains(&self, value: f64) -> bool {
        self.0.iter().any(|&permitted| permitted == value)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 转换为栅格的元素类型；无法精确表示的取值不可能匹配任何像素，直接丢弃
    fn permitted<T: TraceElement>(&self) -> Vec<T> {
        self.0
            .iter()
            .filter_map(|&value| T::from_filter_value(value))
            .collect()
    }
}

impl<V: Into<f64>> FromIterator<V> for ValueFilter {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        ValueFilter(iter.into_iter().map(Into::into).collect())
    }
}

/// 矢量化参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizeParams {
    /// `None`或空集合表示所有取值都参与矢量化（包括背景值）
    pub values: Option<ValueFilter>,
    /// `None`表示输出表中没有值列
    pub value_column: Option<String>,
    pub connectivity: Connectivity,
}

impl Default for VectorizeParams {
    fn default() -> Self {
        VectorizeParams {
            values: None,
            value_column: Some(DEFAULT_VALUE_COLUMN.to_string()),
            connectivity: Connectivity::default(),
        }
    }
}

impl VectorizeParams {
    /// 输出表的列结构
    pub fn schema(&self, timestamped: bool) -> TableSchema {
        TableSchema {
            value_column: self.value_column.clone(),
            timestamp: timestamped,
        }
    }
}

/// 矢量化一个`(height, width, channels)`切片
///
/// 各通道独立处理并按通道顺序拼接；每个连通域对应输出表中的一行。
/// 若给定`timestamp`，所有行的时间戳列都是这个值。
///
/// # 错误
/// `transform`的形状与切片的空间形状不一致时返回[ConversionError::ShapeMismatch]
pub fn vectorize<T: TraceElement>(
    raster: ArrayView3<T>,
    transform: &GeoTransform,
    crs: Crs,
    params: &VectorizeParams,
    timestamp: Option<NaiveDateTime>,
) -> Result<GeometryTable> {
    let (height, width, _) = raster.dim();
    let (expected_height, expected_width) = transform.shape();
    if (height, width) != (expected_height, expected_width) {
        return Err(ConversionError::ShapeMismatch {
            expected: vec![expected_height, expected_width],
            found: vec![height, width],
        });
    }

    let pix_to_geo = transform.pix_to_geo();
    let permitted = params
        .values
        .as_ref()
        .filter(|filter| !filter.is_empty())
        .map(ValueFilter::permitted::<T>);
    let mut table = GeometryTable::new(crs, params.schema(timestamp.is_some()));
    for (channel, band) in raster.axis_iter(Axis(2)).enumerate() {
        let mask = permitted.as_ref().map(|permitted| {
            band.mapv(|value| permitted.iter().any(|&p| value.same_value(p)))
        });
        let shapes = trace(
            band,
            mask.as_ref().map(|mask| mask.view()),
            params.connectivity,
            &pix_to_geo,
        );
        debug!(channel, components = shapes.len(), "traced channel");

        for shape in shapes {
            let mut row = GeometryRow::new(shape.geometry);
            if params.value_column.is_some() {
                row = row.with_value(shape.value.into());
            }
            if let Some(timestamp) = timestamp {
                row = row.with_timestamp(timestamp);
            }
            table.push(row)?;
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use geo::{Area, Geometry};
    use ndarray::{s, Array3};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::window::SpatialWindow;

    fn transform(height: usize, width: usize) -> GeoTransform {
        let window = SpatialWindow::new((0., 0.), (width as f64, height as f64), Crs::new(32633))
            .unwrap();
        GeoTransform::from_bounds(&window, height, width).unwrap()
    }

    fn only(values: &[u8]) -> VectorizeParams {
        VectorizeParams {
            values: Some(values.iter().copied().collect()),
            ..Default::default()
        }
    }

    #[test]
    fn filter_limits_values() {
        let mut raster = Array3::<u8>::zeros((6, 6, 1));
        raster.slice_mut(s![0..2, 0..2, 0]).fill(1);
        raster.slice_mut(s![3..6, 3..6, 0]).fill(2);
        let table = vectorize(raster.view(), &transform(6, 6), Crs::new(32633), &only(&[2]), None)
            .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].value, Some(2.));
        assert_eq!(table.rows()[0].geometry.unsigned_area(), 9.);
        assert_eq!(table.schema().columns(), vec!["geometry", "VALUE"]);
    }

    #[test]
    fn no_filter_includes_background() {
        let mut raster = Array3::<u8>::zeros((4, 4, 1));
        raster[[1, 1, 0]] = 1;
        let params = VectorizeParams::default();
        let table =
            vectorize(raster.view(), &transform(4, 4), Crs::new(32633), &params, None).unwrap();
        let values: Vec<_> = table.iter().map(|row| row.value).collect();
        assert_eq!(values, vec![Some(0.), Some(1.)]);
        match &table.rows()[0].geometry {
            Geometry::Polygon(background) => assert_eq!(background.interiors().len(), 1),
            other => panic!("expected a polygon, got {other:?}"),
        }
    }

    #[test]
    fn empty_filter_is_no_filter() {
        let mut raster = Array3::<u8>::ones((3, 3, 2));
        raster[[1, 1, 1]] = 4;
        let stamp = NaiveDate::from_ymd_opt(2021, 1, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap();
        let run = |values| {
            let params = VectorizeParams {
                values,
                ..Default::default()
            };
            vectorize(
                raster.view(),
                &transform(3, 3),
                Crs::new(32633),
                &params,
                Some(stamp),
            )
            .unwrap()
        };

        let empty = run(Some(ValueFilter::default()));
        assert_eq!(empty, run(None));
        let values: Vec<_> = empty.iter().filter_map(|row| row.value).collect();
        assert_eq!(values, vec![1., 1., 4.]);
        assert_eq!(
            empty.schema().columns(),
            vec!["geometry", "VALUE", "TIMESTAMP"]
        );
    }

    #[test]
    fn filter_matches_in_raster_precision() {
        let mut raster = Array3::<f32>::from_elem((3, 3, 1), 0.1);
        raster[[0, 0, 0]] = 0.2;
        let params = VectorizeParams {
            values: Some(ValueFilter::new([0.1])),
            ..Default::default()
        };
        let table =
            vectorize(raster.view(), &transform(3, 3), Crs::new(32633), &params, None).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].value, Some(f64::from(0.1f32)));
        assert_eq!(table.rows()[0].geometry.unsigned_area(), 8.);

        let fractional = VectorizeParams {
            values: Some(ValueFilter::new([1.5])),
            ..Default::default()
        };
        let ones = Array3::<u8>::ones((2, 2, 1));
        let table = vectorize(ones.view(), &transform(2, 2), Crs::new(32633), &fractional, None)
            .unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn channels_are_concatenated_in_order() {
        let mut raster = Array3::<i16>::zeros((4, 4, 2));
        raster[[0, 0, 0]] = 5;
        raster[[3, 3, 1]] = 7;
        raster[[0, 3, 1]] = 5;
        let params = VectorizeParams {
            values: Some([5i16, 7].into_iter().collect()),
            ..Default::default()
        };
        let table =
            vectorize(raster.view(), &transform(4, 4), Crs::new(32633), &params, None).unwrap();
        let values: Vec<_> = table.iter().filter_map(|row| row.value).collect();
        assert_eq!(values, vec![5., 5., 7.]);
    }

    #[test]
    fn value_column_can_be_dropped() {
        let raster = Array3::<f32>::from_elem((2, 2, 1), 0.5);
        let params = VectorizeParams {
            value_column: None,
            ..Default::default()
        };
        let table = vectorize(raster.view(), &transform(2, 2), Crs::WGS84, &params, None).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].value, None);
        assert_eq!(table.crs(), Crs::WGS84);
        assert_eq!(table.schema().columns(), vec!["geometry"]);
    }

    #[test]
    fn geometry_is_in_world_coordinates() {
        let window = SpatialWindow::new((500., 1000.), (520., 1020.), Crs::new(32633)).unwrap();
        let transform = GeoTransform::from_bounds(&window, 2, 2).unwrap();
        let mut raster = Array3::<u8>::zeros((2, 2, 1));
        raster[[0, 0, 0]] = 1;
        let table =
            vectorize(raster.view(), &transform, Crs::new(32633), &only(&[1]), None).unwrap();
        let geometry = &table.rows()[0].geometry;
        assert_eq!(geometry.unsigned_area(), 100.);
        let rect = geo::BoundingRect::bounding_rect(geometry).unwrap();
        assert_eq!(rect.min(), (500., 1010.).into());
        assert_eq!(rect.max(), (510., 1020.).into());
    }

    #[test]
    fn mismatched_transform_is_rejected() {
        let raster = Array3::<u8>::zeros((3, 4, 1));
        assert_eq!(
            vectorize(
                raster.view(),
                &transform(4, 4),
                Crs::new(32633),
                &VectorizeParams::default(),
                None
            ),
            Err(ConversionError::ShapeMismatch {
                expected: vec![4, 4],
                found: vec![3, 4]
            })
        );
    }

    #[test]
    fn params_from_json() {
        let params: VectorizeParams =
            serde_json::from_str(r#"{"values": [1, 3], "connectivity": 8}"#).unwrap();
        assert_eq!(params.values, Some(ValueFilter::new([1., 3.])));
        assert_eq!(params.value_column.as_deref(), Some(DEFAULT_VALUE_COLUMN));
        assert_eq!(params.connectivity, Connectivity::Eight);
    }
}
