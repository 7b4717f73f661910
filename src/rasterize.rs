//! 将裁剪后的矢量数据烧录到栅格网格

use geo::{Geometry, GeometryCollection, Polygon};
use ndarray::{Array2, Array3, Axis};
use tracing::debug;

use crate::{
    burn::{BurnOptions, BurnValue, Burner},
    clip::union_polygons,
    table::GeometryTable,
    window::GeoTransform,
    ConversionError, Result,
};

/// 烧录的基础网格
#[derive(Debug, Clone, PartialEq)]
pub enum BaseGrid<T> {
    /// 已有的栅格内容，多边形以外的像素原样保留
    Existing(Array2<T>),
    /// 新分配的网格，所有像素为`fill`
    New {
        height: usize,
        width: usize,
        fill: T,
    },
}

impl<T: Copy> BaseGrid<T> {
    fn shape(&self) -> (usize, usize) {
        match self {
            BaseGrid::Existing(grid) => grid.dim(),
            BaseGrid::New { height, width, .. } => (*height, *width),
        }
    }

    fn into_grid(self) -> Array2<T> {
        match self {
            BaseGrid::Existing(grid) => grid,
            BaseGrid::New {
                height,
                width,
                fill,
            } => Array2::from_elem((height, width), fill),
        }
    }
}

/// 把几何拆成面状部分和其余部分
fn split_polygonal(
    geometry: &Geometry<f64>,
    polygons: &mut Vec<Polygon<f64>>,
    others: &mut Vec<Geometry<f64>>,
) {
    match geometry {
        Geometry::Polygon(polygon) => polygons.push(polygon.clone()),
        Geometry::MultiPolygon(multi) => polygons.extend(multi.iter().cloned()),
        Geometry::Rect(rect) => polygons.push(rect.to_polygon()),
        Geometry::Triangle(triangle) => polygons.push(triangle.to_polygon()),
        Geometry::GeometryCollection(collection) => collection
            .iter()
            .for_each(|member| split_polygonal(member, polygons, others)),
        other => others.push(other.clone()),
    }
}

/// 以`inside`值把裁剪后的几何烧录进基础网格
///
/// 所有面状几何先合并成一个多部分多边形再一次性烧录，
/// 重叠的输入多边形既不会重复计数也不会留下缝隙；线和点在同一遍中随后烧录。
/// `options`原样交给烧录原语。
///
/// 输出形状为`(height, width, 1)`。没有可烧录的几何时，基础网格原样返回。
///
/// # 错误
/// 基础网格形状与`transform`不一致时返回[ConversionError::ShapeMismatch]，
/// 此时网格尚未被修改。
pub fn rasterize<T>(
    clipped: &GeometryTable,
    base: BaseGrid<T>,
    inside: T,
    transform: &GeoTransform,
    options: &BurnOptions,
) -> Result<Array3<T>>
where
    T: BurnValue,
{
    let (height, width) = transform.shape();
    if base.shape() != (height, width) {
        let (found_height, found_width) = base.shape();
        return Err(ConversionError::ShapeMismatch {
            expected: vec![height, width],
            found: vec![found_height, found_width],
        });
    }

    let grid = base.into_grid();
    if clipped.is_empty() {
        debug!("no geometry inside the window, leaving the grid unchanged");
        return Ok(grid.insert_axis(Axis(2)));
    }

    let mut polygons = Vec::new();
    let mut others = Vec::new();
    for row in clipped {
        split_polygonal(&row.geometry, &mut polygons, &mut others);
    }
    let merged = union_polygons(polygons);
    debug!(
        parts = merged.0.len(),
        lineal_or_point = others.len(),
        "burning merged geometry"
    );

    let mut burner = Burner::new(grid, Some(transform.geo_to_pix()), *options)?;
    burner.burn(&merged, inside)?;
    if !others.is_empty() {
        burner.burn(&GeometryCollection::from(others), inside)?;
    }
    Ok(burner.finish().insert_axis(Axis(2)))
}
