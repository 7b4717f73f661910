//! 将矢量数据裁剪到目标窗口，以及多边形合并原语

use geo::{
    Area, BooleanOps, BoundingRect, Geometry, GeometryCollection, Intersects, LineString,
    MultiLineString, MultiPoint, MultiPolygon, Polygon,
};
use tracing::trace;

use crate::{table::GeometryTable, window::SpatialWindow, ConversionError, Result};

/// 返回与窗口相交的行，几何替换为与窗口多边形的交集
///
/// 输入表不会被修改；不相交的行（包括只在边界上接触、交集面积为零的多边形）
/// 直接丢弃，不会以空几何的形式出现在结果中。
///
/// # 错误
/// 表与窗口的坐标参考系不同时返回[ConversionError::CrsMismatch]
pub fn clip_to_window(data: &GeometryTable, window: &SpatialWindow) -> Result<GeometryTable> {
    if data.crs() != window.crs() {
        return Err(ConversionError::CrsMismatch {
            expected: window.crs(),
            found: data.crs(),
        });
    }

    let window_rect = window.to_rect();
    let window_polygon = MultiPolygon::new(vec![window.to_polygon()]);

    let mut clipped = data.empty_like();
    for row in data {
        let overlaps_envelope = row
            .geometry
            .bounding_rect()
            .is_some_and(|envelope| envelope.intersects(&window_rect));
        if !overlaps_envelope {
            continue;
        }
        if let Some(geometry) = clip_geometry(&row.geometry, &window_polygon) {
            let mut row = row.clone();
            row.geometry = geometry;
            clipped.push(row)?;
        }
    }
    trace!(
        input = data.len(),
        kept = clipped.len(),
        "clipped vector data to window"
    );
    Ok(clipped)
}

fn clip_polygonal(
    polygons: MultiPolygon<f64>,
    window: &MultiPolygon<f64>,
) -> Option<Geometry<f64>> {
    let mut intersection = polygons.intersection(window);
    intersection.0.retain(|polygon| polygon.unsigned_area() > 0.);
    match intersection.0.len() {
        0 => None,
        1 => intersection.0.pop().map(Geometry::Polygon),
        _ => Some(Geometry::MultiPolygon(intersection)),
    }
}

fn clip_lineal(lines: MultiLineString<f64>, window: &MultiPolygon<f64>) -> Option<Geometry<f64>> {
    let mut clipped = window.clip(&lines, false);
    clipped.0.retain(|line| line.0.len() > 1);
    match clipped.0.len() {
        0 => None,
        1 => clipped.0.pop().map(Geometry::LineString),
        _ => Some(Geometry::MultiLineString(clipped)),
    }
}

/// 单个几何与窗口求交；结果为空时返回`None`
fn clip_geometry(geometry: &Geometry<f64>, window: &MultiPolygon<f64>) -> Option<Geometry<f64>> {
    match geometry {
        Geometry::Polygon(polygon) => {
            clip_polygonal(MultiPolygon::new(vec![polygon.clone()]), window)
        }
        Geometry::MultiPolygon(polygons) => clip_polygonal(polygons.clone(), window),
        Geometry::Rect(rect) => clip_polygonal(MultiPolygon::new(vec![rect.to_polygon()]), window),
        Geometry::Triangle(triangle) => {
            clip_polygonal(MultiPolygon::new(vec![triangle.to_polygon()]), window)
        }
        Geometry::Line(line) => clip_lineal(
            MultiLineString::new(vec![LineString::from(vec![line.start, line.end])]),
            window,
        ),
        Geometry::LineString(line_string) => {
            clip_lineal(MultiLineString::new(vec![line_string.clone()]), window)
        }
        Geometry::MultiLineString(lines) => clip_lineal(lines.clone(), window),
        Geometry::Point(point) => window.intersects(point).then(|| Geometry::Point(*point)),
        Geometry::MultiPoint(points) => {
            let inside: Vec<_> = points
                .iter()
                .filter(|point| window.intersects(*point))
                .copied()
                .collect();
            (!inside.is_empty()).then(|| Geometry::MultiPoint(MultiPoint::new(inside)))
        }
        Geometry::GeometryCollection(collection) => {
            let members: Vec<_> = collection
                .iter()
                .filter_map(|member| clip_geometry(member, window))
                .collect();
            (!members.is_empty())
                .then(|| Geometry::GeometryCollection(GeometryCollection::from(members)))
        }
    }
}

/// 合并一组多边形
///
/// 返回一个（可能包含多个部分的）多边形，恰好覆盖所有输入的并集；
/// 重叠部分只出现一次，相邻部分之间没有缝隙。
pub fn union_polygons<I>(polygons: I) -> MultiPolygon<f64>
where
    I: IntoIterator<Item = Polygon<f64>>,
{
    let mut parts = polygons
        .into_iter()
        .map(|polygon| MultiPolygon::new(vec![polygon]));
    let Some(first) = parts.next() else {
        return MultiPolygon::new(vec![]);
    };
    parts.fold(first, |merged, part| merged.union(&part))
}
