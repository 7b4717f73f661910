use std::iter::once;

use geo::{coords_iter::CoordsIter, winding_order::Winding, LineString, Point};
use itertools::Itertools;

use crate::burn::{BurnValue, Burner, Rasterize};

/// 多边形所有环上顶点所在的像素行
fn pixel_rows<'a>(
    first: &'a LineString<f64>,
    rest: &'a [LineString<f64>],
) -> impl Iterator<Item = isize> + 'a {
    once(first)
        .chain(rest)
        .flat_map(|line_string| line_string.points().map(|point| point.y().floor() as isize))
}

/// 多边形的一条边
type Edge = (Point<f64>, Point<f64>);

/// 将所有环统一为顺时针方向后拆分成边
fn clockwise_edges(first: &LineString<f64>, rest: &[LineString<f64>]) -> Vec<Edge> {
    let num_edges = once(first)
        .chain(rest)
        .map(|ls| ls.0.len().saturating_sub(1))
        .sum();
    let mut result = Vec::with_capacity(num_edges);

    for ls in once(first).chain(rest) {
        if ls.is_cw() {
            result.extend(ls.points().tuple_windows::<Edge>());
        } else {
            result.extend(ls.points().rev().tuple_windows::<Edge>());
        }
    }

    result
}

/// 扫描线与边交点所在的像素列（取最近的像素边界）
fn pixel_edge(x: f64) -> isize {
    (x + 0.5).floor() as isize
}

/// 把像素列区间`[start, end)`裁剪到网格宽度内，空区间返回`None`
fn clamp_span(start: isize, end: isize, width: usize) -> Option<(usize, usize)> {
    let end = end.min(width as isize);
    let start = start.max(0);
    (end > start).then(|| (start as usize, end as usize))
}

/// 用扫描线填充多边形（外环与内环已在像素坐标中）
///
/// 算法参考GDAL的`GDALdllImageFilledPolygon`：
/// 对每一行取像素中心高度作为扫描线，求出与所有边的交点，
/// 排序后两两配对填充。奇偶规则使内环自然形成孔洞。
///
/// 只有像素中心落在多边形内部的像素会被填充；
/// 若烧录器启用了`all_touched`，再沿各环烧录一遍被边界触及的像素。
pub fn rasterize_polygon<Label>(
    first: &LineString<f64>,
    rest: &[LineString<f64>],
    burner: &mut Burner<Label>,
) where
    Label: BurnValue,
{
    debug_assert!(first.is_closed() && rest.iter().all(|ls| ls.is_closed()));

    let total_points = first.coords_count()
        + rest
            .iter()
            .map(|line_string| line_string.coords_count())
            .sum::<usize>();
    let (Some(lowest), Some(highest)) = (
        pixel_rows(first, rest).min(),
        pixel_rows(first, rest).max(),
    ) else {
        return;
    };

    let width = burner.width();
    let edges = clockwise_edges(first, rest);
    let mut crossings: Vec<isize> = Vec::with_capacity(total_points);

    for row in lowest.max(0)..=highest.min(burner.height() as isize - 1) {
        let center = 0.5 + row as f64;
        let y = row as usize;

        for &(from, to) in &edges {
            let (top, bottom) = if from.y() <= to.y() {
                (from, to)
            } else {
                (to, from)
            };
            if center < top.y() || center > bottom.y() {
                continue;
            }

            if top.y() == bottom.y() {
                // 环已统一为顺时针，只取一个方向的水平边
                if from.x() > to.x() {
                    if let Some((start, end)) =
                        clamp_span(pixel_edge(to.x()), pixel_edge(from.x()), width)
                    {
                        burner.fill_horizontal_line(start, end, y);
                    }
                }
                continue;
            }

            if center < bottom.y() {
                let slope = (bottom.x() - top.x()) / (bottom.y() - top.y());
                crossings.push(pixel_edge(top.x() + (center - top.y()) * slope));
            }
        }

        crossings.sort_unstable();
        for pair in crossings.chunks_exact(2) {
            if let Some((start, end)) = clamp_span(pair[0], pair[1], width) {
                burner.fill_horizontal_line(start, end, y);
            }
        }
        crossings.clear();
    }

    if burner.all_touched() {
        once(first)
            .chain(rest)
            .for_each(|ls| ls.rasterize(burner));
    }
}
