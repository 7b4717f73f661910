//! 边界追踪原语：连通域标记与多边形环提取
//!
//! 每个连通域的边界由像素边组成。沿边界行走时连通域始终位于右侧，
//! 外环在像素坐标（y向下）中为顺时针，孔洞为逆时针。
//! 在两个对角像素相接的顶点上总是左转，使每条环只围绕一个非成员区域；
//! 对于8连通域仍可能出现自接触的环，追踪完成后在重复顶点处拆开。

use std::{
    collections::{HashMap, HashSet, VecDeque},
    iter::once,
};

use geo::{winding_order::Winding, Contains, Coord, Geometry, LineString, MultiPolygon, Polygon};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::{raster::TraceElement, EuclidPoint, Transform};

/// 连通规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Connectivity {
    /// 只有共享一条边的像素相连
    #[default]
    Four,
    /// 共享一个角点的像素也相连
    Eight,
}

impl Connectivity {
    /// 相邻像素的`(行, 列)`偏移
    fn offsets(&self) -> &'static [(isize, isize)] {
        const FOUR: [(isize, isize); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];
        const EIGHT: [(isize, isize); 8] = [
            (-1, -1),
            (-1, 0),
            (-1, 1),
            (0, -1),
            (0, 1),
            (1, -1),
            (1, 0),
            (1, 1),
        ];
        match self {
            Connectivity::Four => &FOUR,
            Connectivity::Eight => &EIGHT,
        }
    }
}

impl TryFrom<u8> for Connectivity {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(Connectivity::Four),
            8 => Ok(Connectivity::Eight),
            other => Err(format!("连通规则只能是4或8，而不是{other}")),
        }
    }
}

impl From<Connectivity> for u8 {
    fn from(connectivity: Connectivity) -> u8 {
        match connectivity {
            Connectivity::Four => 4,
            Connectivity::Eight => 8,
        }
    }
}

/// 追踪得到的一个连通域
#[derive(Debug, Clone, PartialEq)]
pub struct TracedShape<T> {
    /// `Polygon`，或当8连通域的各部分只在角点相接时为`MultiPolygon`
    pub geometry: Geometry<f64>,
    /// 连通域内所有像素共同的值
    pub value: T,
}

/// 像素角点`(列, 行)`
type Vertex = (isize, isize);

/// 沿像素边行走的方向（y向下）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Step {
    East,
    South,
    West,
    North,
}

impl Step {
    fn delta(self) -> (isize, isize) {
        match self {
            Step::East => (1, 0),
            Step::South => (0, 1),
            Step::West => (-1, 0),
            Step::North => (0, -1),
        }
    }

    fn turn_left(self) -> Step {
        match self {
            Step::East => Step::North,
            Step::North => Step::West,
            Step::West => Step::South,
            Step::South => Step::East,
        }
    }

    /// 从`at`沿本方向走一条像素边后到达的顶点
    fn advance(self, at: Vertex) -> Vertex {
        let (dx, dy) = self.delta();
        (at.0 + dx, at.1 + dy)
    }
}

type Edge = (Vertex, Step);

struct Component<T> {
    value: T,
    /// 按行优先排序的`(行, 列)`
    cells: Vec<(usize, usize)>,
}

/// 按行优先顺序标记连通域；标签从1开始，0表示被掩膜排除
fn label_components<T: TraceElement>(
    band: ArrayView2<T>,
    mask: Option<ArrayView2<bool>>,
    connectivity: Connectivity,
) -> (Array2<usize>, Vec<Component<T>>) {
    let (height, width) = band.dim();
    let included = |row: usize, col: usize| mask.map_or(true, |mask| mask[[row, col]]);

    let mut labels = Array2::<usize>::zeros((height, width));
    let mut components = Vec::new();
    let mut queue = VecDeque::new();

    for row in 0..height {
        for col in 0..width {
            if labels[[row, col]] != 0 || !included(row, col) {
                continue;
            }
            let value = band[[row, col]];
            let label = components.len() + 1;
            labels[[row, col]] = label;
            queue.push_back((row, col));

            let mut cells = Vec::new();
            while let Some((r, c)) = queue.pop_front() {
                cells.push((r, c));
                for &(dr, dc) in connectivity.offsets() {
                    let (nr, nc) = (r as isize + dr, c as isize + dc);
                    if nr < 0 || nc < 0 || nr >= height as isize || nc >= width as isize {
                        continue;
                    }
                    let (nr, nc) = (nr as usize, nc as usize);
                    if labels[[nr, nc]] == 0
                        && included(nr, nc)
                        && band[[nr, nc]].same_value(value)
                    {
                        labels[[nr, nc]] = label;
                        queue.push_back((nr, nc));
                    }
                }
            }
            cells.sort_unstable();
            components.push(Component { value, cells });
        }
    }

    (labels, components)
}

/// 连通域的全部边界边，连通域位于行走方向右侧
fn boundary_edges(labels: &Array2<usize>, label: usize, cells: &[(usize, usize)]) -> Vec<Edge> {
    let (height, width) = labels.dim();
    let member = |r: isize, c: isize| {
        r >= 0
            && c >= 0
            && (r as usize) < height
            && (c as usize) < width
            && labels[[r as usize, c as usize]] == label
    };

    let mut edges = Vec::new();
    for &(row, col) in cells {
        let (r, c) = (row as isize, col as isize);
        if !member(r - 1, c) {
            edges.push(((c, r), Step::East));
        }
        if !member(r, c + 1) {
            edges.push(((c + 1, r), Step::South));
        }
        if !member(r + 1, c) {
            edges.push(((c + 1, r + 1), Step::West));
        }
        if !member(r, c - 1) {
            edges.push(((c, r + 1), Step::North));
        }
    }
    edges
}

/// 把边串成闭合的顶点序列
fn link_rings(edges: &[Edge]) -> Vec<Vec<Vertex>> {
    let mut outgoing: HashMap<Vertex, Vec<Step>> = HashMap::with_capacity(edges.len());
    for &(at, step) in edges {
        outgoing.entry(at).or_default().push(step);
    }
    let successor = |at: Vertex, incoming: Step| -> Option<Step> {
        let steps = outgoing.get(&at)?;
        match steps.as_slice() {
            [only] => Some(*only),
            _ => steps
                .iter()
                .copied()
                .find(|&step| step == incoming.turn_left()),
        }
    };

    let mut used: HashSet<Edge> = HashSet::with_capacity(edges.len());
    let mut rings = Vec::new();
    for &start in edges {
        if used.contains(&start) {
            continue;
        }
        let mut ring = Vec::new();
        let (mut at, mut step) = start;
        loop {
            used.insert((at, step));
            ring.push(at);
            let next = step.advance(at);
            let Some(next_step) = successor(next, step) else {
                break;
            };
            if (next, next_step) == start || used.contains(&(next, next_step)) {
                break;
            }
            at = next;
            step = next_step;
        }
        rings.extend(split_at_touches(ring));
    }
    rings
}

/// 在重复出现的顶点处把自接触的环拆成若干简单环
fn split_at_touches(vertices: Vec<Vertex>) -> Vec<Vec<Vertex>> {
    let Some(&first) = vertices.first() else {
        return Vec::new();
    };
    let mut rings = Vec::new();
    let mut stack: Vec<Vertex> = Vec::with_capacity(vertices.len());
    let mut seen: HashMap<Vertex, usize> = HashMap::with_capacity(vertices.len());
    for vertex in vertices.into_iter().chain(once(first)) {
        if let Some(&index) = seen.get(&vertex) {
            let ring: Vec<Vertex> = stack.drain(index..).collect();
            for v in &ring {
                seen.remove(v);
            }
            rings.push(ring);
        }
        seen.insert(vertex, stack.len());
        stack.push(vertex);
    }
    rings
}

/// 环左侧第一个像素的中心（像素坐标）
fn left_cell_center(ring: &[Vertex]) -> Coord<f64> {
    let (x0, y0) = ring[0];
    let (x1, y1) = ring[1 % ring.len()];
    let (dx, dy) = ((x1 - x0).signum() as f64, (y1 - y0).signum() as f64);
    Coord {
        x: x0 as f64 + dx * 0.5 + dy * 0.5,
        y: y0 as f64 + dy * 0.5 - dx * 0.5,
    }
}

/// 去掉共线的中间顶点
fn corners(ring: &[Vertex]) -> Vec<Vertex> {
    let n = ring.len();
    (0..n)
        .filter(|&i| {
            let (px, py) = ring[(i + n - 1) % n];
            let (cx, cy) = ring[i];
            let (nx, ny) = ring[(i + 1) % n];
            (cx - px) * (ny - cy) - (cy - py) * (nx - cx) != 0
        })
        .map(|i| ring[i])
        .collect()
}

/// 像素坐标中的鞋带公式；外环为正
fn signed_area(ring: &[Vertex]) -> isize {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (x0, y0) = ring[i];
            let (x1, y1) = ring[(i + 1) % n];
            x0 * y1 - x1 * y0
        })
        .sum()
}

fn to_line_string(ring: &[Vertex]) -> LineString<f64> {
    LineString::from(
        ring.iter()
            .map(|&(x, y)| (x as f64, y as f64))
            .collect::<Vec<_>>(),
    )
}

/// 把一个连通域的环组装成（多）多边形，坐标仍为像素坐标
fn assemble(rings: Vec<Vec<Vertex>>) -> Vec<Polygon<f64>> {
    let mut exteriors: Vec<(Polygon<f64>, f64)> = Vec::new();
    let mut holes: Vec<(LineString<f64>, Coord<f64>)> = Vec::new();
    for ring in rings {
        let probe = left_cell_center(&ring);
        let ring = corners(&ring);
        if ring.len() < 4 {
            continue;
        }
        let area = signed_area(&ring);
        if area > 0 {
            exteriors.push((Polygon::new(to_line_string(&ring), vec![]), area as f64));
        } else {
            holes.push((to_line_string(&ring), probe));
        }
    }

    let mut interiors: Vec<Vec<LineString<f64>>> = vec![Vec::new(); exteriors.len()];
    for (hole, probe) in holes {
        let owner = exteriors
            .iter()
            .enumerate()
            .filter(|(_, (polygon, _))| polygon.contains(&probe))
            .min_by(|(_, (_, a)), (_, (_, b))| a.total_cmp(b))
            .map(|(index, _)| index);
        if let Some(index) = owner {
            interiors[index].push(hole);
        }
    }

    exteriors
        .into_iter()
        .zip(interiors)
        .map(|((polygon, _), interiors)| {
            let (exterior, _) = polygon.into_inner();
            Polygon::new(exterior, interiors)
        })
        .collect()
}

fn to_world(polygon: Polygon<f64>, pix_to_geo: &Transform) -> Polygon<f64> {
    let project = |ring: &LineString<f64>| -> LineString<f64> {
        ring.coords()
            .map(|c| {
                let p = pix_to_geo.transform_point(EuclidPoint::new(c.x, c.y));
                Coord { x: p.x, y: p.y }
            })
            .collect()
    };
    let mut exterior = project(polygon.exterior());
    exterior.make_ccw_winding();
    let interiors = polygon
        .interiors()
        .iter()
        .map(|ring| {
            let mut ring = project(ring);
            ring.make_cw_winding();
            ring
        })
        .collect();
    Polygon::new(exterior, interiors)
}

/// 提取二维栅格中所有取值相同的连通域的边界
///
/// `mask`为`false`的像素不参与任何连通域。结果按连通域首个像素的行优先顺序排列，
/// 几何坐标由`pix_to_geo`从像素角点坐标`(列, 行)`映射得到。
/// 外环为逆时针，孔洞为顺时针（世界坐标中）。
pub fn trace<T: TraceElement>(
    band: ArrayView2<T>,
    mask: Option<ArrayView2<bool>>,
    connectivity: Connectivity,
    pix_to_geo: &Transform,
) -> Vec<TracedShape<T>> {
    let (labels, components) = label_components(band, mask, connectivity);

    components
        .into_iter()
        .enumerate()
        .filter_map(|(index, component)| {
            let edges = boundary_edges(&labels, index + 1, &component.cells);
            let mut polygons: Vec<_> = assemble(link_rings(&edges))
                .into_iter()
                .map(|polygon| to_world(polygon, pix_to_geo))
                .collect();
            let geometry = match polygons.len() {
                0 => return None,
                1 => Geometry::Polygon(polygons.pop()?),
                _ => Geometry::MultiPolygon(MultiPolygon::new(polygons)),
            };
            Some(TracedShape {
                geometry,
                value: component.value,
            })
        })
        .collect()
}
