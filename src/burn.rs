use std::{collections::HashSet, fmt::Debug};

use geo::{
    algorithm::{
        coords_iter::CoordsIter,
        map_coords::{MapCoords, MapCoordsInPlace},
    },
    Coord, Geometry, GeometryCollection, Line, LineString, MultiLineString, MultiPoint,
    MultiPolygon, Point, Polygon, Rect, Triangle,
};
use ndarray::{s, Array2};
use num_traits::{Num, NumCast, SaturatingAdd, Zero};
use serde::{Deserialize, Serialize};

use crate::{
    line::rasterize_line, poly::rasterize_polygon, ConversionError, EuclidPoint, Result,
    Transform,
};

/// 可以被烧录进栅格的像素值类型
pub trait BurnValue: Copy + Zero {
    /// 累加模式下把`other`并入已有的像素值
    ///
    /// 整数类型在取值范围的边界处饱和，不会溢出回绕。
    fn accumulate(self, other: Self) -> Self;
}

macro_rules! saturating_burn_value {
    ($($t:ty),*) => {
        $(
            impl BurnValue for $t {
                fn accumulate(self, other: Self) -> Self {
                    SaturatingAdd::saturating_add(&self, &other)
                }
            }
        )*
    };
}

saturating_burn_value!(u8, u16, u32, u64, i8, i16, i32, i64);

impl BurnValue for f32 {
    fn accumulate(self, other: Self) -> Self {
        self + other
    }
}

impl BurnValue for f64 {
    fn accumulate(self, other: Self) -> Self {
        self + other
    }
}

/// 像素冲突解决策略
///
/// 当两个几何形状覆盖同一个像素时，使用该枚举决定如何处理重叠部分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeAlgorithm {
    /// 替换策略：使用最后绘制的形状的值覆盖像素
    Replace,

    /// 累加策略：将所有覆盖该像素的形状的值相加，整数类型饱和而不溢出
    Add,
}

impl Default for MergeAlgorithm {
    fn default() -> Self {
        MergeAlgorithm::Replace
    }
}

/// 烧录选项，原样传递给烧录原语
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurnOptions {
    /// 为`true`时，所有被多边形边界触及的像素都会被烧录；
    /// 否则只烧录中心点落在多边形内部的像素
    pub all_touched: bool,
    /// 多个形状竞争同一像素时的合并方式
    pub merge_algorithm: MergeAlgorithm,
}

fn to_float<T>(coords: Coord<T>) -> Coord<f64>
where
    T: Into<f64> + Copy + NumCast + Debug + PartialOrd + Num,
{
    Coord {
        x: coords.x.into(),
        y: coords.y.into(),
    }
}

/// 定义栅格化能力的特性
///
/// 该特性用于表示一个类型可以被烧录到[Burner]持有的二维数组中，
/// 主要用于内部实现
#[doc(hidden)]
pub trait Rasterize<Label>
where
    Label: BurnValue,
{
    /// 将自身（已经位于像素坐标中）烧录到指定的烧录器中
    fn rasterize(&self, burner: &mut Burner<Label>);
}

/// 烧录器：在一个已有的二维网格上就地写入几何形状
///
/// 与新建空白画布不同，烧录器接管调用方给出的基础网格，
/// 多边形以外的像素保持原值不变。
///
/// # 示例
///
/// ```rust
/// # fn main() -> eopatch_vectorize::Result<()> {
/// use eopatch_vectorize::{BurnOptions, Burner};
/// use geo::{Point, Rect};
/// use ndarray::{array, Array2};
///
/// let base = Array2::from_elem((4, 4), 9u8);
/// let mut burner = Burner::new(base, None, BurnOptions::default())?;
/// burner.burn(&Rect::new((1., 1.), (3., 3.)), 1)?;
/// burner.burn(&Point::new(0.5, 3.5), 2)?;
///
/// assert_eq!(
///     burner.finish(),
///     array![
///         [9, 9, 9, 9],
///         [9, 1, 1, 9],
///         [9, 1, 1, 9],
///         [2, 9, 9, 9],
///     ]
/// );
/// # Ok(())}
/// ```
#[derive(Clone, Debug)]
pub struct Burner<Label> {
    /// 被就地修改的网格
    pixels: Array2<Label>,
    /// 可选的世界坐标到像素坐标的变换
    geo_to_pix: Option<Transform>,
    options: BurnOptions,
    /// 当前使用的前景值
    foreground: Label,
    /// 上一条线段已填充的像素
    previous_burnt_points: HashSet<(usize, usize)>,
    /// 当前线段已填充的像素
    current_burnt_points: HashSet<(usize, usize)>,
    /// 累加模式下，当前多边形已填充的像素（内部、水平边与边界）；同一多边形只累加一次
    polygon_burnt_points: Option<HashSet<(usize, usize)>>,
}

impl<Label> Burner<Label>
where
    Label: BurnValue,
{
    /// 接管基础网格并创建烧录器
    ///
    /// # 错误
    /// 如果提供的变换矩阵中包含非有限值，则返回[ConversionError::NonFiniteCoordinate]
    pub fn new(
        pixels: Array2<Label>,
        geo_to_pix: Option<Transform>,
        options: BurnOptions,
    ) -> Result<Self> {
        let non_finite = geo_to_pix
            .map(|geo_to_pix| geo_to_pix.to_array().iter().any(|param| !param.is_finite()))
            .unwrap_or(false);
        if non_finite {
            return Err(ConversionError::NonFiniteCoordinate);
        }

        Ok(Burner {
            pixels,
            geo_to_pix,
            options,
            foreground: Label::zero(),
            previous_burnt_points: HashSet::new(),
            current_burnt_points: HashSet::new(),
            polygon_burnt_points: None,
        })
    }

    pub(crate) fn width(&self) -> usize {
        self.pixels.shape()[1]
    }

    pub(crate) fn height(&self) -> usize {
        self.pixels.shape()[0]
    }

    pub(crate) fn all_touched(&self) -> bool {
        self.options.all_touched
    }

    /// 当前使用的坐标变换矩阵
    pub fn geo_to_pix(&self) -> Option<Transform> {
        self.geo_to_pix
    }

    /// 开始处理新的线串时清空所有已填充点集
    ///
    /// 在累加模式下，同一线串的相邻线段共享端点像素，
    /// 两个点集保证每个像素只被累加一次。
    pub(crate) fn new_linestring(&mut self) {
        self.previous_burnt_points.clear();
        self.current_burnt_points.clear();
    }

    /// 开始处理新的线段时交换并清空当前点集
    pub(crate) fn new_line(&mut self) {
        std::mem::swap(
            &mut self.previous_burnt_points,
            &mut self.current_burnt_points,
        );
        self.current_burnt_points.clear();
    }

    fn begin_polygon(&mut self) {
        if self.options.merge_algorithm == MergeAlgorithm::Add {
            self.polygon_burnt_points = Some(HashSet::new());
        }
    }

    fn end_polygon(&mut self) {
        self.polygon_burnt_points = None;
    }

    pub(crate) fn fill_pixel(&mut self, ix: usize, iy: usize) {
        debug_assert!(ix < self.width());
        debug_assert!(iy < self.height());
        let mut slice = self.pixels.slice_mut(s![iy, ix]);
        match self.options.merge_algorithm {
            MergeAlgorithm::Replace => slice.fill(self.foreground),
            MergeAlgorithm::Add => {
                let foreground = self.foreground;
                slice.mapv_inplace(|v| v.accumulate(foreground));
            }
        }
    }

    fn fill_pixel_no_repeat(&mut self, ix: usize, iy: usize, use_current_too: bool) {
        match self.options.merge_algorithm {
            MergeAlgorithm::Replace => {
                self.fill_pixel(ix, iy);
            }
            MergeAlgorithm::Add => {
                let point = (ix, iy);
                let mut do_fill_pixel = !self.previous_burnt_points.contains(&point);
                if use_current_too {
                    do_fill_pixel = do_fill_pixel && !self.current_burnt_points.contains(&point);
                }
                if let Some(polygon) = &self.polygon_burnt_points {
                    do_fill_pixel = do_fill_pixel && !polygon.contains(&point);
                }
                if do_fill_pixel {
                    self.fill_pixel(ix, iy);
                    self.current_burnt_points.insert(point);
                    if let Some(polygon) = self.polygon_burnt_points.as_mut() {
                        polygon.insert(point);
                    }
                }
            }
        }
    }

    /// 填充水平线段`[x_start, x_end)`
    ///
    /// 数组最后一维是x，水平相邻的像素在内存中也相邻。
    /// 累加模式下，同一多边形中已经填充过的像素被跳过：
    /// 恰好落在扫描线上的水平边与交点区间会覆盖同一行。
    pub(crate) fn fill_horizontal_line(&mut self, x_start: usize, x_end: usize, y: usize) {
        match (self.options.merge_algorithm, self.polygon_burnt_points.as_mut()) {
            (MergeAlgorithm::Replace, _) => {
                self.pixels
                    .slice_mut(s![y, x_start..x_end])
                    .fill(self.foreground);
            }
            (MergeAlgorithm::Add, Some(polygon)) => {
                let foreground = self.foreground;
                for x in x_start..x_end {
                    if polygon.insert((x, y)) {
                        let pixel = &mut self.pixels[[y, x]];
                        *pixel = pixel.accumulate(foreground);
                    }
                }
            }
            (MergeAlgorithm::Add, None) => {
                let foreground = self.foreground;
                self.pixels
                    .slice_mut(s![y, x_start..x_end])
                    .mapv_inplace(|v| v.accumulate(foreground));
            }
        }
    }

    /// 填充水平线段`[x_start, x_end]`，但避免重复填充
    pub(crate) fn fill_horizontal_line_no_repeat(
        &mut self,
        x_start: usize,
        x_end: usize,
        y: usize,
    ) {
        for x in x_start..=x_end {
            self.fill_pixel_no_repeat(x, y, true);
        }
    }

    /// 填充垂直线段`[y_start, y_end]`，但避免重复填充
    pub(crate) fn fill_vertical_line_no_repeat(&mut self, x: usize, y_start: usize, y_end: usize) {
        for y in y_start..=y_end {
            self.fill_pixel_no_repeat(x, y, false);
        }
    }

    /// 将一个几何形状以`foreground`值烧录进网格
    ///
    /// 形状可以是[geo]提供的任何类型，坐标可以是任何能转换为f64的数值类型。
    /// 设置了变换矩阵时，坐标先从世界坐标转换到像素坐标。
    ///
    /// # 错误
    /// 如果坐标包含非有限值，返回[ConversionError::NonFiniteCoordinate]
    pub fn burn<Coord, InputShape, ShapeAsF64>(
        &mut self,
        shape: &InputShape,
        foreground: Label,
    ) -> Result<()>
    where
        InputShape: MapCoords<Coord, f64, Output = ShapeAsF64>,
        ShapeAsF64: Rasterize<Label> + for<'a> CoordsIter<Scalar = f64> + MapCoordsInPlace<f64>,
        Coord: Into<f64> + Copy + Debug + Num + NumCast + PartialOrd,
    {
        let mut float = shape.map_coords(to_float);

        let all_finite = float
            .coords_iter()
            .all(|coordinate| coordinate.x.is_finite() && coordinate.y.is_finite());
        if !all_finite {
            return Err(ConversionError::NonFiniteCoordinate);
        }

        if self.width() == 0 || self.height() == 0 {
            return Ok(());
        }

        self.foreground = foreground;

        if let Some(transform) = self.geo_to_pix {
            float.map_coords_in_place(|coord| {
                transform
                    .transform_point(EuclidPoint::new(coord.x, coord.y))
                    .to_tuple()
                    .into()
            });
        }
        float.rasterize(self);

        Ok(())
    }

    /// 取回烧录完成的网格
    pub fn finish(self) -> Array2<Label> {
        self.pixels
    }
}

impl<Label: BurnValue> Rasterize<Label> for Point<f64> {
    /// 点只烧录其所在的单个像素
    fn rasterize(&self, burner: &mut Burner<Label>) {
        if self.x() >= 0. && self.y() >= 0. {
            let x = self.x().floor() as usize;
            let y = self.y().floor() as usize;
            if x < burner.width() && y < burner.height() {
                burner.fill_pixel(x, y);
            }
        }
    }
}

impl<Label: BurnValue> Rasterize<Label> for MultiPoint<f64> {
    fn rasterize(&self, burner: &mut Burner<Label>) {
        self.iter().for_each(|point| point.rasterize(burner));
    }
}

impl<Label: BurnValue> Rasterize<Label> for Rect<f64> {
    /// 仿射变换后矩形可能不再与坐标轴对齐，因此按多边形处理
    fn rasterize(&self, burner: &mut Burner<Label>) {
        self.to_polygon().rasterize(burner);
    }
}

impl<Label: BurnValue> Rasterize<Label> for Line<f64> {
    fn rasterize(&self, burner: &mut Burner<Label>) {
        burner.new_linestring();
        rasterize_line(self, burner);
    }
}

impl<Label: BurnValue> Rasterize<Label> for LineString<f64> {
    /// 与GDAL一致，闭合的线串仍按线段序列处理，不会被填充
    fn rasterize(&self, burner: &mut Burner<Label>) {
        burner.new_linestring();
        self.lines().for_each(|line| {
            burner.new_line();
            rasterize_line(&line, burner);
        });
    }
}

impl<Label: BurnValue> Rasterize<Label> for MultiLineString<f64> {
    fn rasterize(&self, burner: &mut Burner<Label>) {
        self.iter()
            .for_each(|line_string| line_string.rasterize(burner));
    }
}

impl<Label: BurnValue> Rasterize<Label> for Polygon<f64> {
    fn rasterize(&self, burner: &mut Burner<Label>) {
        burner.begin_polygon();
        rasterize_polygon(self.exterior(), self.interiors(), burner);
        burner.end_polygon();
    }
}

impl<Label: BurnValue> Rasterize<Label> for MultiPolygon<f64> {
    fn rasterize(&self, burner: &mut Burner<Label>) {
        self.iter().for_each(|poly| poly.rasterize(burner));
    }
}

impl<Label: BurnValue> Rasterize<Label> for Triangle<f64> {
    fn rasterize(&self, burner: &mut Burner<Label>) {
        self.to_polygon().rasterize(burner)
    }
}

impl<Label: BurnValue> Rasterize<Label> for Geometry<f64> {
    fn rasterize(&self, burner: &mut Burner<Label>) {
        match self {
            Geometry::Point(point) => point.rasterize(burner),
            Geometry::Line(line) => line.rasterize(burner),
            Geometry::LineString(ls) => ls.rasterize(burner),
            Geometry::Polygon(poly) => poly.rasterize(burner),
            Geometry::GeometryCollection(gc) => gc.rasterize(burner),
            Geometry::MultiPoint(points) => points.rasterize(burner),
            Geometry::MultiLineString(lines) => lines.rasterize(burner),
            Geometry::MultiPolygon(polys) => polys.rasterize(burner),
            Geometry::Rect(rect) => rect.rasterize(burner),
            Geometry::Triangle(tri) => tri.rasterize(burner),
        }
    }
}

impl<Label: BurnValue> Rasterize<Label> for GeometryCollection<f64> {
    fn rasterize(&self, burner: &mut Burner<Label>) {
        self.iter().for_each(|thing| thing.rasterize(burner));
    }
}
