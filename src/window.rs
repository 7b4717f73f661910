//! 空间窗口、坐标参考系与网格仿射变换

use std::{fmt, str::FromStr};

use geo::{Polygon, Rect};
use serde::{Deserialize, Serialize};

use crate::{ConversionError, Result, Transform};

/// 坐标参考系，以EPSG代码标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crs(u32);

impl Crs {
    /// WGS 84 经纬度
    pub const WGS84: Crs = Crs(4326);
    /// Web墨卡托
    pub const POP_WEB: Crs = Crs(3857);

    pub const fn new(epsg: u32) -> Self {
        Crs(epsg)
    }

    pub fn epsg(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

impl FromStr for Crs {
    type Err = std::num::ParseIntError;

    /// 接受`EPSG:32633`、`epsg:32633`或`32633`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let code = match s.split_once(':') {
            Some((authority, code)) if authority.eq_ignore_ascii_case("epsg") => code,
            _ => s,
        };
        code.trim().parse().map(Crs)
    }
}

/// 某个坐标参考系中与坐标轴对齐的矩形窗口
///
/// 构造时保证两个轴上都有`min <= max`，之后不可修改。
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialWindow {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
    crs: Crs,
}

impl SpatialWindow {
    /// 用左下角和右上角坐标创建窗口
    ///
    /// # 错误
    /// 边界不是有限值或最小值大于最大值时返回[ConversionError::InvalidBounds]
    pub fn new(lower_left: (f64, f64), upper_right: (f64, f64), crs: Crs) -> Result<Self> {
        let (min_x, min_y) = lower_left;
        let (max_x, max_y) = upper_right;
        let finite = [min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite());
        if !finite || min_x > max_x || min_y > max_y {
            return Err(ConversionError::InvalidBounds {
                min_x,
                min_y,
                max_x,
                max_y,
            });
        }
        Ok(SpatialWindow {
            min_x,
            min_y,
            max_x,
            max_y,
            crs,
        })
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn lower_left(&self) -> (f64, f64) {
        (self.min_x, self.min_y)
    }

    pub fn upper_right(&self) -> (f64, f64) {
        (self.max_x, self.max_y)
    }

    /// x方向的跨度
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// y方向的跨度
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new((self.min_x, self.min_y), (self.max_x, self.max_y))
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        self.to_rect().to_polygon()
    }
}

/// 网格索引与地理坐标之间的仿射映射（北向朝上）
///
/// 像素`(列, 行)`的左上角对应`(min_x + 列 * px, max_y - 行 * py)`。
/// 每次转换调用时从窗口临时推导，不单独保存。
#[derive(Debug, Clone, PartialEq)]
pub struct GeoTransform {
    origin_x: f64,
    origin_y: f64,
    pixel_width: f64,
    pixel_height: f64,
    height: usize,
    width: usize,
    crs: Crs,
}

impl GeoTransform {
    /// 将窗口均分为`height`行、`width`列
    pub fn from_bounds(window: &SpatialWindow, height: usize, width: usize) -> Result<Self> {
        if height == 0 || width == 0 {
            return Err(ConversionError::UnresolvableShape(format!(
                "输出形状 ({height}, {width}) 不能为空"
            )));
        }
        if window.width() <= 0. || window.height() <= 0. {
            return Err(ConversionError::UnresolvableShape(
                "窗口面积为零，无法划分像素".into(),
            ));
        }
        let (origin_x, _) = window.lower_left();
        let (_, origin_y) = window.upper_right();
        Ok(GeoTransform {
            origin_x,
            origin_y,
            pixel_width: window.width() / width as f64,
            pixel_height: window.height() / height as f64,
            height,
            width,
            crs: window.crs(),
        })
    }

    /// 按给定像素大小划分窗口：`width = (max_x - min_x) / pixel_width`，四舍五入
    pub fn from_resolution(
        window: &SpatialWindow,
        pixel_width: f64,
        pixel_height: f64,
    ) -> Result<Self> {
        if !(pixel_width.is_finite() && pixel_height.is_finite())
            || pixel_width <= 0.
            || pixel_height <= 0.
        {
            return Err(ConversionError::UnresolvableShape(format!(
                "非法的像素大小 ({pixel_width}, {pixel_height})"
            )));
        }
        let width = (window.width() / pixel_width).round() as usize;
        let height = (window.height() / pixel_height).round() as usize;
        Self::from_bounds(window, height, width)
    }

    /// 网格形状`(height, width)`
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// 像素大小`(px, py)`
    pub fn resolution(&self) -> (f64, f64) {
        (self.pixel_width, self.pixel_height)
    }

    /// 世界坐标到像素坐标（x为列，y为行）
    pub fn geo_to_pix(&self) -> Transform {
        Transform::new(
            1. / self.pixel_width,
            0.,
            0.,
            -1. / self.pixel_height,
            -self.origin_x / self.pixel_width,
            self.origin_y / self.pixel_height,
        )
    }

    /// 像素坐标到世界坐标
    pub fn pix_to_geo(&self) -> Transform {
        Transform::new(
            self.pixel_width,
            0.,
            0.,
            -self.pixel_height,
            self.origin_x,
            self.origin_y,
        )
    }
}
