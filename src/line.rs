use geo::Line;

use crate::burn::{BurnValue, Burner};

/// 判定垂直/水平线段的阈值（像素）
const AXIS_THRESHOLD: f64 = 0.01;
/// 跨越扫描线时的最小步长，避免停在像素边界上
const STEP_EPSILON: f64 = 0.000000001;

/// 烧录一条线段（像素坐标）经过的所有像素
pub fn rasterize_line<Label>(line: &Line<f64>, burner: &mut Burner<Label>)
where
    Label: BurnValue,
{
    let width = burner.width() as f64;
    let height = burner.height() as f64;

    if (line.start.y < 0. && line.end.y < 0.)
        || (line.start.y > height && line.end.y > height)
        || (line.start.x < 0. && line.end.x < 0.)
        || (line.start.x > width && line.end.x > width)
    {
        return;
    }

    // 统一从左向右处理
    let line = if line.start.x > line.end.x {
        Line::new(line.end, line.start)
    } else {
        *line
    };

    let is_vertical =
        (line.start.x.floor() == line.end.x.floor()) || line.dx().abs() < AXIS_THRESHOLD;
    let is_horizontal =
        (line.start.y.floor() == line.end.y.floor()) || line.dy().abs() < AXIS_THRESHOLD;

    if is_vertical {
        burn_vertical(&line, burner);
    } else if is_horizontal {
        burn_horizontal(&line, burner);
    } else {
        burn_sloped(&line, burner);
    }
}

fn burn_vertical<Label: BurnValue>(line: &Line<f64>, burner: &mut Burner<Label>) {
    let (y_start, y_end) = if line.start.y > line.end.y {
        (line.end.y, line.start.y)
    } else {
        (line.start.y, line.end.y)
    };

    let ix = line.end.x.floor() as isize;
    if ix < 0 || ix >= (burner.width() as isize) {
        return;
    }

    let last_row = burner.height() - 1;
    let y_start = (y_start.floor() as usize).min(last_row);
    let y_end = (y_end.floor() as usize).min(last_row);
    burner.fill_vertical_line_no_repeat(ix as usize, y_start, y_end);
}

fn burn_horizontal<Label: BurnValue>(line: &Line<f64>, burner: &mut Burner<Label>) {
    // 已保证 start.x <= end.x
    let iy = line.start.y.floor() as isize;
    if iy < 0 || iy >= (burner.height() as isize) {
        return;
    }

    let last_column = burner.width() - 1;
    let x_start = (line.start.x.floor() as usize).min(last_column);
    let x_end = (line.end.x.floor() as usize).min(last_column);
    burner.fill_horizontal_line_no_repeat(x_start, x_end, iy as usize);
}

/// 斜线：先裁剪到网格范围，再逐像素步进
fn burn_sloped<Label: BurnValue>(line: &Line<f64>, burner: &mut Burner<Label>) {
    let width = burner.width() as f64;
    let height = burner.height() as f64;

    let slope = line.slope();
    let (mut x_start, mut y_start) = line.start.x_y();
    let (mut x_end, mut y_end) = line.end.x_y();

    if x_end > width {
        y_end -= (x_end - width) * slope;
        x_end = width;
    }
    if x_start < 0. {
        y_start += (0. - x_start) * slope;
        x_start = 0.;
    }

    if y_end > y_start {
        if y_start < 0. {
            x_start += -y_start / slope;
            y_start = 0.;
        }
        if y_end >= height {
            x_end += (y_end - height) / slope;
        }
    } else {
        if y_start >= height {
            x_start += (height - y_start) / slope;
            y_start = height;
        }
        if y_end < 0. {
            x_end -= y_end / slope;
        }
    }

    while (x_start >= 0.) && (x_start < x_end) {
        let ix = x_start.floor() as isize;
        let iy = y_start.floor() as isize;

        if iy >= 0 && ((iy as usize) < burner.height()) && ((ix as usize) < burner.width()) {
            burner.fill_horizontal_line_no_repeat(ix as usize, ix as usize, iy as usize);
        }

        let mut x_step = (x_start + 1.).floor() - x_start;
        let mut y_step = x_step * slope;

        if ((y_start + y_step).floor() as isize) == iy {
            // 仍在同一行
        } else if slope < 0. {
            y_step = ((iy as f64) - y_start).min(-STEP_EPSILON);
            x_step = y_step / slope;
        } else {
            y_step = (((iy + 1) as f64) - y_start).max(STEP_EPSILON);
            x_step = y_step / slope;
        }

        x_start += x_step;
        y_start += y_step;
    }
}
