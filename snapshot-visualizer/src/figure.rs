use std::path::Path;

use image::{ImageError, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;
use log::debug;
use ndarray::ArrayView2;
use snapshot_common::{Mesh, SnapshotError};

use crate::color::{contrasting_text, ColorTable, Colormap};
use crate::font::{draw_text, draw_text_centered, draw_text_right, text_height, FONT_HEIGHT};
use crate::ticks::{format_tick, nice_ticks};

const MARGIN_LEFT: u32 = 70;
const MARGIN_RIGHT: u32 = 100;
const MARGIN_TOP: u32 = 34;
const MARGIN_BOTTOM: u32 = 36;
const MIN_PLOT: u32 = 32;
const COLORBAR_GAP: u32 = 14;
const COLORBAR_WIDTH: u32 = 16;
const TICK_LEN: f32 = 4.0;
const TITLE_SCALE: u32 = 2;

/// Smallest figure that still leaves room for the plot area.
pub const MIN_WIDTH: u32 = MARGIN_LEFT + MARGIN_RIGHT + MIN_PLOT;
pub const MIN_HEIGHT: u32 = MARGIN_TOP + MARGIN_BOTTOM + MIN_PLOT;

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub colormap: Colormap,
    /// Same pixels-per-unit on both axes.
    pub equal_aspect: bool,
    pub background: Rgb<u8>,
    /// Center the color range on zero.
    pub symmetric: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            width: 640,
            height: 480,
            colormap: Colormap::Viridis,
            equal_aspect: false,
            background: Rgb([255, 255, 255]),
            symmetric: false,
        }
    }
}

/// A rendered pseudocolor plot of one field.
#[derive(Debug, Clone)]
pub struct Figure {
    pub name: String,
    pub title: String,
    /// Color scale limits actually used.
    pub range: (f64, f64),
    pub image: RgbImage,
}

impl Figure {
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ImageError> {
        self.image.save(path)
    }
}

/// Title shown above a field plot.
pub fn figure_title(field: &str, time: f64) -> String {
    format!("{} @ t={:.6}", field, time)
}

/// Color scale limits for `values`. Non-finite entries are ignored and a
/// constant field gets a padded range.
pub fn color_range(values: ArrayView2<'_, f64>, symmetric: bool) -> (f64, f64) {
    let (lo, hi) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if lo > hi {
        return if symmetric { (-1.0, 1.0) } else { (0.0, 1.0) };
    }
    let (lo, hi) = if symmetric {
        let m = lo.abs().max(hi.abs());
        (-m, m)
    } else {
        (lo, hi)
    };
    if hi > lo {
        (lo, hi)
    } else {
        let pad = if lo == 0.0 { 1.0 } else { lo.abs() * 0.1 };
        (lo - pad, hi + pad)
    }
}

// Maps data coordinates into the framed plot box.
struct Transform {
    left: f64,
    bottom: f64,
    xmin: f64,
    ymin: f64,
    sx: f64,
    sy: f64,
}

impl Transform {
    fn to_px(&self, x: f64, y: f64) -> (f64, f64) {
        (self.left + (x - self.xmin) * self.sx, self.bottom - (y - self.ymin) * self.sy)
    }
}

fn padded(lo: f64, hi: f64) -> (f64, f64) {
    if !lo.is_finite() || !hi.is_finite() {
        (0.0, 1.0)
    } else if hi > lo {
        (lo, hi)
    } else {
        (lo - 0.5, hi + 0.5)
    }
}

/// Paints every cell of `mesh` with the color of the matching entry in
/// `values`, then adds axes, a color bar and the title.
pub fn render_field(
    mesh: &Mesh,
    values: ArrayView2<'_, f64>,
    name: &str,
    title: &str,
    options: &RenderOptions,
) -> Result<Figure, SnapshotError> {
    let (n1, n2) = mesh.cells();
    if values.dim() != (n1, n2) {
        return Err(SnapshotError::Shape(format!(
            "field '{}' has shape {:?} but the mesh has {}x{} cells",
            name,
            values.dim(),
            n1,
            n2
        )));
    }

    let width = options.width.max(MIN_WIDTH);
    let height = options.height.max(MIN_HEIGHT);
    let mut image = RgbImage::from_pixel(width, height, options.background);
    let ink = contrasting_text(options.background);

    let (xmin, xmax, ymin, ymax) = mesh.bounds();
    let (xmin, xmax) = padded(xmin, xmax);
    let (ymin, ymax) = padded(ymin, ymax);

    let area_w = (width - MARGIN_LEFT - MARGIN_RIGHT) as f64;
    let area_h = (height - MARGIN_TOP - MARGIN_BOTTOM) as f64;
    let mut sx = area_w / (xmax - xmin);
    let mut sy = area_h / (ymax - ymin);
    if options.equal_aspect {
        let s = sx.min(sy);
        sx = s;
        sy = s;
    }
    let box_w = ((xmax - xmin) * sx).round().max(1.0);
    let box_h = ((ymax - ymin) * sy).round().max(1.0);
    let box_left = MARGIN_LEFT as f64 + ((area_w - box_w) / 2.0).floor();
    let box_top = MARGIN_TOP as f64 + ((area_h - box_h) / 2.0).floor();
    let transform = Transform {
        left: box_left,
        bottom: box_top + box_h,
        xmin,
        ymin,
        sx,
        sy,
    };

    let range = color_range(values, options.symmetric);
    debug!("Rendering {} ({}x{} cells) with range [{}, {}]", name, n1, n2, range.0, range.1);
    let table = ColorTable::new(options.colormap);

    for i in 0..n1 {
        for j in 0..n2 {
            let color = table.lookup(values[[i, j]], range.0, range.1);
            let corners = mesh.cell_corners(i, j).map(|(x, y)| transform.to_px(x, y));
            fill_cell(&mut image, &corners, color);
        }
    }

    let frame = Rect::at(box_left as i32, box_top as i32).of_size(box_w as u32, box_h as u32);
    draw_hollow_rect_mut(&mut image, frame, ink);
    draw_axes(&mut image, &transform, (xmin, xmax), (ymin, ymax), ink);

    let bar_left = (MARGIN_LEFT as f64 + area_w) as i32 + COLORBAR_GAP as i32;
    draw_colorbar(&mut image, &table, range, bar_left, box_top as i32, box_h as u32, ink);

    draw_text_centered(&mut image, width as i32 / 2, 8, title, ink, TITLE_SCALE);

    Ok(Figure {
        name: name.to_string(),
        title: title.to_string(),
        range,
        image,
    })
}

fn fill_cell(image: &mut RgbImage, corners: &[(f64, f64); 4], color: Rgb<u8>) {
    let mut points: Vec<Point<i32>> = Vec::with_capacity(4);
    for &(x, y) in corners {
        let p = Point::new(x.round() as i32, y.round() as i32);
        if points.last() != Some(&p) {
            points.push(p);
        }
    }
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    match points.len() {
        0 => {}
        1 => {
            let p = points[0];
            if p.x >= 0 && p.y >= 0 && (p.x as u32) < image.width() && (p.y as u32) < image.height() {
                image.put_pixel(p.x as u32, p.y as u32, color);
            }
        }
        2 => draw_line_segment_mut(
            image,
            (points[0].x as f32, points[0].y as f32),
            (points[1].x as f32, points[1].y as f32),
            color,
        ),
        _ => draw_polygon_mut(image, &points, color),
    }
}

fn draw_axes(image: &mut RgbImage, t: &Transform, (xmin, xmax): (f64, f64), (ymin, ymax): (f64, f64), ink: Rgb<u8>) {
    let bottom = t.bottom as f32;
    let (xticks, xstep) = nice_ticks(xmin, xmax, 5);
    for &v in &xticks {
        let (px, _) = t.to_px(v, ymin);
        let px = px as f32;
        draw_line_segment_mut(image, (px, bottom), (px, bottom + TICK_LEN), ink);
        draw_text_centered(image, px as i32, (bottom + TICK_LEN) as i32 + 4, &format_tick(v, xstep), ink, 1);
    }

    let left = t.left as f32;
    let (yticks, ystep) = nice_ticks(ymin, ymax, 5);
    for &v in &yticks {
        let (_, py) = t.to_px(xmin, v);
        let py = py as f32;
        draw_line_segment_mut(image, (left - TICK_LEN, py), (left, py), ink);
        let label_y = py as i32 - FONT_HEIGHT as i32 / 2;
        draw_text_right(image, (left - TICK_LEN) as i32 - 3, label_y, &format_tick(v, ystep), ink, 1);
    }
}

fn draw_colorbar(
    image: &mut RgbImage,
    table: &ColorTable,
    (lo, hi): (f64, f64),
    left: i32,
    top: i32,
    height: u32,
    ink: Rgb<u8>,
) {
    for row in 0..height {
        let v = hi - (row as f64 + 0.5) / height as f64 * (hi - lo);
        let strip = Rect::at(left, top + row as i32).of_size(COLORBAR_WIDTH, 1);
        draw_filled_rect_mut(image, strip, table.lookup(v, lo, hi));
    }
    draw_hollow_rect_mut(image, Rect::at(left, top).of_size(COLORBAR_WIDTH, height), ink);

    let right = (left + COLORBAR_WIDTH as i32) as f32;
    let (ticks, step) = nice_ticks(lo, hi, 5);
    for &v in &ticks {
        let py = top as f32 + ((hi - v) / (hi - lo) * height as f64) as f32;
        draw_line_segment_mut(image, (right, py), (right + TICK_LEN, py), ink);
        let label_y = py as i32 - text_height(1) as i32 / 2;
        draw_text(image, (right + TICK_LEN) as i32 + 3, label_y, &format_tick(v, step), ink, 1);
    }
}
