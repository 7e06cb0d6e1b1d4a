use image::Rgba;
use rayon::prelude::*;

use crate::canvas::{Point, RasterSurface};
use crate::color::opaque;

/// Thinnest stroke we rasterize; below this a 1px diagonal breaks into dots.
const MIN_HALF_WIDTH: f32 = 0.75;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    /// Connected path through every sample, round caps and joins.
    Freehand,
    Line,
    Rectangle,
    /// Centered on the first point; radius is the distance to the last point.
    Circle,
    /// Apex at the first point, base through the last point mirrored about
    /// the apex's x.
    Triangle,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub color: Rgba<u8>,
    pub width: f32,
    /// Fill the interior of closed shapes instead of stroking their outline.
    pub filled: bool,
}

impl StrokeStyle {
    #[inline]
    fn half_width(&self) -> f32 {
        (self.width * 0.5).max(MIN_HALF_WIDTH)
    }
}

/// Render `kind` through `points` (gesture start first, current pointer last).
///
/// Stateless: the caller restores the pre-gesture surface before every call,
/// so a drag re-renders the whole shape from scratch each move.
pub fn render(surface: &mut RasterSurface, kind: ShapeKind, points: &[Point], style: &StrokeStyle) {
    let (Some(&start), Some(&end)) = (points.first(), points.last()) else {
        return;
    };
    match kind {
        ShapeKind::Freehand => draw_path(surface, points, style),
        ShapeKind::Line => draw_path(surface, &[start, end], style),
        ShapeKind::Rectangle => draw_rect(surface, start, end, style),
        ShapeKind::Circle => draw_circle(surface, start, start.distance(end), style),
        ShapeKind::Triangle => {
            let mirrored = Point::new(2.0 * start.x - end.x, end.y);
            draw_polygon(surface, &[start, end, mirrored], style);
        }
    }
}

/// Round-capped capsules between consecutive samples. A single sample is a dot.
pub fn draw_path(surface: &mut RasterSurface, points: &[Point], style: &StrokeStyle) {
    let half = style.half_width();
    match points {
        [] => {}
        [p] => {
            let p = *p;
            paint_where(surface, bounds_of(&[p], half), style.color, |x, y| {
                p.distance(Point::new(x, y)) <= half
            });
        }
        _ => {
            // Each segment only touches its own bounding box; overlapping
            // writes are the same opaque color so order doesn't matter.
            for pair in points.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                paint_where(surface, bounds_of(&[a, b], half), style.color, |x, y| {
                    sdf_line_segment(x, y, a.x, a.y, b.x, b.y) <= half
                });
            }
        }
    }
}

pub fn draw_rect(surface: &mut RasterSurface, a: Point, b: Point, style: &StrokeStyle) {
    let cx = (a.x + b.x) * 0.5;
    let cy = (a.y + b.y) * 0.5;
    let hx = (b.x - a.x).abs() * 0.5;
    let hy = (b.y - a.y).abs() * 0.5;
    let half = style.half_width();
    let filled = style.filled;
    paint_where(surface, bounds_of(&[a, b], half), style.color, |x, y| {
        covered(sdf_box(x - cx, y - cy, hx, hy), filled, half)
    });
}

pub fn draw_circle(surface: &mut RasterSurface, center: Point, radius: f32, style: &StrokeStyle) {
    let half = style.half_width();
    let filled = style.filled;
    let reach = radius + half;
    let corners = [
        Point::new(center.x - reach, center.y - reach),
        Point::new(center.x + reach, center.y + reach),
    ];
    paint_where(surface, bounds_of(&corners, 0.0), style.color, |x, y| {
        covered(center.distance(Point::new(x, y)) - radius, filled, half)
    });
}

pub fn draw_polygon(surface: &mut RasterSurface, verts: &[Point], style: &StrokeStyle) {
    if verts.is_empty() {
        return;
    }
    let half = style.half_width();
    let filled = style.filled;
    paint_where(surface, bounds_of(verts, half), style.color, |x, y| {
        covered(sdf_polygon(verts, x, y), filled, half)
    });
}

#[inline]
fn covered(d: f32, filled: bool, half: f32) -> bool {
    if filled { d <= 0.0 } else { d.abs() <= half }
}

/// Axis-aligned float bounds of `pts`, grown by `pad`.
fn bounds_of(pts: &[Point], pad: f32) -> (f32, f32, f32, f32) {
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    for p in pts {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    (min_x - pad, min_y - pad, max_x + pad, max_y + pad)
}

/// Write `color` (opaque) into every pixel inside `bounds` whose centre
/// satisfies `inside`. Rows are processed in parallel.
fn paint_where<F>(
    surface: &mut RasterSurface,
    bounds: (f32, f32, f32, f32),
    color: Rgba<u8>,
    inside: F,
) where
    F: Fn(f32, f32) -> bool + Sync,
{
    let (min_x, min_y, max_x, max_y) = bounds;
    let w = surface.width() as i32;
    let h = surface.height() as i32;

    // Clamp while still in float space; huge or NaN bounds become 0..=w.
    let (wf, hf) = (w as f32, h as f32);
    let x0 = min_x.floor().clamp(0.0, wf) as i32;
    let y0 = min_y.floor().clamp(0.0, hf) as i32;
    let x1 = (max_x.ceil() + 1.0).clamp(0.0, wf) as i32;
    let y1 = (max_y.ceil() + 1.0).clamp(0.0, hf) as i32;
    if x1 <= x0 || y1 <= y0 {
        return;
    }

    let stride = w as usize * 4;
    let px = opaque(color).0;
    let rows = &mut surface.raw_mut()[y0 as usize * stride..y1 as usize * stride];

    rows.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(row, row_buf)| {
            let py = (y0 + row as i32) as f32 + 0.5;
            for x in x0..x1 {
                if inside(x as f32 + 0.5, py) {
                    let i = x as usize * 4;
                    row_buf[i..i + 4].copy_from_slice(&px);
                }
            }
        });
}

// ============================================================================
// SDF functions — return signed distance (negative = inside)
// ============================================================================

/// SDF for a box centred at origin with half-extents (hx, hy).
#[inline]
fn sdf_box(px: f32, py: f32, hx: f32, hy: f32) -> f32 {
    let dx = px.abs() - hx;
    let dy = py.abs() - hy;
    let outside = (dx.max(0.0) * dx.max(0.0) + dy.max(0.0) * dy.max(0.0)).sqrt();
    let inside = dx.max(dy).min(0.0);
    outside + inside
}

/// Unsigned distance to the segment a-b. Degenerates to point distance.
#[inline]
fn sdf_line_segment(px: f32, py: f32, ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let dx = bx - ax;
    let dy = by - ay;
    let len2 = dx * dx + dy * dy;
    let t = if len2 > f32::EPSILON {
        (((px - ax) * dx + (py - ay) * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let cx = ax + t * dx;
    let cy = ay + t * dy;
    ((px - cx) * (px - cx) + (py - cy) * (py - cy)).sqrt()
}

/// Signed distance to a simple polygon, either winding. Inside is decided by
/// crossing parity, so a zero-area polygon has no inside.
fn sdf_polygon(verts: &[Point], px: f32, py: f32) -> f32 {
    let n = verts.len();
    let mut d = f32::MAX;
    let mut s: f32 = 1.0;
    let mut j = n - 1;
    for i in 0..n {
        let (vi, vj) = (verts[i], verts[j]);
        d = d.min(sdf_line_segment(px, py, vi.x, vi.y, vj.x, vj.y));
        let ex = vj.x - vi.x;
        let ey = vj.y - vi.y;
        let wx = px - vi.x;
        let wy = py - vi.y;
        let c1 = py >= vi.y;
        let c2 = py < vj.y;
        let c3 = ex * wy > ey * wx;
        if (c1 && c2 && c3) || (!c1 && !c2 && !c3) {
            s = -s;
        }
        j = i;
    }
    s * d
}
