//! Polygon scan conversion.
//!
//! Pixel `(x, y)` samples the point `(x, y)`: integer coordinates are pixel
//! centers, matching how the labeling tool places vertices. The interior is
//! filled with the even-odd rule (self-intersecting polygons need no special
//! casing), using a half-open `[min_y, max_y)` edge rule so shared vertices
//! are not counted twice. The outline is then traced so boundary pixels are
//! always set, including horizontal edges and degenerate slivers.

use super::Raster;
use crate::annotation::Point;

/// Rasterize a polygon onto a fresh `width × height` canvas.
///
/// Callers are expected to pass at least three vertices. Vertices outside
/// the canvas are clipped. A polygon with a non-finite coordinate yields an
/// empty raster.
pub fn rasterize_polygon(width: u32, height: u32, points: &[Point]) -> Raster {
    let mut raster = Raster::new(width, height);
    if width == 0 || height == 0 || points.is_empty() {
        return raster;
    }
    if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return raster;
    }

    fill_even_odd(&mut raster, points);
    for (a, b) in edges(points) {
        trace_segment(&mut raster, *a, *b);
    }

    raster
}

fn edges(points: &[Point]) -> impl Iterator<Item = (&Point, &Point)> {
    points.iter().zip(points.iter().cycle().skip(1))
}

fn fill_even_odd(raster: &mut Raster, points: &[Point]) {
    let (min_y, max_y) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.y), hi.max(p.y))
        });

    let first_row = min_y.ceil().max(0.0);
    let last_row = max_y.floor().min(f64::from(raster.height() - 1));
    if first_row > last_row {
        return;
    }
    let last_col = f64::from(raster.width() - 1);

    let mut crossings: Vec<f64> = Vec::with_capacity(points.len());
    for row in first_row as u32..=last_row as u32 {
        let sy = f64::from(row);

        crossings.clear();
        for (a, b) in edges(points) {
            if (a.y <= sy) != (b.y <= sy) {
                crossings.push(a.x + (sy - a.y) * (b.x - a.x) / (b.y - a.y));
            }
        }
        crossings.sort_by(f64::total_cmp);

        for span in crossings.chunks_exact(2) {
            let start = span[0].ceil().max(0.0);
            let end = span[1].floor().min(last_col);
            if start > end {
                continue;
            }
            for col in start as u32..=end as u32 {
                raster.set(col, row);
            }
        }
    }
}

fn trace_segment(raster: &mut Raster, a: Point, b: Point) {
    let Some((a, b)) = clip_segment(a, b, raster.width(), raster.height()) else {
        return;
    };

    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let steps = dx.abs().max(dy.abs()).ceil() as usize;

    for i in 0..=steps {
        let t = if steps == 0 {
            0.0
        } else {
            i as f64 / steps as f64
        };
        let x = (a.x + t * dx).round();
        let y = (a.y + t * dy).round();
        if x >= 0.0 && y >= 0.0 {
            raster.set(x as u32, y as u32);
        }
    }
}

/// Liang-Barsky clip against the pixel area `[-0.5, w - 0.5] × [-0.5, h - 0.5]`.
fn clip_segment(a: Point, b: Point, width: u32, height: u32) -> Option<(Point, Point)> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    if !dx.is_finite() || !dy.is_finite() {
        return None;
    }

    let x_max = f64::from(width) - 0.5;
    let y_max = f64::from(height) - 0.5;
    let bounds = [
        (-dx, a.x + 0.5),
        (dx, x_max - a.x),
        (-dy, a.y + 0.5),
        (dy, y_max - a.y),
    ];

    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    for (p, q) in bounds {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    Some((
        Point::new(a.x + t0 * dx, a.y + t0 * dy),
        Point::new(a.x + t1 * dx, a.y + t1 * dy),
    ))
}
