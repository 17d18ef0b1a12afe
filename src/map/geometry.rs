use geo::{Coord, LineString, Simplify};
use glam::DVec2;

/// Integer points of a line segment, Bresenham's algorithm (all octants)
pub struct Bresenham {
    x: i32,
    y: i32,
    x1: i32,
    y1: i32,
    dx: i32,
    dy: i32,
    sx: i32,
    sy: i32,
    err: i32,
    done: bool,
}

impl Bresenham {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        Self {
            x: x0,
            y: y0,
            x1,
            y1,
            dx,
            dy,
            sx: if x0 < x1 { 1 } else { -1 },
            sy: if y0 < y1 { 1 } else { -1 },
            err: dx + dy,
            done: false,
        }
    }

    /// Segment between two canvas-space points, truncated to integer pixels
    pub fn between(a: DVec2, b: DVec2) -> Self {
        Self::new(a.x as i32, a.y as i32, b.x as i32, b.y as i32)
    }
}

impl Iterator for Bresenham {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let point = (self.x, self.y);

        if self.x == self.x1 && self.y == self.y1 {
            self.done = true;
            return Some(point);
        }

        let e2 = 2 * self.err;
        if e2 >= self.dy {
            self.err += self.dy;
            self.x += self.sx;
        }
        if e2 <= self.dx {
            self.err += self.dx;
            self.y += self.sy;
        }

        Some(point)
    }
}

/// Douglas-Peucker line simplification in canvas pixels
pub fn simplify(points: &[DVec2], tolerance: f64) -> Vec<DVec2> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let line: LineString<f64> = points.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
    line.simplify(&tolerance)
        .coords()
        .map(|c| DVec2::new(c.x, c.y))
        .collect()
}

/// Axis-aligned bounds of a point set as (min, max)
pub fn bounds<'a>(points: impl IntoIterator<Item = &'a DVec2>) -> Option<(DVec2, DVec2)> {
    points.into_iter().fold(None, |acc, p| match acc {
        None => Some((*p, *p)),
        Some((min, max)) => Some((min.min(*p), max.max(*p))),
    })
}

/// Even-odd scanline fill of a polygon with holes.
///
/// Every ring is treated as closed. Pixels are sampled at their centres and
/// only rows in `0..height` and columns in `0..width` are visited.
pub fn fill_polygon(rings: &[Vec<DVec2>], width: i32, height: i32, mut plot: impl FnMut(i32, i32)) {
    let Some((min, max)) = bounds(rings.iter().flatten()) else {
        return;
    };
    let y_start = (min.y.floor() as i32).max(0);
    let y_end = (max.y.ceil() as i32).min(height - 1);

    let mut crossings: Vec<f64> = Vec::new();
    for y in y_start..=y_end {
        let yc = y as f64 + 0.5;
        crossings.clear();

        for ring in rings {
            let n = ring.len();
            if n < 2 {
                continue;
            }
            for i in 0..n {
                let a = ring[i];
                let b = ring[(i + 1) % n];
                if (a.y <= yc) != (b.y <= yc) {
                    crossings.push(a.x + (yc - a.y) * (b.x - a.x) / (b.y - a.y));
                }
            }
        }

        crossings.sort_by(f64::total_cmp);
        for pair in crossings.chunks_exact(2) {
            let x_start = ((pair[0] - 0.5).ceil() as i32).max(0);
            let x_end = ((pair[1] - 0.5).floor() as i32).min(width - 1);
            for x in x_start..=x_end {
                plot(x, y);
            }
        }
    }
}
