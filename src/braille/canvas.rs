use glam::DVec2;
use unicode_width::UnicodeWidthChar;

use super::color::{Rgb, RESET};
use crate::map::geometry::{fill_polygon, Bresenham};
use crate::map::projection::{geo_to_pixel, GeoPoint};

/// Glyph used for overlay "splat" pixels
pub const SPLAT: char = '⬤';

const BRAILLE_BASE: u32 = 0x2800;

/// Braille dot layout per character, indexed `[y % 4][x % 2]`:
/// ```text
/// (0,0) (1,0)   bits: 0x01 0x08
/// (0,1) (1,1)   bits: 0x02 0x10
/// (0,2) (1,2)   bits: 0x04 0x20
/// (0,3) (1,3)   bits: 0x40 0x80
/// ```
const BRAILLE_BITS: [[u8; 2]; 4] = [[0x01, 0x08], [0x02, 0x10], [0x04, 0x20], [0x40, 0x80]];

/// One serialized terminal cell
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell {
    pub ch: char,
    pub color: Option<Rgb>,
}

/// Braille pixel canvas for terminal map rendering.
/// Each character cell represents a 2x4 pixel grid (8 dots), plus an
/// optional override character and a colour.
pub struct Canvas {
    width: usize,  // Pixels
    height: usize, // Pixels
    cols: usize,
    rows: usize,
    pixels: Vec<u8>,
    chars: Vec<Option<char>>,
    colors: Vec<Option<Rgb>>,
}

impl Canvas {
    /// Create a canvas with the given pixel dimensions.
    /// Character resolution: width/2 x height/4
    pub fn new(width: usize, height: usize) -> Self {
        let cols = width / 2;
        let rows = height / 4;
        let size = cols * rows;
        Self {
            width,
            height,
            cols,
            rows,
            pixels: vec![0; size],
            chars: vec![None; size],
            colors: vec![None; size],
        }
    }

    /// Canvas covering `cols` x `rows` character cells
    pub fn for_chars(cols: usize, rows: usize) -> Self {
        Self::new(cols * 2, rows * 4)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Cell index for a pixel, `None` when off-canvas
    #[inline(always)]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (cx, cy) = (x as usize / 2, y as usize / 4);
        (cx < self.cols && cy < self.rows).then_some(cx + cy * self.cols)
    }

    /// Set one braille dot. The first colour to touch a cell is kept.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Rgb) {
        if let Some(idx) = self.index(x, y) {
            self.pixels[idx] |= BRAILLE_BITS[y as usize % 4][x as usize % 2];
            self.colors[idx].get_or_insert(color);
        }
    }

    /// Replace the whole cell with a filled marker, overwriting its colour
    pub fn splat_pixel(&mut self, x: i32, y: i32, color: Rgb) {
        if let Some(idx) = self.index(x, y) {
            self.chars[idx] = Some(SPLAT);
            self.colors[idx] = Some(color);
        }
    }

    pub fn line(&mut self, a: DVec2, b: DVec2, color: Rgb) {
        for (x, y) in Bresenham::between(a, b) {
            self.set_pixel(x, y, color);
        }
    }

    pub fn polyline(&mut self, points: &[DVec2], color: Rgb) {
        for pair in points.windows(2) {
            self.line(pair[0], pair[1], color);
        }
    }

    /// Fill an outer ring and its holes (even-odd), then trace every ring
    pub fn polygon(&mut self, rings: &[Vec<DVec2>], color: Rgb) {
        let (w, h) = (self.width as i32, self.height as i32);
        fill_polygon(rings, w, h, |x, y| self.set_pixel(x, y, color));

        for ring in rings {
            self.polyline(ring, color);
            if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
                self.line(*last, *first, color);
            }
        }
    }

    /// Write text centred on pixel `(x, y)`, one character per two pixel columns
    pub fn text(&mut self, text: &str, x: i32, y: i32, color: Rgb) {
        let width = display_width(text) as i32;
        let mut x = x - (width / 2) * 2;
        for ch in text.chars() {
            if let Some(idx) = self.index(x, y) {
                self.chars[idx] = Some(ch);
                self.colors[idx] = Some(color);
            }
            x += 2 * ch.width().unwrap_or(0).max(1) as i32;
        }
    }

    /// Splat a straight line between two coordinates onto the current view
    pub fn splat_line_geo(&mut self, origin: GeoPoint, dest: GeoPoint, center: GeoPoint, zoom: f64, color: Rgb) {
        let a = geo_to_pixel(origin, center, zoom, self.width, self.height);
        let b = geo_to_pixel(dest, center, zoom, self.width, self.height);
        if !(a.is_finite() && b.is_finite()) {
            return;
        }
        for (x, y) in Bresenham::between(a, b) {
            self.splat_pixel(x, y, color);
        }
    }

    /// Cell contents at a character position
    pub fn cell(&self, col: usize, row: usize) -> Option<Cell> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        let idx = col + row * self.cols;
        let ch = match (self.chars[idx], self.pixels[idx]) {
            (Some(ch), _) => ch,
            (None, 0) => ' ',
            (None, bits) => char::from_u32(BRAILLE_BASE + bits as u32).unwrap_or(' '),
        };
        Some(Cell {
            ch,
            color: self.colors[idx],
        })
    }

    /// Row-major iterator of `(col, row, cell)`
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, Cell)> + '_ {
        (0..self.rows).flat_map(move |row| {
            (0..self.cols).filter_map(move |col| self.cell(col, row).map(|c| (col, row, c)))
        })
    }

    /// Serialize to a printable string.
    ///
    /// A colour escape is emitted only when the colour changes. Every row
    /// ends with a reset; rows are joined by newlines.
    pub fn frame(&self) -> String {
        let mut out = String::with_capacity(self.cols * self.rows * 4);
        for row in 0..self.rows {
            let mut current: Option<Rgb> = None;
            for col in 0..self.cols {
                let Some(cell) = self.cell(col, row) else {
                    continue;
                };
                if cell.color != current {
                    out.push_str(RESET);
                    if let Some(color) = cell.color {
                        color.write_escape(&mut out);
                    }
                    current = cell.color;
                }
                out.push(cell.ch);
            }
            out.push_str(RESET);
            if row + 1 < self.rows {
                out.push('\n');
            }
        }
        out
    }
}

/// Width of a string in terminal columns
pub fn display_width(text: &str) -> usize {
    unicode_width::UnicodeWidthStr::width(text)
}
