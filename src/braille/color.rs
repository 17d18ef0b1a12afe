use std::collections::HashMap;
use std::fmt::Write;
use std::sync::{Mutex, PoisonError};

pub const RESET: &str = "\x1b[0m";

/// 24-bit terminal colour
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(0xff, 0xff, 0xff);
    pub const RED: Rgb = Rgb::new(0xff, 0x00, 0x00);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` or `#RGB` (leading `#` optional)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();

        match hex.len() {
            6 if hex.is_ascii() => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 if hex.is_ascii() => {
                let short = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 0x11);
                Some(Self::new(short(0)?, short(1)?, short(2)?))
            }
            _ => None,
        }
    }

    /// Truecolor foreground escape sequence
    pub fn ansi_escape(&self) -> String {
        format!("\x1b[38;2;{};{};{}m", self.r, self.g, self.b)
    }

    /// Append the escape sequence without allocating
    pub fn write_escape(&self, out: &mut String) {
        let _ = write!(out, "\x1b[38;2;{};{};{}m", self.r, self.g, self.b);
    }
}

/// Convert a hex colour to a truecolor escape. Unparseable input renders white.
pub fn hex_to_ansi(hex: &str) -> String {
    Rgb::from_hex(hex).unwrap_or(Rgb::WHITE).ansi_escape()
}

/// Memoized hex → colour conversion, shared across tile decodes.
#[derive(Default)]
pub struct ColorCache {
    entries: Mutex<HashMap<String, Rgb>>,
}

impl ColorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, hex: &str) -> Rgb {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(rgb) = entries.get(hex) {
            return *rgb;
        }
        let rgb = Rgb::from_hex(hex).unwrap_or_else(|| {
            tracing::debug!(hex, "unparseable colour, using white");
            Rgb::WHITE
        });
        entries.insert(hex.to_string(), rgb);
        rgb
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
