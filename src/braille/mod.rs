//! Braille rasterization: pixel canvas, colours and label placement.

pub mod canvas;
pub mod color;
pub mod label;

pub use canvas::{Canvas, Cell};
pub use color::{hex_to_ansi, ColorCache, Rgb};
pub use label::LabelBuffer;
