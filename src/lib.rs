//! Vector tile maps rendered to the terminal as braille dots with truecolor
//! ANSI escapes.
//!
//! [`tile::TileCache`] fetches and decodes tiles, styled by a [`style::Styler`].
//! A [`map::Renderer`] draws the tiles around a [`map::Viewport`] onto a
//! [`braille::Canvas`], which serializes to a printable frame.

pub mod braille;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod map;
pub mod route;
pub mod style;
pub mod tile;

pub use config::MapConfig;
pub use error::{FetchError, FilterError, RenderError, StyleError, TileError};
pub use map::{GeoPoint, Renderer, Viewport};
pub use route::{render_legs, Leg};
pub use style::Styler;
pub use tile::{TileCache, TileKey};
