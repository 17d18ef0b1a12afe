pub mod geometry;
pub mod projection;
pub mod renderer;

pub use projection::{focus_on, geo_to_pixel, GeoPoint, Viewport};
pub use renderer::{visible_tiles, Renderer, BASE_LAYERS, LABEL_LAYERS};
