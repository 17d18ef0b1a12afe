use std::path::PathBuf;
use std::time::Duration;

/// Size in pixels of one tile at an integer zoom level
pub const PROJECT_SIZE: f64 = 256.0;

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 18.0;

/// Deepest zoom level tiles are requested at; deeper zooms scale this grid up
pub const TILE_RANGE: u32 = 14;

/// Web Mercator latitude limit
pub const MAX_LATITUDE: f64 = 85.0511287798;

/// Glyph drawn for symbol features without a name
pub const POI_MARKER: &str = "◉";

/// Douglas-Peucker tolerance (canvas pixels) applied to lines before drawing
pub const SIMPLIFY_TOLERANCE: f64 = 0.5;

pub const DEFAULT_TILE_URL: &str = "http://mapscii.me/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime settings for the tile source and caches.
#[derive(Clone, Debug)]
pub struct MapConfig {
    /// Base URL; tiles are requested as `{tile_url}{z}/{x}/{y}.pbf`
    pub tile_url: String,
    /// Directory holding raw tiles named `{z}-{x}-{y}`. `None` disables the disk cache.
    pub cache_dir: Option<PathBuf>,
    pub user_agent: String,
    pub timeout: Duration,
    /// Style document to load instead of the embedded one
    pub style_path: Option<PathBuf>,
}

impl MapConfig {
    pub fn with_tile_url(mut self, url: impl Into<String>) -> Self {
        self.tile_url = url.into();
        self
    }

    pub fn with_cache_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.cache_dir = dir;
        self
    }

    pub fn with_style_path(mut self, path: Option<PathBuf>) -> Self {
        self.style_path = path;
        self
    }

    /// URL for a single tile
    pub fn tile_url_for(&self, z: u32, x: u32, y: u32) -> String {
        format!("{}{}/{}/{}.pbf", self.tile_url, z, x, y)
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("tui-tilemap");

        Self {
            tile_url: DEFAULT_TILE_URL.to_string(),
            cache_dir: Some(cache_dir),
            user_agent: format!("tui-tilemap/{}", env!("CARGO_PKG_VERSION")),
            timeout: DEFAULT_TIMEOUT,
            style_path: None,
        }
    }
}
