#![allow(dead_code)]

use geozero::mvt::{tile, Message, Tile as MvtTile};
use std::f64::consts::PI;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tui_tilemap::error::FetchError;
use tui_tilemap::map::{Viewport, BASE_LAYERS, LABEL_LAYERS};
use tui_tilemap::tile::TileFetcher;
use tui_tilemap::{GeoPoint, MapConfig, Renderer, Styler, TileCache};

/// Serves the same bytes for every URL and counts requests
pub struct StubFetcher {
    calls: Arc<AtomicUsize>,
    response: Result<Vec<u8>, FetchError>,
}

impl TileFetcher for StubFetcher {
    fn fetch(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}

pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn cache_with(cache_dir: Option<&Path>, response: Result<Vec<u8>, FetchError>) -> (TileCache, Counter) {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = MapConfig::default()
        .with_tile_url("http://tiles.test/")
        .with_cache_dir(cache_dir.map(Path::to_path_buf));
    let styler = Arc::new(Styler::embedded().unwrap());
    let fetcher = StubFetcher {
        calls: Arc::clone(&calls),
        response,
    };
    (TileCache::with_fetcher(&config, styler, Box::new(fetcher)), Counter(calls))
}

pub fn offline() -> Result<Vec<u8>, FetchError> {
    Err(FetchError::Transport {
        url: "http://tiles.test/".into(),
        message: "connection refused".into(),
    })
}

fn string_value(s: &str) -> tile::Value {
    tile::Value {
        string_value: Some(s.to_string()),
        ..Default::default()
    }
}

fn layer(name: &str, features: Vec<tile::Feature>, keys: &[&str], values: Vec<tile::Value>) -> tile::Layer {
    tile::Layer {
        version: 2,
        name: name.to_string(),
        features,
        keys: keys.iter().map(|k| k.to_string()).collect(),
        values,
        extent: Some(4096),
    }
}

/// A tile with a lake in its top-left quarter, a motorway across the
/// middle and a city label at the centre.
pub fn sample_tile() -> Vec<u8> {
    let water = layer(
        "water",
        vec![tile::Feature {
            id: None,
            tags: vec![],
            r#type: Some(3),
            // square (256,256)-(1792,1792)
            geometry: vec![9, 512, 512, 26, 3072, 0, 0, 3072, 3071, 0, 15],
        }],
        &[],
        vec![],
    );
    let road = layer(
        "road",
        vec![tile::Feature {
            id: None,
            tags: vec![0, 0],
            r#type: Some(2),
            // (0,3072) to (4096,3072)
            geometry: vec![9, 0, 6144, 10, 8192, 0],
        }],
        &["class"],
        vec![string_value("motorway")],
    );
    let place = layer(
        "place_label",
        vec![tile::Feature {
            id: None,
            tags: vec![0, 0, 1, 1],
            r#type: Some(1),
            // (2048,2048)
            geometry: vec![9, 4096, 4096],
        }],
        &["name", "type"],
        vec![string_value("Sydney"), string_value("city")],
    );
    MvtTile {
        layers: vec![water, road, place],
    }
    .encode_to_vec()
}

pub fn gzipped(bytes: &[u8]) -> Vec<u8> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

/// Coordinate at the centre of tile `(x, y)` at integer zoom `z`
pub fn tile_centre(z: u32, x: u32, y: u32) -> GeoPoint {
    let n = f64::from(1u32 << z);
    let lon = (f64::from(x) + 0.5) / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * (f64::from(y) + 0.5) / n)).sinh().atan().to_degrees();
    GeoPoint::new(lat, lon)
}

/// 80x24 view at zoom 4 whose canvas centre is the centre of tile 4/14/9
pub fn centred_viewport() -> Viewport {
    let c = tile_centre(4, 14, 9);
    Viewport::new(c.lat, c.lon, 4.0, 80, 24)
}

pub fn render_frame(cache: &TileCache, viewport: Viewport) -> (String, tui_tilemap::diagnostics::RenderReport) {
    let mut renderer = Renderer::new(cache, viewport);
    renderer.draw(&BASE_LAYERS);
    renderer.draw(&LABEL_LAYERS);
    (renderer.frame(), renderer.report())
}
