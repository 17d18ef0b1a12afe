//! Vector tiles: fetching, caching, decoding and per-tile spatial indexing.

pub mod cache;
pub mod decode;
pub mod disk;
pub mod source;
pub mod spatial;

use glam::DVec2;
use std::fmt;
use std::sync::Arc;

use crate::braille::{ColorCache, Rgb};
use crate::error::TileError;
use crate::style::{StyleRule, Styler};

pub use cache::{CacheStats, TileCache};
pub use decode::{Feature, GeomKind, Geometry};
pub use disk::DiskCache;
pub use source::{HttpFetcher, TileFetcher};
pub use spatial::SpatialIndex;

/// Tile address (zoom, x, y)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub z: u32,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    pub const fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// File name in the disk cache
    pub fn cache_name(&self) -> String {
        format!("{}-{}-{}", self.z, self.x, self.y)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// A feature that matched a style rule, ready to draw
#[derive(Debug)]
pub struct StyledFeature {
    pub geometry: Geometry,
    pub rule: Arc<StyleRule>,
    pub color: Rgb,
    pub label: Option<String>,
}

/// Decoded, styled and indexed tile. Immutable once built.
pub struct Tile {
    pub key: TileKey,
    /// Tile-local coordinate range; 0 for an empty tile
    pub extent: u32,
    index: SpatialIndex<StyledFeature>,
    dropped_features: usize,
}

impl Tile {
    pub fn empty(key: TileKey) -> Self {
        Self {
            key,
            extent: 0,
            index: SpatialIndex::empty(),
            dropped_features: 0,
        }
    }

    /// Decode raw bytes and keep only features some rule matches
    pub fn load(key: TileKey, raw: &[u8], styler: &Styler, colors: &ColorCache) -> Result<Self, TileError> {
        let layers = decode::decode(raw)?;
        let extent = layers
            .iter()
            .map(|l| l.extent)
            .find(|&e| e > 0)
            .unwrap_or(decode::DEFAULT_EXTENT);

        let mut dropped = 0;
        let mut styled = Vec::new();
        for layer in layers {
            let rescale = (layer.extent != extent && layer.extent > 0)
                .then(|| extent as f64 / layer.extent as f64);

            for feature in layer.features {
                let Some(rule) = styler.style_for(&layer.name, &feature.properties) else {
                    dropped += 1;
                    continue;
                };
                let mut geometry = feature.geometry;
                if let Some(factor) = rescale {
                    geometry.scale(factor);
                }
                let Some((min, max)) = geometry.bounds() else {
                    dropped += 1;
                    continue;
                };
                let label = feature
                    .properties
                    .get("name")
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);

                styled.push((
                    min,
                    max,
                    StyledFeature {
                        geometry,
                        color: colors.resolve(rule.color_hex()),
                        rule: Arc::clone(rule),
                        label,
                    },
                ));
            }
        }

        tracing::trace!(tile = %key, kept = styled.len(), dropped, "tile decoded");
        Ok(Self {
            key,
            extent,
            index: SpatialIndex::build(styled),
            dropped_features: dropped,
        })
    }

    /// Features intersecting a tile-local box, in decode order
    pub fn query(&self, min: DVec2, max: DVec2) -> Vec<&StyledFeature> {
        self.index.query(min, max)
    }

    pub fn features(&self) -> impl Iterator<Item = &StyledFeature> {
        self.index.iter()
    }

    pub fn feature_count(&self) -> usize {
        self.index.len()
    }

    /// Decoded features no style rule matched
    pub fn dropped_features(&self) -> usize {
        self.dropped_features
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::LayerKind;
    use geozero::mvt::{tile, Message, Tile as MvtTile};

    const STYLE: &str = r##"{
        "name": "test",
        "layers": [
            {"id": "water", "type": "fill", "source-layer": "water", "paint": {"fill-color": "#0000ff"}},
            {"id": "roads", "type": "line", "source-layer": "road",
             "filter": ["==", "class", "major"], "paint": {"line-color": "#ff0000"}}
        ]
    }"##;

    fn line_feature(class: u32) -> tile::Feature {
        tile::Feature {
            id: None,
            tags: vec![0, class],
            r#type: Some(2),
            // MoveTo(10, 10) LineTo(+100, +0)
            geometry: vec![9, 20, 20, 10, 200, 0],
        }
    }

    fn sample_bytes() -> Vec<u8> {
        let road = tile::Layer {
            version: 2,
            name: "road".to_string(),
            features: vec![line_feature(0), line_feature(1)],
            keys: vec!["class".to_string()],
            values: vec![
                tile::Value {
                    string_value: Some("major".to_string()),
                    ..Default::default()
                },
                tile::Value {
                    string_value: Some("minor".to_string()),
                    ..Default::default()
                },
            ],
            extent: Some(4096),
        };
        let water = tile::Layer {
            version: 2,
            name: "water".to_string(),
            // square (0,0)-(2048,2048) clockwise in tile space
            features: vec![tile::Feature {
                id: None,
                tags: vec![],
                r#type: Some(3),
                geometry: vec![9, 0, 0, 26, 4096, 0, 0, 4096, 4095, 0, 15],
            }],
            keys: vec![],
            values: vec![],
            extent: Some(2048),
        };
        MvtTile {
            layers: vec![road, water],
        }
        .encode_to_vec()
    }

    #[test]
    fn test_unstyled_features_dropped() {
        let styler = Styler::from_json(STYLE).unwrap();
        let tile = Tile::load(TileKey::new(3, 1, 2), &sample_bytes(), &styler, &ColorCache::new()).unwrap();

        assert_eq!(tile.extent, 4096);
        assert_eq!(tile.feature_count(), 2);
        assert_eq!(tile.dropped_features(), 1);

        let road = tile.features().find(|f| f.rule.kind == LayerKind::Line).unwrap();
        assert_eq!(road.color, Rgb::RED);
        assert_eq!(road.label, None);
    }

    #[test]
    fn test_smaller_extent_layers_rescaled() {
        let styler = Styler::from_json(STYLE).unwrap();
        let tile = Tile::load(TileKey::new(3, 1, 2), &sample_bytes(), &styler, &ColorCache::new()).unwrap();

        let water = tile.features().find(|f| f.rule.id == "water").unwrap();
        let (min, max) = water.geometry.bounds().unwrap();
        assert_eq!(min, DVec2::ZERO);
        assert_eq!(max, DVec2::new(2048.0, 2048.0) * 2.0);
    }

    #[test]
    fn test_query_by_tile_box() {
        let styler = Styler::from_json(STYLE).unwrap();
        let tile = Tile::load(TileKey::new(3, 1, 2), &sample_bytes(), &styler, &ColorCache::new()).unwrap();

        let near_road = tile.query(DVec2::new(50.0, 5.0), DVec2::new(60.0, 15.0));
        assert_eq!(near_road.len(), 2, "road and the water square");
        let far = tile.query(DVec2::new(4097.0, 4097.0), DVec2::new(5000.0, 5000.0));
        assert!(far.is_empty());
    }

    #[test]
    fn test_zero_extent_layer_does_not_blank_tile() {
        let empty = tile::Layer {
            version: 2,
            name: "landuse".to_string(),
            features: vec![],
            keys: vec![],
            values: vec![],
            extent: Some(0),
        };
        let mut layers = MvtTile::decode(sample_bytes().as_slice()).unwrap().layers;
        layers.insert(0, empty);
        let bytes = MvtTile { layers }.encode_to_vec();

        let styler = Styler::from_json(STYLE).unwrap();
        let tile = Tile::load(TileKey::new(3, 1, 2), &bytes, &styler, &ColorCache::new()).unwrap();
        assert_eq!(tile.extent, 4096);

        let water = tile.features().find(|f| f.rule.id == "water").unwrap();
        let (_, max) = water.geometry.bounds().unwrap();
        assert_eq!(max, DVec2::new(4096.0, 4096.0));
    }

    #[test]
    fn test_corrupt_bytes_fail_to_load() {
        let styler = Styler::from_json(STYLE).unwrap();
        let result = Tile::load(TileKey::new(0, 0, 0), b"\x1f\x8bnot gzip", &styler, &ColorCache::new());
        assert!(result.is_err());
        assert!(Tile::empty(TileKey::new(0, 0, 0)).is_empty());
    }

    #[test]
    fn test_key_names() {
        let key = TileKey::new(14, 15066, 9833);
        assert_eq!(key.cache_name(), "14-15066-9833");
        assert_eq!(key.to_string(), "14/15066/9833");
    }
}
