//! Vector tile wire decoding: gzip sniffing, protobuf layers and the
//! MoveTo/LineTo/ClosePath geometry command stream.

use flate2::read::GzDecoder;
use geozero::mvt::{tile, Message, Tile as MvtTile};
use glam::DVec2;
use std::borrow::Cow;
use std::io::Read;

use crate::error::TileError;
use crate::map::geometry::bounds;
use crate::style::{Properties, PropertyValue};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Extent assumed when a layer leaves it unset
pub const DEFAULT_EXTENT: u32 = 4096;

const CMD_MOVE_TO: u32 = 1;
const CMD_LINE_TO: u32 = 2;
const CMD_CLOSE_PATH: u32 = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeomKind {
    Point,
    LineString,
    Polygon,
}

impl GeomKind {
    fn from_wire(value: i32) -> Option<Self> {
        match value {
            1 => Some(GeomKind::Point),
            2 => Some(GeomKind::LineString),
            3 => Some(GeomKind::Polygon),
            _ => None,
        }
    }

    /// Value injected as `$type` for filters
    pub fn type_name(self) -> &'static str {
        match self {
            GeomKind::Point => "Point",
            GeomKind::LineString => "LineString",
            GeomKind::Polygon => "Polygon",
        }
    }
}

/// Decoded geometry in tile-local pixels (0..extent).
/// Multi-geometries keep every part.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Points(Vec<DVec2>),
    Lines(Vec<Vec<DVec2>>),
    /// Each polygon is an outer ring followed by its holes
    Polygons(Vec<Vec<Vec<DVec2>>>),
}

impl Geometry {
    pub fn kind(&self) -> GeomKind {
        match self {
            Geometry::Points(_) => GeomKind::Point,
            Geometry::Lines(_) => GeomKind::LineString,
            Geometry::Polygons(_) => GeomKind::Polygon,
        }
    }

    fn points(&self) -> Box<dyn Iterator<Item = &DVec2> + '_> {
        match self {
            Geometry::Points(points) => Box::new(points.iter()),
            Geometry::Lines(lines) => Box::new(lines.iter().flatten()),
            Geometry::Polygons(polygons) => Box::new(polygons.iter().flatten().flatten()),
        }
    }

    pub fn bounds(&self) -> Option<(DVec2, DVec2)> {
        bounds(self.points())
    }

    pub fn scale(&mut self, factor: f64) {
        let scale_all = |points: &mut Vec<DVec2>| points.iter_mut().for_each(|p| *p *= factor);
        match self {
            Geometry::Points(points) => scale_all(points),
            Geometry::Lines(lines) => lines.iter_mut().for_each(scale_all),
            Geometry::Polygons(polygons) => polygons.iter_mut().flatten().for_each(scale_all),
        }
    }
}

/// One decoded feature with its properties (including `$type`)
#[derive(Clone, Debug)]
pub struct Feature {
    pub geometry: Geometry,
    pub properties: Properties,
}

#[derive(Clone, Debug)]
pub struct Layer {
    pub name: String,
    pub extent: u32,
    pub features: Vec<Feature>,
}

/// Gunzip when the bytes carry the gzip magic, otherwise pass them through
pub fn decompress(raw: &[u8]) -> Result<Cow<'_, [u8]>, TileError> {
    if !raw.starts_with(&GZIP_MAGIC) {
        return Ok(Cow::Borrowed(raw));
    }
    let mut out = Vec::with_capacity(raw.len() * 4);
    GzDecoder::new(raw)
        .read_to_end(&mut out)
        .map_err(TileError::Decompress)?;
    Ok(Cow::Owned(out))
}

/// Decode raw tile bytes into layers of features.
///
/// Features of unknown geometry type or with an empty command stream are
/// skipped; a malformed command stream fails the whole tile.
pub fn decode(raw: &[u8]) -> Result<Vec<Layer>, TileError> {
    let bytes = decompress(raw)?;
    let tile = MvtTile::decode(&*bytes).map_err(|e| TileError::Decode(e.to_string()))?;

    tile.layers.iter().map(decode_layer).collect()
}

fn decode_layer(layer: &tile::Layer) -> Result<Layer, TileError> {
    let values: Vec<PropertyValue> = layer.values.iter().map(property_value).collect();
    let mut features = Vec::with_capacity(layer.features.len());

    for feature in &layer.features {
        let Some(kind) = feature.r#type.and_then(GeomKind::from_wire) else {
            continue;
        };
        let Some(geometry) = decode_geometry(kind, &feature.geometry)? else {
            continue;
        };

        let mut properties = Properties::with_capacity(feature.tags.len() / 2 + 1);
        for pair in feature.tags.chunks_exact(2) {
            let key = layer.keys.get(pair[0] as usize);
            let value = values.get(pair[1] as usize);
            if let (Some(key), Some(value)) = (key, value) {
                properties.insert(key.clone(), value.clone());
            }
        }
        properties.insert(crate::style::TYPE_KEY.to_string(), kind.type_name().into());

        features.push(Feature {
            geometry,
            properties,
        });
    }

    Ok(Layer {
        name: layer.name.clone(),
        extent: layer.extent.unwrap_or(DEFAULT_EXTENT),
        features,
    })
}

fn property_value(value: &tile::Value) -> PropertyValue {
    if let Some(s) = &value.string_value {
        PropertyValue::String(s.clone())
    } else if let Some(f) = value.float_value {
        PropertyValue::Number(f as f64)
    } else if let Some(d) = value.double_value {
        PropertyValue::Number(d)
    } else if let Some(i) = value.int_value {
        PropertyValue::Number(i as f64)
    } else if let Some(u) = value.uint_value {
        PropertyValue::Number(u as f64)
    } else if let Some(s) = value.sint_value {
        PropertyValue::Number(s as f64)
    } else if let Some(b) = value.bool_value {
        PropertyValue::Bool(b)
    } else {
        PropertyValue::Null
    }
}

#[inline]
fn zigzag(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

/// Run the command stream into paths. A ClosePath ends the current path.
fn decode_paths(commands: &[u32]) -> Result<Vec<Vec<DVec2>>, TileError> {
    let malformed = |msg: &str| TileError::Decode(format!("geometry command stream: {}", msg));

    let mut paths: Vec<Vec<DVec2>> = Vec::new();
    let mut cursor = (0i32, 0i32);
    let mut words = commands.iter().copied();

    while let Some(header) = words.next() {
        let (id, count) = (header & 0x7, header >> 3);
        match id {
            CMD_MOVE_TO | CMD_LINE_TO => {
                for _ in 0..count {
                    let (Some(dx), Some(dy)) = (words.next(), words.next()) else {
                        return Err(malformed("truncated parameters"));
                    };
                    cursor.0 = cursor.0.wrapping_add(zigzag(dx));
                    cursor.1 = cursor.1.wrapping_add(zigzag(dy));
                    let point = DVec2::new(cursor.0 as f64, cursor.1 as f64);

                    if id == CMD_MOVE_TO {
                        // multi-point features carry one MoveTo parameter per point
                        paths.push(vec![point]);
                    } else {
                        match paths.last_mut() {
                            Some(path) => path.push(point),
                            None => return Err(malformed("LineTo before MoveTo")),
                        }
                    }
                }
            }
            CMD_CLOSE_PATH => {
                if paths.is_empty() {
                    return Err(malformed("ClosePath before MoveTo"));
                }
            }
            other => return Err(malformed(&format!("unknown command {}", other))),
        }
    }
    Ok(paths)
}

/// Shoelace area; the sign gives the winding
fn signed_area(ring: &[DVec2]) -> f64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (a, b) = (ring[i], ring[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        / 2.0
}

/// Group rings into polygons: a ring winding like the first ring starts a
/// new polygon, any other ring is a hole of the current one.
fn classify_rings(rings: Vec<Vec<DVec2>>) -> Vec<Vec<Vec<DVec2>>> {
    let mut polygons: Vec<Vec<Vec<DVec2>>> = Vec::new();
    let mut outer_sign = 0.0;

    for ring in rings {
        let area = signed_area(&ring);
        if area == 0.0 || ring.len() < 3 {
            continue;
        }
        if outer_sign == 0.0 {
            outer_sign = area.signum();
        }
        if area.signum() == outer_sign || polygons.is_empty() {
            polygons.push(vec![ring]);
        } else if let Some(polygon) = polygons.last_mut() {
            polygon.push(ring);
        }
    }
    polygons
}

fn decode_geometry(kind: GeomKind, commands: &[u32]) -> Result<Option<Geometry>, TileError> {
    let paths = decode_paths(commands)?;
    let geometry = match kind {
        GeomKind::Point => Geometry::Points(paths.into_iter().flatten().collect()),
        GeomKind::LineString => {
            Geometry::Lines(paths.into_iter().filter(|p| p.len() >= 2).collect())
        }
        GeomKind::Polygon => Geometry::Polygons(classify_rings(paths)),
    };

    let empty = match &geometry {
        Geometry::Points(p) => p.is_empty(),
        Geometry::Lines(l) => l.is_empty(),
        Geometry::Polygons(p) => p.is_empty(),
    };
    Ok((!empty).then_some(geometry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn command(id: u32, count: u32) -> u32 {
        (count << 3) | id
    }

    fn zz(n: i32) -> u32 {
        ((n << 1) ^ (n >> 31)) as u32
    }

    /// Encode a closed ring from absolute points, tracking the cursor
    fn ring(cursor: &mut (i32, i32), points: &[(i32, i32)]) -> Vec<u32> {
        let mut out = Vec::new();
        for (i, &(x, y)) in points.iter().enumerate() {
            match i {
                0 => out.push(command(CMD_MOVE_TO, 1)),
                1 => out.push(command(CMD_LINE_TO, points.len() as u32 - 1)),
                _ => {}
            }
            out.extend([zz(x - cursor.0), zz(y - cursor.1)]);
            *cursor = (x, y);
        }
        out.push(command(CMD_CLOSE_PATH, 1));
        out
    }

    #[test]
    fn test_zigzag() {
        for n in [0, 1, -1, 2, -2, 2047, -2048] {
            assert_eq!(zigzag(zz(n)), n);
        }
    }

    #[test]
    fn test_decode_linestring() {
        let commands = [command(CMD_MOVE_TO, 1), zz(2), zz(2), command(CMD_LINE_TO, 2), zz(0), zz(8), zz(8), zz(0)];
        let geometry = decode_geometry(GeomKind::LineString, &commands).unwrap().unwrap();
        assert_eq!(
            geometry,
            Geometry::Lines(vec![vec![
                DVec2::new(2.0, 2.0),
                DVec2::new(2.0, 10.0),
                DVec2::new(10.0, 10.0)
            ]])
        );
    }

    #[test]
    fn test_decode_multipoint() {
        let commands = [command(CMD_MOVE_TO, 2), zz(5), zz(7), zz(3), zz(2)];
        let geometry = decode_geometry(GeomKind::Point, &commands).unwrap().unwrap();
        assert_eq!(geometry, Geometry::Points(vec![DVec2::new(5.0, 7.0), DVec2::new(8.0, 9.0)]));
    }

    #[test]
    fn test_polygon_holes_follow_winding() {
        let mut cursor = (0, 0);
        let mut commands = ring(&mut cursor, &[(0, 0), (10, 0), (10, 10), (0, 10)]);
        // reversed winding: a hole
        commands.extend(ring(&mut cursor, &[(3, 3), (3, 7), (7, 7), (7, 3)]));
        // same winding as the first ring: a new polygon
        commands.extend(ring(&mut cursor, &[(20, 0), (25, 0), (25, 5), (20, 5)]));

        let Some(Geometry::Polygons(polygons)) = decode_geometry(GeomKind::Polygon, &commands).unwrap() else {
            panic!("expected polygons");
        };
        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[0].len(), 2, "outer ring plus one hole");
        assert_eq!(polygons[1].len(), 1);
        assert_eq!(polygons[0][1][0], DVec2::new(3.0, 3.0));
    }

    #[test]
    fn test_truncated_stream_is_error() {
        let commands = [command(CMD_MOVE_TO, 1), zz(1)];
        assert!(matches!(decode_paths(&commands), Err(TileError::Decode(_))));
        assert!(decode_paths(&[command(CMD_LINE_TO, 1), 2, 2]).is_err());
        assert!(decode_paths(&[command(4, 1)]).is_err());
    }

    #[test]
    fn test_decompress_passthrough_and_gzip() {
        let plain = decompress(b"plain").unwrap();
        assert!(matches!(plain, Cow::Borrowed(_)));
        assert_eq!(&*plain, b"plain");

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"zipped tile").unwrap();
        let gz = encoder.finish().unwrap();
        assert_eq!(&*decompress(&gz).unwrap(), b"zipped tile");
    }

    #[test]
    fn test_corrupt_gzip_is_error() {
        let corrupt = [0x1f, 0x8b, 0x08, 0x00, 0xde, 0xad];
        assert!(matches!(decompress(&corrupt), Err(TileError::Decompress(_))));
        assert!(decode(&corrupt).is_err());
    }

    #[test]
    fn test_decode_tile_properties() {
        let layer = tile::Layer {
            version: 2,
            name: "poi_label".to_string(),
            features: vec![tile::Feature {
                id: Some(1),
                tags: vec![0, 0, 1, 1],
                r#type: Some(1),
                geometry: vec![command(CMD_MOVE_TO, 1), zz(100), zz(200)],
            }],
            keys: vec!["name".to_string(), "rank".to_string()],
            values: vec![
                tile::Value {
                    string_value: Some("Museum".to_string()),
                    ..Default::default()
                },
                tile::Value {
                    int_value: Some(3),
                    ..Default::default()
                },
            ],
            extent: Some(4096),
        };
        let bytes = MvtTile { layers: vec![layer] }.encode_to_vec();

        let layers = decode(&bytes).unwrap();
        assert_eq!(layers.len(), 1);
        let feature = &layers[0].features[0];
        assert_eq!(feature.properties.get("name"), Some(&PropertyValue::from("Museum")));
        assert_eq!(feature.properties.get("rank"), Some(&PropertyValue::Number(3.0)));
        assert_eq!(feature.properties.get("$type"), Some(&PropertyValue::from("Point")));
        assert_eq!(feature.geometry, Geometry::Points(vec![DVec2::new(100.0, 200.0)]));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        assert!(decode(&[0xff, 0xff, 0xff, 0xff, 0x0f]).is_err());
    }
}
