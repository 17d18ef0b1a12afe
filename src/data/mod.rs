use anyhow::{Context, Result};
use geojson::{Feature, GeoJson, Geometry, Value};
use std::fs;
use std::path::Path;
use tui_tilemap::{GeoPoint, Leg};

/// Property naming the transport line a route feature belongs to
const LINE_KEYS: [&str; 2] = ["line", "name"];

/// Load every LineString in a GeoJSON file as a journey leg.
///
/// The first and last coordinates become the leg's endpoints and the rest
/// its stops. Each part of a MultiLineString is its own leg. The line name
/// is read from the feature's `line` or `name` property.
pub fn load_route(path: &Path) -> Result<Vec<Leg>> {
    let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let geojson: GeoJson = content
        .parse()
        .with_context(|| format!("parsing {}", path.display()))?;

    let mut legs = Vec::new();
    match &geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                process_feature(feature, &mut legs);
            }
        }
        GeoJson::Feature(f) => process_feature(f, &mut legs),
        GeoJson::Geometry(geometry) => process_geometry(geometry, "", &mut legs),
    }
    Ok(legs)
}

fn process_feature(feature: &Feature, legs: &mut Vec<Leg>) {
    let line_name = LINE_KEYS
        .iter()
        .find_map(|key| feature.property(key).and_then(|v| v.as_str()))
        .unwrap_or_default();

    if let Some(ref geometry) = feature.geometry {
        process_geometry(geometry, line_name, legs);
    }
}

fn process_geometry(geometry: &Geometry, line_name: &str, legs: &mut Vec<Leg>) {
    match &geometry.value {
        Value::LineString(coords) => legs.extend(leg_from_coords(coords, line_name)),
        Value::MultiLineString(lines) => {
            legs.extend(lines.iter().filter_map(|coords| leg_from_coords(coords, line_name)));
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                process_geometry(g, line_name, legs);
            }
        }
        _ => {}
    }
}

/// GeoJSON positions are `[lon, lat]`
fn leg_from_coords(coords: &[Vec<f64>], line_name: &str) -> Option<Leg> {
    let mut points: Vec<GeoPoint> = coords
        .iter()
        .filter(|c| c.len() >= 2)
        .map(|c| GeoPoint::new(c[1], c[0]))
        .collect();

    let destination = points.pop()?;
    if points.is_empty() {
        return None;
    }
    let origin = points.remove(0);
    Some(Leg::new(origin, destination, line_name).with_stops(points))
}
