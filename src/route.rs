//! Journey-leg overlays drawn between the base map and its labels.

use crate::braille::Rgb;
use crate::error::RenderError;
use crate::map::projection::{GeoPoint, Viewport};
use crate::map::renderer::{Renderer, BASE_LAYERS, LABEL_LAYERS};
use crate::tile::TileCache;

/// Leg frames never zoom in past this
pub const ROUTE_MAX_ZOOM: f64 = 14.0;

const DEFAULT_LINE_COLOUR: &str = "#ff0000";

/// One leg of a journey. Points come from an external planner and may be missing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Leg {
    pub origin: Option<GeoPoint>,
    pub destination: Option<GeoPoint>,
    /// Intermediate stops in travel order
    pub stops: Vec<GeoPoint>,
    /// Line or mode name, e.g. `T1` or `F4`
    pub line_name: String,
}

impl Leg {
    pub fn new(origin: GeoPoint, destination: GeoPoint, line_name: impl Into<String>) -> Self {
        Self {
            origin: Some(origin),
            destination: Some(destination),
            stops: Vec::new(),
            line_name: line_name.into(),
        }
    }

    pub fn with_stops(mut self, stops: Vec<GeoPoint>) -> Self {
        self.stops = stops;
        self
    }

    /// Origin, stops and destination, skipping what is missing
    pub fn path(&self) -> Vec<GeoPoint> {
        self.origin
            .iter()
            .chain(&self.stops)
            .chain(self.destination.iter())
            .copied()
            .collect()
    }

    pub fn colour(&self) -> Rgb {
        Rgb::from_hex(line_colour(&self.line_name)).unwrap_or(Rgb::RED)
    }
}

/// Hex colour for a Sydney transport line name, red when unknown
pub fn line_colour(name: &str) -> &'static str {
    match name.trim().to_ascii_uppercase().as_str() {
        "M" | "M1" | "METRO" => "#168388",

        "T1" => "#F99D1C",
        "T2" => "#0098CD",
        "T3" => "#F37021",
        "T4" => "#005AA3",
        "T5" => "#C4258F",
        "T7" => "#6F818E",
        "T8" => "#00954C",
        "T9" => "#D11F2F",

        "BMT" => "#F99D1C",
        "CCN" => "#D11F2F",
        "HUN" => "#833134",
        "SCO" => "#005AA3",
        "SHL" => "#00954C",

        "TRAINS" => "#F6891F",
        "COACHES" => "#732A82",

        "F1" => "#00774B",
        "F2" => "#144734",
        "F3" => "#648C3C",
        "F4" => "#BFD730",
        "F5" => "#286142",
        "F6" => "#00AB51",
        "F7" => "#00B189",
        "F8" => "#55622B",
        "F9" => "#65B32E",
        "F10" | "STKTN" => "#5AB031",

        "L1" => "#BE1622",
        "L2" => "#DD1E25",
        "L3" => "#781140",
        "NLR" => "#EE343F",

        _ => DEFAULT_LINE_COLOUR,
    }
}

/// Viewport framing a leg's endpoints, zoom capped at `ROUTE_MAX_ZOOM`
pub fn focus_leg(leg: &Leg, width: usize, height: usize) -> Result<Viewport, RenderError> {
    let (Some(origin), Some(destination)) = (leg.origin, leg.destination) else {
        return Err(RenderError::NoCoordinates);
    };
    let mut viewport = Viewport::focus(origin, destination, width, height);
    viewport.zoom = viewport.zoom.min(ROUTE_MAX_ZOOM);
    Ok(viewport)
}

/// Render the map around leg `index` with every leg overlaid.
///
/// Base layers go down first, then each leg is splatted in its line colour,
/// then labels are drawn on top.
pub fn render_legs(
    cache: &TileCache,
    legs: &[Leg],
    index: usize,
    width: usize,
    height: usize,
) -> Result<String, RenderError> {
    let focus = legs.get(index).ok_or(RenderError::LegOutOfRange {
        index,
        len: legs.len(),
    })?;
    if legs.iter().all(|leg| leg.path().is_empty()) {
        return Err(RenderError::NoCoordinates);
    }
    let viewport = focus_leg(focus, width, height)?;

    let mut renderer = Renderer::new(cache, viewport);
    renderer.draw(&BASE_LAYERS);
    for leg in legs {
        renderer.splat_path(&leg.path(), leg.colour());
    }
    renderer.draw(&LABEL_LAYERS);

    tracing::debug!(leg = index, report = ?renderer.report(), "route rendered");
    Ok(renderer.frame())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_ZOOM;

    const CENTRAL: GeoPoint = GeoPoint::new(-33.8832, 151.2070);
    const PARRAMATTA: GeoPoint = GeoPoint::new(-33.8176, 151.0035);

    #[test]
    fn test_line_colours() {
        assert_eq!(line_colour("T1"), "#F99D1C");
        assert_eq!(line_colour("f10"), "#5AB031");
        assert_eq!(line_colour(" L2 "), "#DD1E25");
        assert_eq!(line_colour("T6"), DEFAULT_LINE_COLOUR);
        assert_eq!(line_colour("walk"), DEFAULT_LINE_COLOUR);
        assert_eq!(Leg::new(CENTRAL, PARRAMATTA, "T1").colour(), Rgb::new(0xf9, 0x9d, 0x1c));
    }

    #[test]
    fn test_path_skips_missing_points() {
        let leg = Leg {
            origin: None,
            destination: Some(PARRAMATTA),
            stops: vec![CENTRAL],
            line_name: "T1".into(),
        };
        assert_eq!(leg.path(), vec![CENTRAL, PARRAMATTA]);
        assert!(Leg::default().path().is_empty());
    }

    #[test]
    fn test_focus_leg_caps_zoom() {
        let short = Leg::new(CENTRAL, CENTRAL, "T1");
        let vp = focus_leg(&short, 80, 24).unwrap();
        assert_eq!(vp.zoom, ROUTE_MAX_ZOOM);
        assert!(ROUTE_MAX_ZOOM < MAX_ZOOM);

        let long = Leg::new(CENTRAL, PARRAMATTA, "T1");
        assert!(focus_leg(&long, 80, 24).unwrap().zoom < ROUTE_MAX_ZOOM);
    }

    #[test]
    fn test_focus_leg_needs_endpoints() {
        let leg = Leg {
            origin: Some(CENTRAL),
            ..Leg::default()
        };
        assert_eq!(focus_leg(&leg, 80, 24), Err(RenderError::NoCoordinates));
    }
}
