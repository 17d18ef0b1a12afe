use glam::DVec2;
use std::f64::consts::PI;

use crate::config::{MAX_LATITUDE, MAX_ZOOM, MIN_ZOOM, PROJECT_SIZE, TILE_RANGE};

/// Braille pixels per character cell
pub const PIXELS_PER_CHAR_X: usize = 2;
pub const PIXELS_PER_CHAR_Y: usize = 4;

/// Fraction of the view a framed bounding box may occupy
const FOCUS_PADDING: f64 = 0.8;

/// A WGS84 coordinate in degrees
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Clamp latitude to the Web Mercator limit
#[inline]
pub fn clamp_lat(lat: f64) -> f64 {
    lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
}

/// Normalized Mercator y (0 at the north limit, 1 at the south limit)
#[inline]
fn mercator_y(lat: f64) -> f64 {
    let rad = clamp_lat(lat).to_radians();
    (1.0 - rad.tan().asinh() / PI) / 2.0
}

/// Fractional tile coordinates of a point at an integer zoom
pub fn ll2tile(lon: f64, lat: f64, zoom: u32) -> DVec2 {
    let n = 2f64.powi(zoom as i32);
    DVec2::new((lon + 180.0) / 360.0 * n, mercator_y(lat) * n)
}

/// Integer zoom the tile grid is fetched at for a fractional view zoom
#[inline]
pub fn base_zoom(zoom: f64) -> u32 {
    (zoom.max(0.0).floor() as u32).min(TILE_RANGE)
}

/// On-screen pixel size of one `base_zoom` tile at a fractional zoom
#[inline]
pub fn tilesize_at_zoom(zoom: f64) -> f64 {
    PROJECT_SIZE * 2f64.powf(zoom - base_zoom(zoom) as f64)
}

/// Project a coordinate to canvas pixels for a view centred on `center`.
///
/// Tile coordinates are taken at `floor(zoom)` and scaled by
/// `256 * 2^(zoom - floor(zoom))`, so fractional zooms stay smooth.
pub fn geo_to_pixel(point: GeoPoint, center: GeoPoint, zoom: f64, width: usize, height: usize) -> DVec2 {
    let z = zoom.max(0.0).floor();
    let effective = PROJECT_SIZE * 2f64.powf(zoom - z);
    let p = ll2tile(point.lon, point.lat, z as u32);
    let c = ll2tile(center.lon, center.lat, z as u32);
    DVec2::new(width as f64 / 2.0, height as f64 / 2.0) + (p - c) * effective
}

/// Centre and zoom that fit two points in a view of `width` x `height` characters.
///
/// The bounding box takes 80% of the view. Spans over 180° of longitude wrap
/// across the antimeridian. Near-identical points return `MAX_ZOOM` centred on
/// the first point.
pub fn focus_on(a: GeoPoint, b: GeoPoint, width: usize, height: usize) -> (f64, f64, f64) {
    if (a.lat - b.lat).abs() < 1e-6 && (a.lon - b.lon).abs() < 1e-6 {
        return (a.lat, a.lon, MAX_ZOOM);
    }

    let view_w = (width * PIXELS_PER_CHAR_X) as f64 * FOCUS_PADDING;
    let view_h = (height * PIXELS_PER_CHAR_Y) as f64 * FOCUS_PADDING;

    let (min_lat, max_lat) = (a.lat.min(b.lat), a.lat.max(b.lat));
    let center_lat = (min_lat + max_lat) / 2.0;
    let lat_span = (mercator_y(max_lat) - mercator_y(min_lat)).abs();

    let (min_lon, max_lon) = (a.lon.min(b.lon), a.lon.max(b.lon));
    let (lon_span, center_lon) = if max_lon - min_lon > 180.0 {
        let mut center = (max_lon + min_lon + 360.0) / 2.0;
        if center > 180.0 {
            center -= 360.0;
        }
        (360.0 - (max_lon - min_lon), center)
    } else {
        (max_lon - min_lon, (a.lon + b.lon) / 2.0)
    };

    let for_lon = (lon_span > 0.0).then(|| view_w * 360.0 / lon_span);
    let for_lat = (lat_span > 0.0).then(|| view_h / lat_span);
    let world_size = match (for_lon, for_lat) {
        (Some(x), Some(y)) => x.min(y),
        (Some(x), None) => x,
        (None, Some(y)) => y,
        (None, None) => return (center_lat, center_lon, MAX_ZOOM),
    };

    let zoom = (world_size / PROJECT_SIZE).log2().clamp(MIN_ZOOM, MAX_ZOOM);
    (center_lat, center_lon, zoom)
}

/// Visible map area: centre, fractional zoom and size in character cells.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    pub center: GeoPoint,
    pub zoom: f64,
    /// Width in characters
    pub width: usize,
    /// Height in characters
    pub height: usize,
}

impl Viewport {
    pub fn new(lat: f64, lon: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center: GeoPoint::new(clamp_lat(lat), wrap_lon(lon)),
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            width,
            height,
        }
    }

    /// Whole-world view
    pub fn world(width: usize, height: usize) -> Self {
        Self::new(20.0, 0.0, MIN_ZOOM, width, height)
    }

    /// Viewport framing two points
    pub fn focus(a: GeoPoint, b: GeoPoint, width: usize, height: usize) -> Self {
        let (lat, lon, zoom) = focus_on(a, b, width, height);
        Self::new(lat, lon, zoom, width, height)
    }

    pub fn pixel_width(&self) -> usize {
        self.width * PIXELS_PER_CHAR_X
    }

    pub fn pixel_height(&self) -> usize {
        self.height * PIXELS_PER_CHAR_Y
    }

    /// Project a coordinate to canvas pixels
    pub fn project(&self, point: GeoPoint) -> DVec2 {
        geo_to_pixel(point, self.center, self.zoom, self.pixel_width(), self.pixel_height())
    }

    /// Inverse of `project`
    pub fn unproject(&self, px: DVec2) -> GeoPoint {
        let world = PROJECT_SIZE * 2f64.powf(self.zoom);
        let c = DVec2::new((self.center.lon + 180.0) / 360.0, mercator_y(self.center.lat));
        let half = DVec2::new(self.pixel_width() as f64, self.pixel_height() as f64) / 2.0;
        let n = c + (px - half) / world;

        let lon = n.x * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * n.y)).sinh().atan().to_degrees();
        GeoPoint::new(lat, lon)
    }

    /// Pan by a pixel delta
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let half = DVec2::new(self.pixel_width() as f64, self.pixel_height() as f64) / 2.0;
        let target = self.unproject(half + DVec2::new(dx, dy));
        self.center = GeoPoint::new(clamp_lat(target.lat), wrap_lon(target.lon));
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom + 0.5).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom - 0.5).max(MIN_ZOOM);
    }
}

/// Wrap longitude into [-180, 180)
fn wrap_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center() {
        let vp = Viewport::new(0.0, 0.0, 3.0, 50, 25);
        let p = vp.project(vp.center);
        assert_eq!(p, DVec2::new(50.0, 50.0));
    }

    #[test]
    fn test_ll2tile_origin() {
        let t = ll2tile(0.0, 0.0, 1);
        assert!((t.x - 1.0).abs() < 1e-9);
        assert!((t.y - 1.0).abs() < 1e-9);
        let t = ll2tile(-180.0, MAX_LATITUDE, 3);
        assert!(t.x.abs() < 1e-9);
        assert!(t.y.abs() < 1e-6);
    }

    #[test]
    fn test_latitude_clamped_before_projecting() {
        let center = GeoPoint::new(0.0, 0.0);
        let pole = geo_to_pixel(GeoPoint::new(90.0, 0.0), center, 2.0, 100, 100);
        let limit = geo_to_pixel(GeoPoint::new(MAX_LATITUDE, 0.0), center, 2.0, 100, 100);
        assert!(pole.is_finite());
        assert_eq!(pole, limit);
    }

    #[test]
    fn test_fractional_zoom_scales_offsets() {
        let center = GeoPoint::new(0.0, 0.0);
        let east = GeoPoint::new(0.0, 10.0);
        let at_4 = geo_to_pixel(east, center, 4.0, 0, 0);
        let at_5 = geo_to_pixel(east, center, 5.0, 0, 0);
        let at_4_5 = geo_to_pixel(east, center, 4.5, 0, 0);
        assert!((at_5.x - 2.0 * at_4.x).abs() < 1e-9);
        assert!((at_4_5.x - at_4.x * 2f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_base_zoom_capped_at_tile_range() {
        assert_eq!(base_zoom(3.7), 3);
        assert_eq!(base_zoom(17.2), TILE_RANGE);
        assert!((tilesize_at_zoom(3.0) - PROJECT_SIZE).abs() < 1e-9);
        assert!((tilesize_at_zoom(TILE_RANGE as f64 + 1.0) - 2.0 * PROJECT_SIZE).abs() < 1e-9);
    }

    #[test]
    fn test_focus_on_identical_points() {
        let p = GeoPoint::new(-33.87, 151.21);
        assert_eq!(focus_on(p, p, 80, 24), (-33.87, 151.21, MAX_ZOOM));

        let nudged = GeoPoint::new(-33.87 + 1e-8, 151.21 - 1e-8);
        assert_eq!(focus_on(p, nudged, 80, 24), (-33.87, 151.21, MAX_ZOOM));
    }

    #[test]
    fn test_focus_on_antimeridian_takes_short_way() {
        let (_, lon, zoom) = focus_on(GeoPoint::new(0.0, 179.9), GeoPoint::new(0.0, -179.9), 80, 24);
        assert!(lon.abs() > 179.0, "centre {} should sit on the antimeridian", lon);

        // a 0.2° span frames the same as any other 0.2° span
        let (_, _, reference) = focus_on(GeoPoint::new(0.0, 0.1), GeoPoint::new(0.0, -0.1), 80, 24);
        assert!((zoom - reference).abs() < 1e-9);
        assert!(zoom > 8.0);
    }

    #[test]
    fn test_focus_on_fits_both_points() {
        let a = GeoPoint::new(-33.8688, 151.2093);
        let b = GeoPoint::new(-33.7, 150.9);
        let vp = Viewport::focus(a, b, 80, 24);
        for p in [a, b] {
            let px = vp.project(p);
            assert!(px.x >= 0.0 && px.x <= vp.pixel_width() as f64);
            assert!(px.y >= 0.0 && px.y <= vp.pixel_height() as f64);
        }
    }

    #[test]
    fn test_focus_on_clamps_zoom() {
        let (_, _, zoom) = focus_on(GeoPoint::new(-80.0, -170.0), GeoPoint::new(80.0, 10.0), 10, 5);
        assert_eq!(zoom, MIN_ZOOM);
    }

    #[test]
    fn test_unproject_inverts_project() {
        let vp = Viewport::new(-33.87, 151.21, 12.3, 80, 24);
        let p = GeoPoint::new(-33.85, 151.25);
        let back = vp.unproject(vp.project(p));
        assert!((back.lat - p.lat).abs() < 1e-9);
        assert!((back.lon - p.lon).abs() < 1e-9);
    }

    #[test]
    fn test_pan() {
        let mut vp = Viewport::new(0.0, 179.0, 3.0, 100, 50);
        vp.pan(40.0, 0.0);
        assert!(vp.center.lon < 0.0, "pan east across the antimeridian wraps");
        vp.pan(0.0, -1e9);
        assert_eq!(vp.center.lat, MAX_LATITUDE);
    }
}
