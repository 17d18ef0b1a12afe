use glam::DVec2;
use rayon::prelude::*;
use std::sync::Arc;

use crate::braille::{Canvas, LabelBuffer, Rgb};
use crate::config::{POI_MARKER, SIMPLIFY_TOLERANCE};
use crate::diagnostics::RenderReport;
use crate::map::geometry::simplify;
use crate::map::projection::{base_zoom, ll2tile, tilesize_at_zoom, GeoPoint, Viewport};
use crate::style::LayerKind;
use crate::tile::{Geometry, StyledFeature, Tile, TileCache, TileKey};

/// Layers drawn beneath overlays
pub const BASE_LAYERS: [&str; 5] = ["landuse", "water", "building", "road", "admin"];

/// Layers drawn on top of overlays
pub const LABEL_LAYERS: [&str; 2] = ["place_label", "poi_label"];

/// A loaded tile and the canvas pixel its top-left corner lands on
struct PlacedTile {
    tile: Arc<Tile>,
    position: DVec2,
}

/// Tiles around the viewport centre with their canvas positions.
///
/// Returns the 3x3 neighbourhood at `base_zoom`. Columns wrap around the
/// antimeridian; rows beyond the poles are left out.
pub fn visible_tiles(viewport: &Viewport) -> Vec<(TileKey, DVec2)> {
    let z = base_zoom(viewport.zoom);
    let tile_size = tilesize_at_zoom(viewport.zoom);
    let grid = 1i64 << z;
    let center = ll2tile(viewport.center.lon, viewport.center.lat, z);
    let half_canvas = DVec2::new(viewport.pixel_width() as f64, viewport.pixel_height() as f64) / 2.0;

    let (cx, cy) = (center.x.floor() as i64, center.y.floor() as i64);
    let mut tiles = Vec::with_capacity(9);
    for ty in cy - 1..=cy + 1 {
        if ty < 0 || ty >= grid {
            continue;
        }
        for tx in cx - 1..=cx + 1 {
            let position = half_canvas - (center - DVec2::new(tx as f64, ty as f64)) * tile_size;
            let key = TileKey::new(z, tx.rem_euclid(grid) as u32, ty as u32);
            tiles.push((key, position));
        }
    }
    tiles
}

/// One render pass: fetched tiles, the canvas they are drawn onto and the
/// labels placed so far. `draw` may be called repeatedly with overlays
/// splatted in between.
pub struct Renderer {
    viewport: Viewport,
    tile_size: f64,
    tiles: Vec<PlacedTile>,
    canvas: Canvas,
    labels: LabelBuffer,
    report: RenderReport,
}

impl Renderer {
    /// Fetch the visible tiles concurrently. Tiles that fail to fetch are
    /// left out of the frame and counted in the report.
    pub fn new(cache: &TileCache, viewport: Viewport) -> Self {
        let wanted = visible_tiles(&viewport);

        let tiles: Vec<PlacedTile> = wanted
            .par_iter()
            .filter_map(|&(key, position)| {
                cache
                    .try_get_tile(key)
                    .ok()
                    .map(|tile| PlacedTile { tile, position })
            })
            .collect();

        let report = RenderReport {
            tiles_requested: wanted.len(),
            tiles_loaded: tiles.len(),
            tiles_dropped: wanted.len() - tiles.len(),
            features_unstyled: tiles.iter().map(|t| t.tile.dropped_features()).sum(),
            ..RenderReport::default()
        };
        if report.tiles_dropped > 0 {
            tracing::debug!(dropped = report.tiles_dropped, "rendering without some tiles");
        }

        Self {
            tile_size: tilesize_at_zoom(viewport.zoom),
            canvas: Canvas::new(viewport.pixel_width(), viewport.pixel_height()),
            viewport,
            tiles,
            labels: LabelBuffer::new(),
            report,
        }
    }

    /// Draw the named source layers, in order, from every loaded tile
    pub fn draw(&mut self, layers: &[&str]) {
        let canvas_size = DVec2::new(self.canvas.width() as f64, self.canvas.height() as f64);
        let zoom = self.viewport.zoom;

        for layer in layers {
            for placed in &self.tiles {
                let tile = &placed.tile;
                if tile.extent == 0 {
                    continue;
                }
                let scale = tile.extent as f64 / self.tile_size;
                let min = -placed.position * scale;
                let max = (canvas_size - placed.position) * scale;

                for feature in tile.query(min, max) {
                    if feature.rule.source_layer != *layer || !feature.rule.visible_at(zoom) {
                        continue;
                    }
                    let mut pass = Pass {
                        canvas: &mut self.canvas,
                        labels: &mut self.labels,
                        report: &mut self.report,
                        origin: placed.position,
                        scale,
                    };
                    pass.draw_feature(feature);
                }
            }
        }
    }

    /// Overlay a straight line between two coordinates
    pub fn splat_line_geo(&mut self, origin: GeoPoint, dest: GeoPoint, color: Rgb) {
        self.canvas
            .splat_line_geo(origin, dest, self.viewport.center, self.viewport.zoom, color);
    }

    /// Overlay consecutive segments through `points`
    pub fn splat_path(&mut self, points: &[GeoPoint], color: Rgb) {
        for pair in points.windows(2) {
            self.splat_line_geo(pair[0], pair[1], color);
        }
    }

    pub fn frame(&self) -> String {
        self.canvas.frame()
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    pub fn into_canvas(self) -> Canvas {
        self.canvas
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn report(&self) -> RenderReport {
        self.report
    }
}

/// Borrowed drawing state for one tile during `Renderer::draw`
struct Pass<'a> {
    canvas: &'a mut Canvas,
    labels: &'a mut LabelBuffer,
    report: &'a mut RenderReport,
    origin: DVec2,
    scale: f64,
}

impl Pass<'_> {
    #[inline]
    fn to_canvas(&self, p: DVec2) -> DVec2 {
        self.origin + p / self.scale
    }

    fn path(&self, points: &[DVec2]) -> Vec<DVec2> {
        points.iter().map(|&p| self.to_canvas(p)).collect()
    }

    fn draw_feature(&mut self, feature: &StyledFeature) {
        let color = feature.color;
        match (&feature.rule.kind, &feature.geometry) {
            (LayerKind::Fill, Geometry::Polygons(polygons)) => {
                for polygon in polygons {
                    let rings: Vec<Vec<DVec2>> = polygon.iter().map(|r| self.path(r)).collect();
                    self.canvas.polygon(&rings, color);
                }
            }
            (LayerKind::Line, Geometry::Lines(lines)) => {
                for line in lines {
                    let points = simplify(&self.path(line), SIMPLIFY_TOLERANCE);
                    self.canvas.polyline(&points, color);
                }
            }
            (LayerKind::Line, Geometry::Polygons(polygons)) => {
                for ring in polygons.iter().flatten() {
                    let mut points = self.path(ring);
                    if let Some(&first) = points.first() {
                        points.push(first);
                    }
                    self.canvas.polyline(&simplify(&points, SIMPLIFY_TOLERANCE), color);
                }
            }
            (LayerKind::Symbol, Geometry::Points(points)) => {
                let text = feature.label.as_deref().unwrap_or(POI_MARKER);
                let mut placed = false;
                for &p in points {
                    let at = self.to_canvas(p);
                    let (col, row) = ((at.x / 2.0) as i32, (at.y / 4.0) as i32);
                    if self.labels.write_if_possible(text, col, row) {
                        self.canvas.text(text, at.x as i32, at.y as i32, color);
                        self.report.labels_placed += 1;
                        placed = true;
                    } else {
                        self.report.labels_suppressed += 1;
                    }
                }
                if !placed {
                    return;
                }
            }
            _ => return,
        }
        self.report.features_drawn += 1;
    }
}
