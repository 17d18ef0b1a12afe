use tui_tilemap::braille::{Canvas, Rgb};
use tui_tilemap::diagnostics::RenderReport;
use tui_tilemap::map::{Renderer, Viewport, BASE_LAYERS, LABEL_LAYERS};
use tui_tilemap::{Leg, TileCache};

/// Pan step in braille pixels
const PAN_STEP_X: f64 = 20.0;
const PAN_STEP_Y: f64 = 24.0;

/// Interactive viewer state
pub struct App {
    pub viewport: Viewport,
    pub cache: TileCache,
    pub legs: Vec<Leg>,
    pub should_quit: bool,
    /// Where `reset` returns to
    home: Viewport,
    canvas: Option<Canvas>,
    report: RenderReport,
}

impl App {
    pub fn new(cache: TileCache, home: Viewport, legs: Vec<Leg>) -> Self {
        Self {
            viewport: home.clone(),
            cache,
            legs,
            should_quit: false,
            home,
            canvas: None,
            report: RenderReport::default(),
        }
    }

    /// Map area inside the border and above the status bar
    pub fn resize(&mut self, width: u16, height: u16) {
        let width = (width as usize).saturating_sub(2);
        let height = (height as usize).saturating_sub(3);
        if (width, height) != (self.viewport.width, self.viewport.height) {
            self.viewport.width = width;
            self.viewport.height = height;
            self.home.width = width;
            self.home.height = height;
            self.invalidate();
        }
    }

    fn invalidate(&mut self) {
        self.canvas = None;
    }

    /// Pan by whole steps; positive `dx` moves east, positive `dy` south
    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx as f64 * PAN_STEP_X, dy as f64 * PAN_STEP_Y);
        self.invalidate();
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
        self.invalidate();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
        self.invalidate();
    }

    pub fn reset(&mut self) {
        self.viewport = self.home.clone();
        self.invalidate();
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Render the current view if it changed since the last frame
    pub fn refresh(&mut self) -> &Canvas {
        let canvas = match self.canvas.take() {
            Some(canvas) => canvas,
            None => self.render(),
        };
        self.canvas.insert(canvas)
    }

    fn render(&mut self) -> Canvas {
        let mut renderer = Renderer::new(&self.cache, self.viewport.clone());
        renderer.draw(&BASE_LAYERS);
        for leg in &self.legs {
            renderer.splat_path(&leg.path(), leg.colour());
        }
        renderer.draw(&LABEL_LAYERS);
        self.report = renderer.report();
        tracing::debug!(report = ?self.report, "view rendered");
        renderer.into_canvas()
    }

    pub fn canvas(&self) -> Option<&Canvas> {
        self.canvas.as_ref()
    }

    pub fn report(&self) -> RenderReport {
        self.report
    }

    /// Get current zoom level as a string
    pub fn zoom_level(&self) -> String {
        format!("z{:.1}", self.viewport.zoom)
    }

    /// Get current center coordinates as a string
    pub fn center_coords(&self) -> String {
        let c = self.viewport.center;
        format!(
            "{:.4}°{}, {:.4}°{}",
            c.lat.abs(),
            if c.lat >= 0.0 { "N" } else { "S" },
            c.lon.abs(),
            if c.lon >= 0.0 { "E" } else { "W" }
        )
    }

    /// Tiles shown out of tiles wanted, e.g. `9/9`
    pub fn tile_status(&self) -> (String, Rgb) {
        let text = format!("{}/{}", self.report.tiles_loaded, self.report.tiles_requested);
        let color = if self.report.tiles_dropped > 0 { Rgb::RED } else { Rgb::WHITE };
        (text, color)
    }
}
