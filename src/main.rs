mod app;
mod data;
mod ui;

use anyhow::{bail, Context, Result};
use app::App;
use clap::{Args, Parser, Subcommand};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::DefaultTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tui_tilemap::logging::init_logging;
use tui_tilemap::map::{Renderer, Viewport, BASE_LAYERS, LABEL_LAYERS};
use tui_tilemap::route::{focus_leg, Leg};
use tui_tilemap::{GeoPoint, MapConfig, Styler, TileCache};

/// Vector tile maps in the terminal
#[derive(Parser)]
#[command(name = "tui-tilemap", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print one frame to stdout
    Render(RenderArgs),
    /// Browse the map interactively
    View(ViewArgs),
}

#[derive(Args)]
struct SourceArgs {
    /// Tile server base URL; tiles are requested as {url}{z}/{x}/{y}.pbf
    #[arg(long)]
    tile_url: Option<String>,
    /// Style document to use instead of the built-in dark style
    #[arg(long)]
    style: Option<PathBuf>,
    /// Directory for raw tiles
    #[arg(long, conflicts_with = "no_disk_cache")]
    cache_dir: Option<PathBuf>,
    /// Keep tiles in memory only
    #[arg(long)]
    no_disk_cache: bool,
    /// Write logs here instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Args)]
struct ViewArgs {
    #[arg(long, default_value_t = -33.8688, allow_hyphen_values = true)]
    lat: f64,
    #[arg(long, default_value_t = 151.2093, allow_hyphen_values = true)]
    lon: f64,
    #[arg(long, default_value_t = 12.0)]
    zoom: f64,
    /// Line overlays, one leg per GeoJSON LineString
    #[arg(long)]
    route: Option<PathBuf>,
    #[command(flatten)]
    source: SourceArgs,
}

#[derive(Args)]
struct RenderArgs {
    #[command(flatten)]
    view: ViewArgs,
    /// Width in characters
    #[arg(long, default_value_t = 80)]
    width: usize,
    /// Height in characters
    #[arg(long, default_value_t = 24)]
    height: usize,
    /// Frame the view on a line from this point, as LAT,LON
    #[arg(long, value_parser = parse_point, requires = "to", allow_hyphen_values = true)]
    from: Option<GeoPoint>,
    /// ...to this point
    #[arg(long, value_parser = parse_point, requires = "from", allow_hyphen_values = true)]
    to: Option<GeoPoint>,
    /// Line name used to colour the --from/--to line
    #[arg(long, default_value = "")]
    line: String,
}

fn parse_point(s: &str) -> Result<GeoPoint, String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got {s:?}"))?;
    let parse = |v: &str| v.trim().parse::<f64>().map_err(|e| format!("{v:?}: {e}"));
    let point = GeoPoint::new(parse(lat)?, parse(lon)?);
    if !(-90.0..=90.0).contains(&point.lat) || !(-180.0..=180.0).contains(&point.lon) {
        return Err(format!("{s:?} is not a valid coordinate"));
    }
    Ok(point)
}

impl SourceArgs {
    fn config(&self) -> MapConfig {
        let mut config = MapConfig::default().with_style_path(self.style.clone());
        if let Some(url) = &self.tile_url {
            config = config.with_tile_url(url.as_str());
        }
        if self.no_disk_cache {
            config = config.with_cache_dir(None);
        } else if let Some(dir) = &self.cache_dir {
            config = config.with_cache_dir(Some(dir.clone()));
        }
        config
    }

    fn open_cache(&self) -> Result<TileCache> {
        let config = self.config();
        let styler = match &config.style_path {
            Some(path) => Styler::from_path(path).with_context(|| format!("loading style {}", path.display()))?,
            None => Styler::embedded()?,
        };
        info!(
            style = styler.name(),
            rules = styler.rule_count(),
            degraded = styler.diagnostics().len(),
            tiles = %config.tile_url,
            "style loaded"
        );
        Ok(TileCache::new(&config, Arc::new(styler))?)
    }
}

fn load_legs(route: Option<&PathBuf>) -> Result<Vec<Leg>> {
    match route {
        Some(path) => data::load_route(path),
        None => Ok(Vec::new()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Render(args) => render(args),
        Command::View(args) => view(args),
    }
}

fn render(args: RenderArgs) -> Result<()> {
    let source = &args.view.source;
    init_logging(source.log_file.as_deref()).context("installing logger")?;
    if args.width == 0 || args.height == 0 {
        bail!("--width and --height must be positive");
    }

    let cache = source.open_cache()?;
    let mut legs = load_legs(args.view.route.as_ref())?;

    let viewport = match (args.from, args.to) {
        (Some(from), Some(to)) => {
            let leg = Leg::new(from, to, args.line.as_str());
            let viewport = focus_leg(&leg, args.width, args.height)?;
            legs.insert(0, leg);
            viewport
        }
        _ => Viewport::new(args.view.lat, args.view.lon, args.view.zoom, args.width, args.height),
    };

    let mut renderer = Renderer::new(&cache, viewport);
    renderer.draw(&BASE_LAYERS);
    for leg in &legs {
        renderer.splat_path(&leg.path(), leg.colour());
    }
    renderer.draw(&LABEL_LAYERS);

    info!(report = ?renderer.report(), stats = ?cache.stats(), "frame rendered");
    println!("{}", renderer.frame());
    Ok(())
}

fn view(args: ViewArgs) -> Result<()> {
    // the terminal owns stderr while the viewer runs
    let log_file = args
        .source
        .log_file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("tui-tilemap.log"));
    init_logging(Some(&log_file)).context("installing logger")?;

    let cache = args.source.open_cache()?;
    let legs = load_legs(args.route.as_ref())?;

    // Initialize terminal
    let mut terminal = ratatui::init();
    let result = terminal
        .size()
        .map_err(anyhow::Error::from)
        .and_then(|size| {
            let home = Viewport::new(args.lat, args.lon, args.zoom, 0, 0);
            let mut app = App::new(cache, home, legs);
            app.resize(size.width, size.height);
            run(&mut terminal, &mut app)
        });

    ratatui::restore();
    result
}

fn run(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),

                    // Pan with hjkl or arrow keys
                    KeyCode::Left | KeyCode::Char('h') => app.pan(-1, 0),
                    KeyCode::Right | KeyCode::Char('l') => app.pan(1, 0),
                    KeyCode::Up | KeyCode::Char('k') => app.pan(0, -1),
                    KeyCode::Down | KeyCode::Char('j') => app.pan(0, 1),

                    // Zoom
                    KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
                    KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

                    KeyCode::Char('r') | KeyCode::Char('0') => app.reset(),

                    _ => {}
                },
                Event::Resize(width, height) => app.resize(width, height),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
