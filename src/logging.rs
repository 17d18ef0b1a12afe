//! Logging setup for the binary.
//!
//! Frames are written to stdout, so log output goes to a file when one is
//! given and to stderr otherwise. The level comes from `RUST_LOG`, default `info`.

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Truncates `log_file` if it exists.
pub fn init_logging(log_file: Option<&Path>) -> io::Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter());

    let installed = match log_file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            let file = File::create(path)?;
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false);
            registry.with(layer).try_init()
        }
        None => {
            let layer = tracing_subscriber::fmt::layer().with_writer(io::stderr);
            registry.with(layer).try_init()
        }
    };
    installed.map_err(io::Error::other)
}
