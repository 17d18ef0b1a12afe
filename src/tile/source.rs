//! Network source for raw vector tile bytes.

use tracing::{debug, trace, warn};

use crate::config::MapConfig;
use crate::error::FetchError;

/// Fetches raw (possibly gzip-compressed) tile bytes by URL.
///
/// The cache owns one of these; tests substitute a counting stub.
pub trait TileFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Blocking reqwest client with the configured timeout and User-Agent
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(config: &MapConfig) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

impl TileFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        trace!(url, "tile GET");

        let response = self.client.get(url).send().map_err(|e| {
            warn!(url, error = %e, is_timeout = e.is_timeout(), "tile request failed");
            FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "tile HTTP error status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: format!("failed to read body: {}", e),
        })?;
        debug!(url, bytes = bytes.len(), "tile fetched");
        Ok(bytes.to_vec())
    }
}
