use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

use super::disk::DiskCache;
use super::source::{HttpFetcher, TileFetcher};
use super::{Tile, TileKey};
use crate::braille::ColorCache;
use crate::config::MapConfig;
use crate::diagnostics::{CacheCounters, CacheEvent};
use crate::error::{FetchError, TileError};
use crate::style::Styler;

pub use crate::diagnostics::CacheStats;

/// Memory, then disk, then network tile lookup.
///
/// Decoded tiles are kept for the life of the cache. The mutex guarding the
/// map is held only for map reads and writes, never across I/O, so two
/// callers missing the same key at once may both fetch it; the first to
/// finish is the one kept.
pub struct TileCache {
    config: MapConfig,
    styler: Arc<Styler>,
    colors: ColorCache,
    fetcher: Box<dyn TileFetcher>,
    disk: Option<DiskCache>,
    tiles: Mutex<HashMap<TileKey, Arc<Tile>>>,
    counters: CacheCounters,
}

impl TileCache {
    /// Cache fetching over HTTP
    pub fn new(config: &MapConfig, styler: Arc<Styler>) -> Result<Self, FetchError> {
        let fetcher = HttpFetcher::new(config)?;
        Ok(Self::with_fetcher(config, styler, Box::new(fetcher)))
    }

    pub fn with_fetcher(config: &MapConfig, styler: Arc<Styler>, fetcher: Box<dyn TileFetcher>) -> Self {
        Self {
            config: config.clone(),
            styler,
            colors: ColorCache::new(),
            fetcher,
            disk: config.cache_dir.clone().map(DiskCache::new),
            tiles: Mutex::new(HashMap::new()),
            counters: CacheCounters::default(),
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn styler(&self) -> &Styler {
        &self.styler
    }

    fn cached(&self, key: TileKey) -> Option<Arc<Tile>> {
        let tiles = self.tiles.lock().unwrap_or_else(PoisonError::into_inner);
        tiles.get(&key).cloned()
    }

    fn url_for(&self, key: TileKey) -> String {
        self.config.tile_url_for(key.z, key.x, key.y)
    }

    /// Raw bytes from disk, else from the network (written back to disk)
    fn raw_bytes(&self, key: TileKey) -> Result<Vec<u8>, FetchError> {
        if let Some(bytes) = self.disk.as_ref().and_then(|d| d.read(key)) {
            self.counters.record(CacheEvent::DiskHit);
            return Ok(bytes);
        }

        self.counters.record(CacheEvent::NetworkFetch);
        let bytes = self.fetcher.fetch(&self.url_for(key)).inspect_err(|e| {
            self.counters.record(CacheEvent::FetchFailure);
            warn!(tile = %key, error = %e, "tile fetch failed");
        })?;

        if let Some(disk) = &self.disk {
            if let Err(e) = disk.write(key, &bytes) {
                self.counters.record(CacheEvent::DiskWriteFailure);
                warn!(tile = %key, path = %disk.path_for(key).display(), error = %e, "disk cache write failed");
            }
        }
        Ok(bytes)
    }

    /// Look up a tile. Fetch failures are returned (and not memoized);
    /// undecodable bytes give a memoized empty tile.
    pub fn try_get_tile(&self, key: TileKey) -> Result<Arc<Tile>, TileError> {
        if let Some(tile) = self.cached(key) {
            self.counters.record(CacheEvent::MemoryHit);
            return Ok(tile);
        }

        let raw = self.raw_bytes(key)?;
        let tile = match Tile::load(key, &raw, &self.styler, &self.colors) {
            Ok(tile) => tile,
            Err(e) => {
                self.counters.record(CacheEvent::DecodeFailure);
                warn!(tile = %key, error = %e, "tile decode failed, using empty tile");
                Tile::empty(key)
            }
        };
        debug!(tile = %key, features = tile.feature_count(), "tile loaded");

        let mut tiles = self.tiles.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(tiles.entry(key).or_insert_with(|| Arc::new(tile))))
    }

    /// Infallible lookup: a tile that cannot be fetched comes back empty
    pub fn get_tile(&self, key: TileKey) -> Arc<Tile> {
        self.try_get_tile(key)
            .unwrap_or_else(|_| Arc::new(Tile::empty(key)))
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Tiles held in memory
    pub fn len(&self) -> usize {
        self.tiles.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubFetcher {
        calls: Arc<AtomicUsize>,
        response: Result<Vec<u8>, FetchError>,
    }

    impl TileFetcher for StubFetcher {
        fn fetch(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone()
        }
    }

    fn cache(config: &MapConfig, response: Result<Vec<u8>, FetchError>) -> (TileCache, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let styler = Arc::new(Styler::embedded().unwrap());
        let fetcher = StubFetcher {
            calls: Arc::clone(&calls),
            response,
        };
        (TileCache::with_fetcher(config, styler, Box::new(fetcher)), calls)
    }

    fn no_disk() -> MapConfig {
        MapConfig::default().with_cache_dir(None)
    }

    #[test]
    fn test_second_lookup_is_memory_hit() {
        // an empty protobuf message decodes to a tile with no layers
        let (cache, calls) = cache(&no_disk(), Ok(Vec::new()));
        let key = TileKey::new(2, 1, 1);

        let first = cache.get_tile(key);
        let second = cache.get_tile(key);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().memory_hits, 1);
    }

    #[test]
    fn test_fetch_failure_not_memoized() {
        let failure = FetchError::Status {
            url: "u".into(),
            status: 503,
        };
        let (cache, calls) = cache(&no_disk(), Err(failure));
        let key = TileKey::new(1, 0, 0);

        assert!(matches!(cache.try_get_tile(key), Err(TileError::Fetch(_))));
        assert!(cache.get_tile(key).is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().fetch_failures, 2);
    }

    #[test]
    fn test_corrupt_tile_memoized_empty() {
        let (cache, calls) = cache(&no_disk(), Ok(b"\x1f\x8b garbage".to_vec()));
        let key = TileKey::new(1, 1, 0);

        let tile = cache.try_get_tile(key).unwrap();
        assert_eq!(tile.feature_count(), 0);
        cache.get_tile(key);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().decode_failures, 1);
    }

    #[test]
    fn test_disk_cache_written_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let config = MapConfig::default().with_cache_dir(Some(dir.path().to_path_buf()));
        let key = TileKey::new(3, 4, 2);

        let (cold, cold_calls) = cache(&config, Ok(Vec::new()));
        cold.get_tile(key);
        assert_eq!(cold_calls.load(Ordering::SeqCst), 1);
        assert!(dir.path().join("3-4-2").is_file());

        // a fresh process-level cache finds the tile on disk
        let (warm, warm_calls) = cache(&config, Ok(Vec::new()));
        warm.get_tile(key);
        assert_eq!(warm_calls.load(Ordering::SeqCst), 0);
        assert_eq!(warm.stats().disk_hits, 1);
    }

    #[test]
    fn test_url_pattern() {
        let config = no_disk().with_tile_url("http://tiles.test/");
        let (cache, _) = cache(&config, Ok(Vec::new()));
        assert_eq!(cache.url_for(TileKey::new(5, 6, 7)), "http://tiles.test/5/6/7.pbf");
    }
}
