//! Counters for failures that are absorbed instead of returned.
//!
//! Tiles that fail to fetch or decode and features that match no rule never
//! abort a render. They are counted here so callers can still see them.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of tile cache activity
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub memory_hits: u64,
    pub disk_hits: u64,
    pub network_fetches: u64,
    pub fetch_failures: u64,
    pub decode_failures: u64,
    pub disk_write_failures: u64,
}

/// Live counters behind `CacheStats`, shared by concurrent tile lookups
#[derive(Debug, Default)]
pub struct CacheCounters {
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    network_fetches: AtomicU64,
    fetch_failures: AtomicU64,
    decode_failures: AtomicU64,
    disk_write_failures: AtomicU64,
}

#[derive(Clone, Copy, Debug)]
pub enum CacheEvent {
    MemoryHit,
    DiskHit,
    NetworkFetch,
    FetchFailure,
    DecodeFailure,
    DiskWriteFailure,
}

impl CacheCounters {
    pub fn record(&self, event: CacheEvent) {
        let counter = match event {
            CacheEvent::MemoryHit => &self.memory_hits,
            CacheEvent::DiskHit => &self.disk_hits,
            CacheEvent::NetworkFetch => &self.network_fetches,
            CacheEvent::FetchFailure => &self.fetch_failures,
            CacheEvent::DecodeFailure => &self.decode_failures,
            CacheEvent::DiskWriteFailure => &self.disk_write_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            network_fetches: self.network_fetches.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            disk_write_failures: self.disk_write_failures.load(Ordering::Relaxed),
        }
    }
}

/// What one render pass did, including everything it silently skipped
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// Tiles in the visible neighbourhood
    pub tiles_requested: usize,
    pub tiles_loaded: usize,
    /// Tiles whose fetch failed and were left out of the frame
    pub tiles_dropped: usize,
    /// Features in loaded tiles that matched no style rule
    pub features_unstyled: usize,
    pub features_drawn: usize,
    pub labels_placed: usize,
    pub labels_suppressed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts_events() {
        let counters = CacheCounters::default();
        counters.record(CacheEvent::NetworkFetch);
        counters.record(CacheEvent::NetworkFetch);
        counters.record(CacheEvent::DecodeFailure);
        counters.record(CacheEvent::MemoryHit);

        assert_eq!(
            counters.snapshot(),
            CacheStats {
                memory_hits: 1,
                network_fetches: 2,
                decode_failures: 1,
                ..CacheStats::default()
            }
        );
    }

    #[test]
    fn test_counters_shared_across_threads() {
        let counters = CacheCounters::default();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..100 {
                        counters.record(CacheEvent::DiskHit);
                    }
                });
            }
        });
        assert_eq!(counters.snapshot().disk_hits, 400);
    }
}
