use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::TileKey;

/// Raw tile bytes on disk, one file per tile named `{z}-{x}-{y}`.
/// No metadata and no expiry: once written a tile is never refetched.
#[derive(Clone, Debug)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: TileKey) -> PathBuf {
        self.dir.join(key.cache_name())
    }

    /// Cached bytes, `None` when absent or unreadable
    pub fn read(&self, key: TileKey) -> Option<Vec<u8>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(tile = %key, error = %e, "disk cache read failed");
                None
            }
        }
    }

    pub fn write(&self, key: TileKey, bytes: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), bytes)
    }
}
