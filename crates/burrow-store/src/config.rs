use std::path::PathBuf;
use serde::{Deserialize, Serialize};

/// Location and sizing of an on-disk local store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalStoreConfig {
    /// Directory holding the LMDB environment. Created on open.
    pub path: PathBuf,
    /// Upper bound on the memory map, in megabytes.
    pub map_size_mb: usize,
}

impl LocalStoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_map_size_mb(mut self, map_size_mb: usize) -> Self {
        self.map_size_mb = map_size_mb;
        self
    }

    /// Map size in bytes, as handed to LMDB.
    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for LocalStoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("storage"),
            map_size_mb: 10 * 1024,
        }
    }
}
