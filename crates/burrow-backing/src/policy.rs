use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Object kinds a [`CachedBackingStore`](crate::CachedBackingStore)
    /// keeps in its local store.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct CachingPolicy: u8 {
        const NO_CACHING = 0;
        const TREES = 1 << 0;
        const BLOBS = 1 << 1;
        const BLOB_METADATA = 1 << 2;
        const TREES_AND_BLOB_METADATA = Self::TREES.bits() | Self::BLOB_METADATA.bits();
        const ANYTHING = Self::TREES.bits() | Self::BLOBS.bits() | Self::BLOB_METADATA.bits();
    }
}

impl CachingPolicy {
    pub fn caches_trees(&self) -> bool {
        self.contains(Self::TREES)
    }

    pub fn caches_blobs(&self) -> bool {
        self.contains(Self::BLOBS)
    }

    pub fn caches_blob_metadata(&self) -> bool {
        self.contains(Self::BLOB_METADATA)
    }
}

impl Default for CachingPolicy {
    fn default() -> Self {
        Self::TREES_AND_BLOB_METADATA
    }
}
