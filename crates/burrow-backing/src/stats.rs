use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Named outcome counters of the caching layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatCounter {
    GetTreeFromLocalStore,
    GetTreeFromBackingStore,
    GetBlobFromLocalStore,
    GetBlobFromBackingStore,
    GetBlobMetadataFromLocalStore,
    GetBlobMetadataFromBackingStore,
    /// Metadata the backing source answered from its own disk cache.
    GetLocalBlobMetadataFromBackingStore,
    /// Metadata computed from a fully fetched blob.
    GetBlobMetadataFromBlob,
}

impl StatCounter {
    pub const ALL: [StatCounter; 8] = [
        StatCounter::GetTreeFromLocalStore,
        StatCounter::GetTreeFromBackingStore,
        StatCounter::GetBlobFromLocalStore,
        StatCounter::GetBlobFromBackingStore,
        StatCounter::GetBlobMetadataFromLocalStore,
        StatCounter::GetBlobMetadataFromBackingStore,
        StatCounter::GetLocalBlobMetadataFromBackingStore,
        StatCounter::GetBlobMetadataFromBlob,
    ];

    /// Exported counter name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetTreeFromLocalStore => "getTreeFromLocalStore",
            Self::GetTreeFromBackingStore => "getTreeFromBackingStore",
            Self::GetBlobFromLocalStore => "getBlobFromLocalStore",
            Self::GetBlobFromBackingStore => "getBlobFromBackingStore",
            Self::GetBlobMetadataFromLocalStore => "getBlobMetadataFromLocalStore",
            Self::GetBlobMetadataFromBackingStore => "getBlobMetadataFromBackingStore",
            Self::GetLocalBlobMetadataFromBackingStore => "getLocalBlobMetadataFromBackingStore",
            Self::GetBlobMetadataFromBlob => "getBlobMetadataFromBlob",
        }
    }
}

/// Counters shared by every store in a hierarchy.
///
/// Increments use relaxed ordering. Counts are approximate under races.
#[derive(Debug, Default)]
pub struct ObjectStoreStats {
    get_tree_from_local_store: AtomicU64,
    get_tree_from_backing_store: AtomicU64,
    get_blob_from_local_store: AtomicU64,
    get_blob_from_backing_store: AtomicU64,
    get_blob_metadata_from_local_store: AtomicU64,
    get_blob_metadata_from_backing_store: AtomicU64,
    get_local_blob_metadata_from_backing_store: AtomicU64,
    get_blob_metadata_from_blob: AtomicU64,
}

impl ObjectStoreStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, counter: StatCounter) -> &AtomicU64 {
        match counter {
            StatCounter::GetTreeFromLocalStore => &self.get_tree_from_local_store,
            StatCounter::GetTreeFromBackingStore => &self.get_tree_from_backing_store,
            StatCounter::GetBlobFromLocalStore => &self.get_blob_from_local_store,
            StatCounter::GetBlobFromBackingStore => &self.get_blob_from_backing_store,
            StatCounter::GetBlobMetadataFromLocalStore => &self.get_blob_metadata_from_local_store,
            StatCounter::GetBlobMetadataFromBackingStore => {
                &self.get_blob_metadata_from_backing_store
            }
            StatCounter::GetLocalBlobMetadataFromBackingStore => {
                &self.get_local_blob_metadata_from_backing_store
            }
            StatCounter::GetBlobMetadataFromBlob => &self.get_blob_metadata_from_blob,
        }
    }

    pub fn increment(&self, counter: StatCounter) {
        self.counter(counter).fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, counter: StatCounter) -> u64 {
        self.counter(counter).load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            get_tree_from_local_store: self.get(StatCounter::GetTreeFromLocalStore),
            get_tree_from_backing_store: self.get(StatCounter::GetTreeFromBackingStore),
            get_blob_from_local_store: self.get(StatCounter::GetBlobFromLocalStore),
            get_blob_from_backing_store: self.get(StatCounter::GetBlobFromBackingStore),
            get_blob_metadata_from_local_store: self
                .get(StatCounter::GetBlobMetadataFromLocalStore),
            get_blob_metadata_from_backing_store: self
                .get(StatCounter::GetBlobMetadataFromBackingStore),
            get_local_blob_metadata_from_backing_store: self
                .get(StatCounter::GetLocalBlobMetadataFromBackingStore),
            get_blob_metadata_from_blob: self.get(StatCounter::GetBlobMetadataFromBlob),
        }
    }
}

/// Serializable copy of [`ObjectStoreStats`], keyed by exported counter name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub get_tree_from_local_store: u64,
    pub get_tree_from_backing_store: u64,
    pub get_blob_from_local_store: u64,
    pub get_blob_from_backing_store: u64,
    pub get_blob_metadata_from_local_store: u64,
    pub get_blob_metadata_from_backing_store: u64,
    pub get_local_blob_metadata_from_backing_store: u64,
    pub get_blob_metadata_from_blob: u64,
}
