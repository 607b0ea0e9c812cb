use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use burrow_store::{Blob, BlobMetadata, Tree, TreeEntry, TreeEntryType};
use burrow_types::{Hash20, ObjectId, RootId};
use serde::{Deserialize, Serialize};

use crate::error::{BackingError, BackingResult};

/// Where a fetched object came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    /// Served from a local on-disk cache, either ours or the backing
    /// source's own.
    FromDiskCache,
    /// Fetched from the backing source proper.
    FromBackingStore,
    /// No fetch happened.
    NotFetched,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::FromDiskCache => "disk cache",
            Self::FromBackingStore => "backing store",
            Self::NotFetched => "not fetched",
        })
    }
}

/// Result of comparing two object ids without fetching them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectComparison {
    /// The ids alone do not tell.
    Unknown,
    /// The ids name the same contents.
    Identical,
    /// The ids name different contents.
    Different,
}

#[derive(Clone, Debug)]
pub struct GetTreeResult {
    pub tree: Arc<Tree>,
    pub origin: Origin,
}

#[derive(Clone, Debug)]
pub struct GetBlobResult {
    pub blob: Arc<Blob>,
    pub origin: Origin,
}

/// Blob metadata answer from a backing source.
///
/// `metadata == None` means the source cannot produce metadata without the
/// full blob; the caller should fetch the blob and compute it.
#[derive(Clone, Debug)]
pub struct GetBlobMetadataResult {
    pub metadata: Option<Arc<BlobMetadata>>,
    pub origin: Origin,
}

impl GetBlobMetadataResult {
    /// An answer that asks the caller to derive metadata from the blob.
    pub fn not_available() -> Self {
        Self {
            metadata: None,
            origin: Origin::NotFetched,
        }
    }
}

/// An authoritative source of trees and blobs.
///
/// Implementations are free to wrap each other: [`CachedBackingStore`]
/// implements this trait too, so caching layers can be stacked.
///
/// [`CachedBackingStore`]: crate::CachedBackingStore
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Compare two ids without fetching the objects they name.
    fn compare_objects_by_id(&self, one: &ObjectId, two: &ObjectId) -> ObjectComparison {
        if one == two {
            ObjectComparison::Identical
        } else {
            ObjectComparison::Unknown
        }
    }

    async fn get_root_tree(&self, root_id: &RootId) -> BackingResult<Arc<Tree>>;

    async fn get_tree(&self, id: &ObjectId) -> BackingResult<GetTreeResult>;

    async fn get_blob(&self, id: &ObjectId) -> BackingResult<GetBlobResult>;

    async fn get_blob_metadata(&self, id: &ObjectId) -> BackingResult<GetBlobMetadataResult>;

    /// Describe the object `id` as a tree entry of the given type.
    ///
    /// Sources that know nothing beyond the id answer with an unnamed entry
    /// without size or digest.
    async fn get_tree_entry_for_object_id(
        &self,
        id: &ObjectId,
        entry_type: TreeEntryType,
    ) -> BackingResult<Arc<TreeEntry>> {
        Ok(Arc::new(TreeEntry::new(String::new(), id.clone(), entry_type)))
    }

    /// Record `manifest` as the contents of `root_id`.
    async fn import_manifest_for_root(
        &self,
        _root_id: &RootId,
        _manifest: &Hash20,
    ) -> BackingResult<()> {
        Ok(())
    }

    /// Hint that the given blobs will be needed soon.
    async fn prefetch_blobs(&self, _ids: &[ObjectId]) -> BackingResult<()> {
        Ok(())
    }

    /// Periodic housekeeping hook.
    fn periodic_management_task(&self) {}

    /// Start recording the paths of fetched objects.
    fn start_recording_fetch(&self) {}

    /// Stop recording and return the paths fetched since the last start.
    fn stop_recording_fetch(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    fn parse_root_id(&self, value: &str) -> BackingResult<RootId> {
        Ok(RootId::new(value))
    }

    fn render_root_id(&self, root_id: &RootId) -> String {
        root_id.value().to_string()
    }

    fn parse_object_id(&self, value: &str) -> BackingResult<ObjectId> {
        ObjectId::from_hex(value).map_err(|e| BackingError::InvalidId(format!("{value}: {e}")))
    }

    fn render_object_id(&self, id: &ObjectId) -> String {
        id.to_hex()
    }

    /// Name of the repository this source serves, if it has one.
    fn repo_name(&self) -> Option<String> {
        None
    }
}
