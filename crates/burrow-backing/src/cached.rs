//! Read-through caching in front of a backing source.
//!
//! Every fetch follows the same path: consult the local store if the policy
//! caches that kind of object, otherwise (or on a miss) ask the backing
//! source, then persist what came back before returning it.
//!
//! Local store I/O runs on the blocking pool. A read failure is logged and
//! treated as a miss. A write failure is logged and ignored: the fetch
//! already has a valid result.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use burrow_store::{BlobMetadata, LocalStore, StoreResult, Tree, TreeEntry, TreeEntryType};
use burrow_types::{Hash20, ObjectId, RootId};
use tracing::{debug, warn};

use crate::error::{BackingError, BackingResult};
use crate::policy::CachingPolicy;
use crate::stats::{ObjectStoreStats, StatCounter};
use crate::traits::{
    BackingStore, GetBlobMetadataResult, GetBlobResult, GetTreeResult, ObjectComparison, Origin,
};

/// A [`BackingStore`] that caches results of another one in a [`LocalStore`].
pub struct CachedBackingStore {
    backing: Arc<dyn BackingStore>,
    local: Arc<dyn LocalStore>,
    stats: Arc<ObjectStoreStats>,
    policy: CachingPolicy,
}

impl CachedBackingStore {
    /// Wrap `backing`, caching the kinds of object selected by `policy`.
    ///
    /// An empty policy is rejected: such a store would only add overhead.
    pub fn new(
        backing: Arc<dyn BackingStore>,
        local: Arc<dyn LocalStore>,
        stats: Arc<ObjectStoreStats>,
        policy: CachingPolicy,
    ) -> BackingResult<Self> {
        if policy.is_empty() {
            return Err(BackingError::NoCachingPolicy);
        }
        Ok(Self {
            backing,
            local,
            stats,
            policy,
        })
    }

    /// Kinds of object this store caches.
    pub fn policy(&self) -> CachingPolicy {
        self.policy
    }

    /// Counters shared with every store built on the same stats.
    pub fn stats(&self) -> &Arc<ObjectStoreStats> {
        &self.stats
    }

    /// The store cached objects are written to.
    pub fn local_store(&self) -> &Arc<dyn LocalStore> {
        &self.local
    }

    /// The wrapped source.
    pub fn backing_store(&self) -> &Arc<dyn BackingStore> {
        &self.backing
    }

    /// Run a local lookup on the blocking pool. Errors become misses.
    async fn local_read<T, F>(&self, kind: &'static str, id: &ObjectId, read: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn LocalStore) -> StoreResult<Option<T>> + Send + 'static,
    {
        let local = Arc::clone(&self.local);
        match tokio::task::spawn_blocking(move || read(local.as_ref())).await {
            Ok(Ok(found)) => found,
            Ok(Err(e)) => {
                warn!(kind, %id, error = %e, "local store read failed, fetching from backing store");
                None
            }
            Err(e) => {
                warn!(kind, %id, error = %e, "local store read task failed");
                None
            }
        }
    }

    /// Run a local write on the blocking pool and wait for it.
    ///
    /// The task keeps running if this future is dropped.
    async fn local_write<F>(&self, kind: &'static str, id: &ObjectId, write: F)
    where
        F: FnOnce(&dyn LocalStore) -> StoreResult<()> + Send + 'static,
    {
        let local = Arc::clone(&self.local);
        match tokio::task::spawn_blocking(move || write(local.as_ref())).await {
            Ok(Ok(())) => debug!(kind, %id, "cached object locally"),
            Ok(Err(e)) => warn!(kind, %id, error = %e, "failed to cache object locally"),
            Err(e) => warn!(kind, %id, error = %e, "local store write task failed"),
        }
    }
}

#[async_trait]
impl BackingStore for CachedBackingStore {
    fn compare_objects_by_id(&self, one: &ObjectId, two: &ObjectId) -> ObjectComparison {
        self.backing.compare_objects_by_id(one, two)
    }

    async fn get_root_tree(&self, root_id: &RootId) -> BackingResult<Arc<Tree>> {
        let tree = self.backing.get_root_tree(root_id).await?;
        if self.policy.caches_trees() {
            let cached = Arc::clone(&tree);
            self.local_write("tree", tree.id(), move |local| local.put_tree(&cached))
                .await;
        }
        Ok(tree)
    }

    async fn get_tree(&self, id: &ObjectId) -> BackingResult<GetTreeResult> {
        if self.policy.caches_trees() {
            let key = id.clone();
            if let Some(tree) = self
                .local_read("tree", id, move |local| local.get_tree(&key))
                .await
            {
                self.stats.increment(StatCounter::GetTreeFromLocalStore);
                return Ok(GetTreeResult {
                    tree: Arc::new(tree),
                    origin: Origin::FromDiskCache,
                });
            }
        }

        let result = self.backing.get_tree(id).await?;

        if self
            .policy
            .intersects(CachingPolicy::TREES | CachingPolicy::BLOB_METADATA)
        {
            let tree = Arc::clone(&result.tree);
            let policy = self.policy;
            self.local_write("tree", id, move |local| {
                let mut batch = local.begin_write(0);
                if policy.caches_trees() {
                    batch.put_tree(&tree)?;
                }
                if policy.caches_blob_metadata() {
                    for entry in tree.iter() {
                        if let Some(metadata) = entry.blob_metadata() {
                            batch.put_blob_metadata(&entry.hash, &metadata);
                        }
                    }
                }
                batch.flush()
            })
            .await;
        }

        self.stats.increment(StatCounter::GetTreeFromBackingStore);
        Ok(result)
    }

    async fn get_blob(&self, id: &ObjectId) -> BackingResult<GetBlobResult> {
        if self.policy.caches_blobs() {
            let key = id.clone();
            if let Some(blob) = self
                .local_read("blob", id, move |local| local.get_blob(&key))
                .await
            {
                self.stats.increment(StatCounter::GetBlobFromLocalStore);
                return Ok(GetBlobResult {
                    blob: Arc::new(blob),
                    origin: Origin::FromDiskCache,
                });
            }
        }

        let result = self.backing.get_blob(id).await?;

        if self.policy.caches_blobs() {
            let blob = Arc::clone(&result.blob);
            let key = id.clone();
            self.local_write("blob", id, move |local| local.put_blob(&key, &blob))
                .await;
        }

        self.stats.increment(StatCounter::GetBlobFromBackingStore);
        Ok(result)
    }

    async fn get_blob_metadata(&self, id: &ObjectId) -> BackingResult<GetBlobMetadataResult> {
        if self.policy.caches_blob_metadata() {
            let key = id.clone();
            if let Some(metadata) = self
                .local_read("blobmeta", id, move |local| local.get_blob_metadata(&key))
                .await
            {
                self.stats
                    .increment(StatCounter::GetBlobMetadataFromLocalStore);
                return Ok(GetBlobMetadataResult {
                    metadata: Some(Arc::new(metadata)),
                    origin: Origin::FromDiskCache,
                });
            }
        }

        let result = self.backing.get_blob_metadata(id).await?;
        let (metadata, origin) = match result.metadata {
            Some(metadata) => {
                // Kept apart in the counters only; the data is the same.
                if result.origin == Origin::FromDiskCache {
                    self.stats
                        .increment(StatCounter::GetLocalBlobMetadataFromBackingStore);
                } else {
                    self.stats
                        .increment(StatCounter::GetBlobMetadataFromBackingStore);
                }
                (metadata, result.origin)
            }
            None => {
                let blob = self.get_blob(id).await?;
                self.stats.increment(StatCounter::GetBlobMetadataFromBlob);
                (Arc::new(BlobMetadata::from_blob(&blob.blob)), blob.origin)
            }
        };

        if self.policy.caches_blob_metadata() {
            let cached = Arc::clone(&metadata);
            let key = id.clone();
            self.local_write("blobmeta", id, move |local| {
                local.put_blob_metadata(&key, &cached)
            })
            .await;
        }

        Ok(GetBlobMetadataResult {
            metadata: Some(metadata),
            origin,
        })
    }

    async fn get_tree_entry_for_object_id(
        &self,
        id: &ObjectId,
        entry_type: TreeEntryType,
    ) -> BackingResult<Arc<TreeEntry>> {
        self.backing.get_tree_entry_for_object_id(id, entry_type).await
    }

    async fn import_manifest_for_root(
        &self,
        root_id: &RootId,
        manifest: &Hash20,
    ) -> BackingResult<()> {
        self.backing.import_manifest_for_root(root_id, manifest).await
    }

    async fn prefetch_blobs(&self, ids: &[ObjectId]) -> BackingResult<()> {
        self.backing.prefetch_blobs(ids).await
    }

    fn periodic_management_task(&self) {
        self.backing.periodic_management_task();
    }

    fn start_recording_fetch(&self) {
        self.backing.start_recording_fetch();
    }

    fn stop_recording_fetch(&self) -> BTreeSet<String> {
        self.backing.stop_recording_fetch()
    }

    fn parse_root_id(&self, value: &str) -> BackingResult<RootId> {
        self.backing.parse_root_id(value)
    }

    fn render_root_id(&self, root_id: &RootId) -> String {
        self.backing.render_root_id(root_id)
    }

    fn parse_object_id(&self, value: &str) -> BackingResult<ObjectId> {
        self.backing.parse_object_id(value)
    }

    fn render_object_id(&self, id: &ObjectId) -> String {
        self.backing.render_object_id(id)
    }

    fn repo_name(&self) -> Option<String> {
        self.backing.repo_name()
    }
}

impl std::fmt::Debug for CachedBackingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedBackingStore")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
