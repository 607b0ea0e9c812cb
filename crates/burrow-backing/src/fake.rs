//! In-memory backing source for tests and embedding.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use burrow_store::{Blob, BlobMetadata, Tree, TreeEntry, TreeEntryType};
use burrow_types::{Hash20, ObjectId, RootId};

use crate::error::{BackingError, BackingResult};
use crate::traits::{BackingStore, GetBlobMetadataResult, GetBlobResult, GetTreeResult, Origin};

#[derive(Default)]
struct Objects {
    roots: HashMap<RootId, Arc<Tree>>,
    trees: HashMap<ObjectId, Arc<Tree>>,
    blobs: HashMap<ObjectId, Arc<Blob>>,
    metadata: HashMap<ObjectId, Arc<BlobMetadata>>,
    manifests: HashMap<RootId, Hash20>,
    failing: HashSet<ObjectId>,
}

#[derive(Default)]
struct CallCounts {
    root: AtomicUsize,
    tree: AtomicUsize,
    blob: AtomicUsize,
    metadata: AtomicUsize,
    entry: AtomicUsize,
    prefetch: AtomicUsize,
}

/// Backing source that serves objects registered in memory.
///
/// Every call is counted per kind. Whether blob metadata can be answered
/// without the blob, which [`Origin`] results carry, and which ids fail are
/// all adjustable at runtime.
pub struct FakeBackingStore {
    objects: RwLock<Objects>,
    calls: CallCounts,
    metadata_available: AtomicBool,
    origin: RwLock<Origin>,
    recording: RwLock<Option<BTreeSet<String>>>,
    repo_name: Option<String>,
}

impl FakeBackingStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(Objects::default()),
            calls: CallCounts::default(),
            metadata_available: AtomicBool::new(true),
            origin: RwLock::new(Origin::FromBackingStore),
            recording: RwLock::new(None),
            repo_name: None,
        }
    }

    pub fn with_repo_name(mut self, name: impl Into<String>) -> Self {
        self.repo_name = Some(name.into());
        self
    }

    pub fn put_root(&self, root_id: RootId, tree: Tree) {
        let tree = Arc::new(tree);
        let mut objects = self.objects_mut();
        objects.trees.insert(tree.id().clone(), Arc::clone(&tree));
        objects.roots.insert(root_id, tree);
    }

    pub fn put_tree(&self, tree: Tree) {
        self.objects_mut()
            .trees
            .insert(tree.id().clone(), Arc::new(tree));
    }

    pub fn put_blob(&self, id: ObjectId, blob: Blob) {
        self.objects_mut().blobs.insert(id, Arc::new(blob));
    }

    /// Register metadata that differs from what the blob would produce.
    pub fn put_blob_metadata(&self, id: ObjectId, metadata: BlobMetadata) {
        self.objects_mut().metadata.insert(id, Arc::new(metadata));
    }

    /// Make every fetch of `id` fail.
    pub fn fail_on(&self, id: ObjectId) {
        self.objects_mut().failing.insert(id);
    }

    /// When `false`, metadata requests answer "fetch the blob instead".
    pub fn set_metadata_available(&self, available: bool) {
        self.metadata_available.store(available, Ordering::Relaxed);
    }

    /// Origin reported on tree, blob and metadata results.
    pub fn set_origin(&self, origin: Origin) {
        *self.origin.write().unwrap_or_else(PoisonError::into_inner) = origin;
    }

    pub fn root_calls(&self) -> usize {
        self.calls.root.load(Ordering::Relaxed)
    }

    pub fn tree_calls(&self) -> usize {
        self.calls.tree.load(Ordering::Relaxed)
    }

    pub fn blob_calls(&self) -> usize {
        self.calls.blob.load(Ordering::Relaxed)
    }

    pub fn metadata_calls(&self) -> usize {
        self.calls.metadata.load(Ordering::Relaxed)
    }

    pub fn tree_entry_calls(&self) -> usize {
        self.calls.entry.load(Ordering::Relaxed)
    }

    /// Manifest most recently imported for `root_id`.
    pub fn imported_manifest(&self, root_id: &RootId) -> Option<Hash20> {
        self.objects().manifests.get(root_id).copied()
    }

    pub fn prefetch_calls(&self) -> usize {
        self.calls.prefetch.load(Ordering::Relaxed)
    }

    fn objects(&self) -> std::sync::RwLockReadGuard<'_, Objects> {
        self.objects.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn objects_mut(&self) -> std::sync::RwLockWriteGuard<'_, Objects> {
        self.objects.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_origin(&self) -> Origin {
        *self.origin.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_failure(&self, id: &ObjectId) -> BackingResult<()> {
        if self.objects().failing.contains(id) {
            return Err(BackingError::from_source(format!(
                "injected failure for {id}"
            )));
        }
        Ok(())
    }

    fn record(&self, id: &ObjectId) {
        let mut recording = self.recording.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(fetched) = recording.as_mut() {
            fetched.insert(id.to_hex());
        }
    }
}

impl Default for FakeBackingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackingStore for FakeBackingStore {
    async fn get_root_tree(&self, root_id: &RootId) -> BackingResult<Arc<Tree>> {
        self.calls.root.fetch_add(1, Ordering::Relaxed);
        self.objects()
            .roots
            .get(root_id)
            .cloned()
            .ok_or_else(|| BackingError::RootNotFound(root_id.to_string()))
    }

    async fn get_tree(&self, id: &ObjectId) -> BackingResult<GetTreeResult> {
        self.calls.tree.fetch_add(1, Ordering::Relaxed);
        self.check_failure(id)?;
        let tree = self
            .objects()
            .trees
            .get(id)
            .cloned()
            .ok_or_else(|| BackingError::NotFound(id.to_string()))?;
        self.record(id);
        Ok(GetTreeResult {
            tree,
            origin: self.current_origin(),
        })
    }

    async fn get_blob(&self, id: &ObjectId) -> BackingResult<GetBlobResult> {
        self.calls.blob.fetch_add(1, Ordering::Relaxed);
        self.check_failure(id)?;
        let blob = self
            .objects()
            .blobs
            .get(id)
            .cloned()
            .ok_or_else(|| BackingError::NotFound(id.to_string()))?;
        self.record(id);
        Ok(GetBlobResult {
            blob,
            origin: self.current_origin(),
        })
    }

    async fn get_blob_metadata(&self, id: &ObjectId) -> BackingResult<GetBlobMetadataResult> {
        self.calls.metadata.fetch_add(1, Ordering::Relaxed);
        self.check_failure(id)?;
        if !self.metadata_available.load(Ordering::Relaxed) {
            return Ok(GetBlobMetadataResult::not_available());
        }
        let metadata = {
            let objects = self.objects();
            match objects.metadata.get(id) {
                Some(metadata) => Arc::clone(metadata),
                None => objects
                    .blobs
                    .get(id)
                    .map(|blob| Arc::new(BlobMetadata::from_blob(blob)))
                    .ok_or_else(|| BackingError::NotFound(id.to_string()))?,
            }
        };
        Ok(GetBlobMetadataResult {
            metadata: Some(metadata),
            origin: self.current_origin(),
        })
    }

    /// Finds the entry in any registered tree.
    async fn get_tree_entry_for_object_id(
        &self,
        id: &ObjectId,
        entry_type: TreeEntryType,
    ) -> BackingResult<Arc<TreeEntry>> {
        self.calls.entry.fetch_add(1, Ordering::Relaxed);
        self.check_failure(id)?;
        self.objects()
            .trees
            .values()
            .flat_map(|tree| tree.iter())
            .find(|entry| entry.hash == *id && entry.entry_type == entry_type)
            .cloned()
            .map(Arc::new)
            .ok_or_else(|| BackingError::NotFound(id.to_string()))
    }

    async fn import_manifest_for_root(
        &self,
        root_id: &RootId,
        manifest: &Hash20,
    ) -> BackingResult<()> {
        self.objects_mut()
            .manifests
            .insert(root_id.clone(), *manifest);
        Ok(())
    }

    async fn prefetch_blobs(&self, _ids: &[ObjectId]) -> BackingResult<()> {
        self.calls.prefetch.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn start_recording_fetch(&self) {
        *self.recording.write().unwrap_or_else(PoisonError::into_inner) = Some(BTreeSet::new());
    }

    fn stop_recording_fetch(&self) -> BTreeSet<String> {
        self.recording
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or_default()
    }

    fn repo_name(&self) -> Option<String> {
        self.repo_name.clone()
    }
}

impl std::fmt::Debug for FakeBackingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let objects = self.objects();
        f.debug_struct("FakeBackingStore")
            .field("trees", &objects.trees.len())
            .field("blobs", &objects.blobs.len())
            .field("repo_name", &self.repo_name)
            .finish()
    }
}
