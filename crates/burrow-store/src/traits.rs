use bytes::Bytes;
use burrow_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::git::{decode_git_blob, encode_git_blob};
use crate::keyspace::KeySpace;
use crate::object::{Blob, BlobMetadata, Tree};

/// A single staged write: key space, key, value.
pub type BatchPut = (KeySpace, Vec<u8>, Vec<u8>);

/// Durable key/value store partitioned by [`KeySpace`].
///
/// All implementations must satisfy these invariants:
/// - Key spaces never mix: a key written to one space is invisible in others.
/// - A missing key is `Ok(None)`, never an error.
/// - [`write_batch`](LocalStore::write_batch) commits all puts atomically.
/// - Writes are idempotent. Values are keyed by content identity, so
///   rewriting a key with the same value is harmless.
/// - The store knows nothing about caching policy.
pub trait LocalStore: Send + Sync {
    /// Point lookup.
    fn get(&self, key_space: KeySpace, key: &[u8]) -> StoreResult<Option<Bytes>>;

    /// Existence check that does not decode the value.
    fn has_key(&self, key_space: KeySpace, key: &[u8]) -> StoreResult<bool>;

    /// Single-key durable write.
    fn put(&self, key_space: KeySpace, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Commit every put in `puts` as one transaction.
    fn write_batch(&self, puts: Vec<BatchPut>) -> StoreResult<()>;

    /// Start a batch whose writes become visible on [`WriteBatch::flush`].
    ///
    /// `size_hint` is the expected number of bytes to be staged; it only
    /// pre-sizes buffers.
    fn begin_write(&self, size_hint: usize) -> WriteBatch<'_>;

    /// Remove every entry in `key_space`.
    fn clear_key_space(&self, key_space: KeySpace) -> StoreResult<()>;

    /// Reclaim space in `key_space` without changing its visible contents.
    fn compact_key_space(&self, key_space: KeySpace) -> StoreResult<()>;

    fn get_tree(&self, id: &ObjectId) -> StoreResult<Option<Tree>> {
        self.get(KeySpace::Tree, id.as_bytes())?
            .map(|bytes| Tree::deserialize(id, &bytes))
            .transpose()
    }

    fn get_blob(&self, id: &ObjectId) -> StoreResult<Option<Blob>> {
        self.get(KeySpace::Blob, id.as_bytes())?
            .map(|bytes| {
                decode_git_blob(bytes).map_err(|e| match e {
                    StoreError::MalformedEnvelope(reason) => {
                        StoreError::corrupt(KeySpace::Blob, id.as_bytes(), reason)
                    }
                    other => other,
                })
            })
            .transpose()
    }

    fn get_blob_metadata(&self, id: &ObjectId) -> StoreResult<Option<BlobMetadata>> {
        self.get(KeySpace::BlobMetadata, id.as_bytes())?
            .map(|bytes| BlobMetadata::deserialize(id, &bytes))
            .transpose()
    }

    fn put_tree(&self, tree: &Tree) -> StoreResult<()> {
        self.put(KeySpace::Tree, tree.id().as_bytes(), &tree.serialize()?)
    }

    fn put_blob(&self, id: &ObjectId, blob: &Blob) -> StoreResult<()> {
        self.put(KeySpace::Blob, id.as_bytes(), &encode_git_blob(blob.as_slice()))
    }

    fn put_blob_metadata(&self, id: &ObjectId, metadata: &BlobMetadata) -> StoreResult<()> {
        self.put(KeySpace::BlobMetadata, id.as_bytes(), &metadata.serialize())
    }

    /// Drop every ephemeral key space, then compact all key spaces.
    fn clear_caches_and_compact_all(&self) -> StoreResult<()> {
        for key_space in KeySpace::ALL {
            if key_space.is_ephemeral() {
                self.clear_key_space(key_space)?;
            }
        }
        for key_space in KeySpace::ALL {
            self.compact_key_space(key_space)?;
        }
        Ok(())
    }
}

/// Scoped accumulator of writes against a [`LocalStore`].
///
/// Staged writes are invisible to readers until [`flush`](WriteBatch::flush)
/// commits them in a single transaction. Dropping a batch without flushing
/// discards it.
pub struct WriteBatch<'a> {
    store: &'a dyn LocalStore,
    puts: Vec<BatchPut>,
    staged_bytes: usize,
}

impl<'a> WriteBatch<'a> {
    /// Create an empty batch targeting `store`.
    pub fn new(store: &'a dyn LocalStore, size_hint: usize) -> Self {
        // Rough guess: a tree with a few dozen entries per kilobyte.
        let capacity = (size_hint / 1024).clamp(1, 1024);
        Self {
            store,
            puts: Vec::with_capacity(capacity),
            staged_bytes: 0,
        }
    }

    /// Stage a raw put.
    pub fn put(&mut self, key_space: KeySpace, key: &[u8], value: Vec<u8>) {
        self.staged_bytes += key.len() + value.len();
        self.puts.push((key_space, key.to_vec(), value));
    }

    pub fn put_tree(&mut self, tree: &Tree) -> StoreResult<()> {
        let value = tree.serialize()?;
        self.put(KeySpace::Tree, tree.id().as_bytes(), value);
        Ok(())
    }

    pub fn put_blob(&mut self, id: &ObjectId, blob: &Blob) {
        self.put(KeySpace::Blob, id.as_bytes(), encode_git_blob(blob.as_slice()));
    }

    pub fn put_blob_metadata(&mut self, id: &ObjectId, metadata: &BlobMetadata) {
        self.put(
            KeySpace::BlobMetadata,
            id.as_bytes(),
            metadata.serialize().to_vec(),
        );
    }

    /// Number of staged puts.
    pub fn len(&self) -> usize {
        self.puts.len()
    }

    /// Returns `true` if nothing has been staged.
    pub fn is_empty(&self) -> bool {
        self.puts.is_empty()
    }

    /// Total key and value bytes staged so far.
    pub fn staged_bytes(&self) -> usize {
        self.staged_bytes
    }

    /// Atomically commit all staged writes. An empty batch is a no-op.
    pub fn flush(self) -> StoreResult<()> {
        if self.puts.is_empty() {
            return Ok(());
        }
        self.store.write_batch(self.puts)
    }
}

impl std::fmt::Debug for WriteBatch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteBatch")
            .field("puts", &self.puts.len())
            .field("staged_bytes", &self.staged_bytes)
            .finish()
    }
}
