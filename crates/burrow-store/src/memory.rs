use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;

use crate::error::{StoreError, StoreResult};
use crate::keyspace::KeySpace;
use crate::traits::{BatchPut, LocalStore, WriteBatch};

type Spaces = HashMap<KeySpace, BTreeMap<Vec<u8>, Bytes>>;

/// In-memory local store.
///
/// Intended for tests and embedding. Values are held as shared buffers, so
/// reads hand out the stored bytes without copying. Nothing survives the
/// store being dropped.
pub struct MemoryLocalStore {
    spaces: RwLock<Spaces>,
}

impl MemoryLocalStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            spaces: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entries in `key_space`.
    pub fn len(&self, key_space: KeySpace) -> StoreResult<usize> {
        Ok(self.read()?.get(&key_space).map_or(0, BTreeMap::len))
    }

    /// Returns `true` if no key space holds any entry.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read()?.values().all(BTreeMap::is_empty))
    }

    /// Sorted keys present in `key_space`.
    pub fn keys(&self, key_space: KeySpace) -> StoreResult<Vec<Vec<u8>>> {
        Ok(self
            .read()?
            .get(&key_space)
            .map(|space| space.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Spaces>> {
        self.spaces
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Spaces>> {
        self.spaces
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for MemoryLocalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key_space: KeySpace, key: &[u8]) -> StoreResult<Option<Bytes>> {
        Ok(self
            .read()?
            .get(&key_space)
            .and_then(|space| space.get(key))
            .cloned())
    }

    fn has_key(&self, key_space: KeySpace, key: &[u8]) -> StoreResult<bool> {
        Ok(self
            .read()?
            .get(&key_space)
            .is_some_and(|space| space.contains_key(key)))
    }

    fn put(&self, key_space: KeySpace, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.write()?
            .entry(key_space)
            .or_default()
            .insert(key.to_vec(), Bytes::copy_from_slice(value));
        Ok(())
    }

    fn write_batch(&self, puts: Vec<BatchPut>) -> StoreResult<()> {
        // A single write guard makes the whole batch visible at once.
        let mut spaces = self.write()?;
        for (key_space, key, value) in puts {
            spaces
                .entry(key_space)
                .or_default()
                .insert(key, Bytes::from(value));
        }
        Ok(())
    }

    fn begin_write(&self, size_hint: usize) -> WriteBatch<'_> {
        WriteBatch::new(self, size_hint)
    }

    fn clear_key_space(&self, key_space: KeySpace) -> StoreResult<()> {
        self.write()?.remove(&key_space);
        Ok(())
    }

    fn compact_key_space(&self, key_space: KeySpace) -> StoreResult<()> {
        let mut spaces = self.write()?;
        if spaces.get(&key_space).is_some_and(BTreeMap::is_empty) {
            spaces.remove(&key_space);
        }
        Ok(())
    }
}

impl std::fmt::Debug for MemoryLocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries: usize = self
            .spaces
            .read()
            .map(|spaces| spaces.values().map(BTreeMap::len).sum())
            .unwrap_or(0);
        f.debug_struct("MemoryLocalStore")
            .field("entry_count", &entries)
            .finish()
    }
}
