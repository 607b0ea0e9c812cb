//! LMDB-backed local store.
//!
//! One named database per [`KeySpace`] inside a single environment. Reads
//! run in read transactions and copy the value out before the transaction
//! ends; batches commit in one write transaction.
//!
//! LMDB never shrinks its data file in place. Compaction writes a compacted
//! copy of the environment next to `data.mdb`, closes the environment,
//! renames the copy over the original and reopens it.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use bytes::Bytes;
use heed::types::Bytes as RawBytes;
use heed::{CompactionOption, Database, Env, EnvOpenOptions};
use tracing::{debug, info, warn};

use crate::config::LocalStoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::keyspace::KeySpace;
use crate::traits::{BatchPut, LocalStore, WriteBatch};

const DATA_FILE: &str = "data.mdb";
const COMPACTED_FILE: &str = "data.mdb.compacted";

/// An open environment and its per-key-space databases.
struct OpenEnv {
    env: Env,
    databases: HashMap<KeySpace, Database<RawBytes, RawBytes>>,
}

impl OpenEnv {
    fn open(path: &Path, map_size: usize) -> StoreResult<Self> {
        // SAFETY: each environment directory is opened once per process by
        // the owner of the store, and only reopened after it was closed.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(KeySpace::ALL.len() as u32)
                .open(path)
        }?;

        let mut wtxn = env.write_txn()?;
        let mut databases = HashMap::with_capacity(KeySpace::ALL.len());
        for key_space in KeySpace::ALL {
            let db: Database<RawBytes, RawBytes> =
                env.create_database(&mut wtxn, Some(key_space.name()))?;
            databases.insert(key_space, db);
        }
        wtxn.commit()?;
        Ok(Self { env, databases })
    }

    fn db(&self, key_space: KeySpace) -> StoreResult<Database<RawBytes, RawBytes>> {
        self.databases
            .get(&key_space)
            .copied()
            .ok_or_else(|| StoreError::Lmdb(format!("no database for key space {key_space}")))
    }
}

/// Durable local store on top of an LMDB environment.
pub struct LmdbLocalStore {
    path: PathBuf,
    map_size: usize,
    // `None` only if reopening after a compaction failed.
    state: RwLock<Option<OpenEnv>>,
}

impl LmdbLocalStore {
    /// Open (creating if needed) the store described by `config`.
    pub fn open(config: &LocalStoreConfig) -> StoreResult<Self> {
        Self::open_at(&config.path, config.map_size_bytes())
    }

    /// Open (creating if needed) a store in `path` with the given map size.
    pub fn open_at(path: impl AsRef<Path>, map_size: usize) -> StoreResult<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let open = OpenEnv::open(path, map_size)?;

        info!(path = %path.display(), map_size, "opened local store");
        Ok(Self {
            path: path.to_path_buf(),
            map_size,
            state: RwLock::new(Some(open)),
        })
    }

    /// Directory holding the environment.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries in `key_space`.
    pub fn len(&self, key_space: KeySpace) -> StoreResult<u64> {
        self.with_env(|open| {
            let db = open.db(key_space)?;
            let rtxn = open.env.read_txn()?;
            Ok(db.len(&rtxn)?)
        })
    }

    /// Size in bytes of the environment's data file.
    pub fn data_file_size(&self) -> StoreResult<u64> {
        Ok(std::fs::metadata(self.path.join(DATA_FILE))?.len())
    }

    /// Rewrite the environment without its free pages, shrinking the data
    /// file. Other operations wait until the swap is done.
    pub fn compact(&self) -> StoreResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        let data = self.path.join(DATA_FILE);
        let compacted = self.path.join(COMPACTED_FILE);
        let before = std::fs::metadata(&data)?.len();
        let open = state.take().ok_or_else(closed)?;

        if let Err(e) = write_compacted_copy(&open.env, &compacted) {
            if let Err(cleanup) = remove_if_exists(&compacted) {
                warn!(path = %compacted.display(), error = %cleanup, "failed to remove partial compacted copy");
            }
            *state = Some(open);
            return Err(e);
        }

        // Every transaction borrows the state lock, so this is the last handle.
        let OpenEnv { env, .. } = open;
        env.prepare_for_closing().wait();

        let renamed = std::fs::rename(&compacted, &data);
        *state = Some(OpenEnv::open(&self.path, self.map_size)?);
        renamed?;

        let after = std::fs::metadata(&data)?.len();
        info!(path = %self.path.display(), before, after, "compacted local store");
        Ok(())
    }

    fn with_env<T>(&self, f: impl FnOnce(&OpenEnv) -> StoreResult<T>) -> StoreResult<T> {
        let state = self
            .state
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        f(state.as_ref().ok_or_else(closed)?)
    }
}

fn closed() -> StoreError {
    StoreError::Lmdb("environment is closed after a failed compaction".to_string())
}

fn write_compacted_copy(env: &Env, target: &Path) -> StoreResult<()> {
    remove_if_exists(target)?;
    let file = env.copy_to_file(target, CompactionOption::Enabled)?;
    file.sync_all()?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

impl LocalStore for LmdbLocalStore {
    fn get(&self, key_space: KeySpace, key: &[u8]) -> StoreResult<Option<Bytes>> {
        self.with_env(|open| {
            let db = open.db(key_space)?;
            let rtxn = open.env.read_txn()?;
            Ok(db.get(&rtxn, key)?.map(Bytes::copy_from_slice))
        })
    }

    fn has_key(&self, key_space: KeySpace, key: &[u8]) -> StoreResult<bool> {
        self.with_env(|open| {
            let db = open.db(key_space)?;
            let rtxn = open.env.read_txn()?;
            Ok(db.get(&rtxn, key)?.is_some())
        })
    }

    fn put(&self, key_space: KeySpace, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.with_env(|open| {
            let db = open.db(key_space)?;
            let mut wtxn = open.env.write_txn()?;
            db.put(&mut wtxn, key, value)?;
            wtxn.commit()?;
            Ok(())
        })
    }

    fn write_batch(&self, puts: Vec<BatchPut>) -> StoreResult<()> {
        let count = puts.len();
        self.with_env(|open| {
            let mut wtxn = open.env.write_txn()?;
            for (key_space, key, value) in &puts {
                open.db(*key_space)?.put(&mut wtxn, key, value)?;
            }
            wtxn.commit()?;
            Ok(())
        })?;
        debug!(count, "committed write batch");
        Ok(())
    }

    fn begin_write(&self, size_hint: usize) -> WriteBatch<'_> {
        WriteBatch::new(self, size_hint)
    }

    fn clear_key_space(&self, key_space: KeySpace) -> StoreResult<()> {
        self.with_env(|open| {
            let db = open.db(key_space)?;
            let mut wtxn = open.env.write_txn()?;
            db.clear(&mut wtxn)?;
            wtxn.commit()?;
            Ok(())
        })?;
        info!(%key_space, "cleared key space");
        Ok(())
    }

    /// Key spaces share one data file, so this compacts the whole environment.
    fn compact_key_space(&self, key_space: KeySpace) -> StoreResult<()> {
        debug!(%key_space, "compacting key space");
        self.compact()
    }

    fn clear_caches_and_compact_all(&self) -> StoreResult<()> {
        for key_space in KeySpace::ALL {
            if key_space.is_ephemeral() {
                self.clear_key_space(key_space)?;
            }
        }
        self.compact()
    }
}

impl std::fmt::Debug for LmdbLocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LmdbLocalStore")
            .field("path", &self.path)
            .field("map_size", &self.map_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Blob, BlobMetadata, Tree, TreeEntry, TreeEntryType};
    use burrow_types::{Hash20, ObjectId};
    use tempfile::TempDir;

    fn oid(s: &str) -> ObjectId {
        ObjectId::from_bytes(s.as_bytes().to_vec())
    }

    fn open(dir: &TempDir) -> LmdbLocalStore {
        LmdbLocalStore::open(&LocalStoreConfig::new(dir.path()).with_map_size_mb(16)).unwrap()
    }

    #[test]
    fn put_and_get() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.put(KeySpace::Blob, b"k", b"v").unwrap();
        assert_eq!(
            store.get(KeySpace::Blob, b"k").unwrap().as_deref(),
            Some(&b"v"[..])
        );
        assert!(store.get(KeySpace::Blob, b"missing").unwrap().is_none());
    }

    #[test]
    fn key_spaces_are_isolated() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.put(KeySpace::Tree, b"same", b"tree").unwrap();
        assert!(store.has_key(KeySpace::Tree, b"same").unwrap());
        assert!(!store.has_key(KeySpace::Blob, b"same").unwrap());
    }

    #[test]
    fn data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let tree = Tree::new(
            oid("root"),
            vec![TreeEntry::new("a", oid("a"), TreeEntryType::RegularFile)
                .with_metadata(1, Hash20::sha1(b"a"))],
        );
        {
            let store = open(&dir);
            store.put_tree(&tree).unwrap();
            store.put_blob(&oid("a"), &Blob::new(&b"a"[..])).unwrap();
        }
        let store = open(&dir);
        assert_eq!(store.get_tree(&oid("root")).unwrap(), Some(tree));
        assert_eq!(
            store.get_blob(&oid("a")).unwrap().unwrap().as_slice(),
            b"a"
        );
    }

    #[test]
    fn batch_commits_all_puts() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let blob = Blob::new(&b"content"[..]);

        let mut batch = store.begin_write(0);
        batch.put_blob(&oid("b"), &blob);
        batch.put_blob_metadata(&oid("b"), &BlobMetadata::from_blob(&blob));
        assert!(!store.has_key(KeySpace::Blob, b"b").unwrap());
        batch.flush().unwrap();

        assert_eq!(store.len(KeySpace::Blob).unwrap(), 1);
        assert_eq!(
            store.get_blob_metadata(&oid("b")).unwrap(),
            Some(BlobMetadata::from_blob(&blob))
        );
    }

    #[test]
    fn clear_caches_keeps_persistent_data() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        for key_space in KeySpace::ALL {
            store.put(key_space, b"k", b"v").unwrap();
        }
        store.clear_caches_and_compact_all().unwrap();

        assert_eq!(store.len(KeySpace::Blob).unwrap(), 0);
        assert_eq!(store.len(KeySpace::BlobMetadata).unwrap(), 0);
        assert_eq!(store.len(KeySpace::Tree).unwrap(), 0);
        assert_eq!(store.len(KeySpace::CommitToTree).unwrap(), 1);
    }

    #[test]
    fn compact_keeps_contents() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.put(KeySpace::Tree, b"a", b"1").unwrap();
        store.put(KeySpace::Tree, b"b", b"2").unwrap();
        store.compact_key_space(KeySpace::Tree).unwrap();

        assert_eq!(store.len(KeySpace::Tree).unwrap(), 2);
        assert_eq!(
            store.get(KeySpace::Tree, b"b").unwrap().as_deref(),
            Some(&b"2"[..])
        );
        assert!(!dir.path().join(COMPACTED_FILE).exists());

        store.put(KeySpace::Tree, b"c", b"3").unwrap();
        assert_eq!(store.len(KeySpace::Tree).unwrap(), 3);
    }

    #[test]
    fn compact_shrinks_data_file() {
        let dir = TempDir::new().unwrap();
        let store =
            LmdbLocalStore::open(&LocalStoreConfig::new(dir.path()).with_map_size_mb(64)).unwrap();
        let value = vec![0xabu8; 64 * 1024];
        for i in 0..400u32 {
            store.put(KeySpace::Tree, &i.to_be_bytes(), &value).unwrap();
        }
        store.clear_key_space(KeySpace::Tree).unwrap();
        for i in 0..10u32 {
            store.put(KeySpace::Tree, &i.to_be_bytes(), &value).unwrap();
        }
        let before = store.data_file_size().unwrap();

        store.compact_key_space(KeySpace::Tree).unwrap();

        let after = store.data_file_size().unwrap();
        assert!(after < before / 4, "before={before} after={after}");
        assert_eq!(store.len(KeySpace::Tree).unwrap(), 10);
        assert_eq!(
            store.get(KeySpace::Tree, &3u32.to_be_bytes()).unwrap().as_deref(),
            Some(&value[..])
        );
    }

    #[test]
    fn clear_caches_shrinks_data_file() {
        let dir = TempDir::new().unwrap();
        let store =
            LmdbLocalStore::open(&LocalStoreConfig::new(dir.path()).with_map_size_mb(64)).unwrap();
        let value = vec![1u8; 64 * 1024];
        for i in 0..200u32 {
            store.put(KeySpace::Blob, &i.to_be_bytes(), &value).unwrap();
        }
        store.put(KeySpace::CommitToTree, b"commit", b"tree").unwrap();
        let before = store.data_file_size().unwrap();

        store.clear_caches_and_compact_all().unwrap();

        assert!(store.data_file_size().unwrap() < before);
        assert_eq!(store.len(KeySpace::Blob).unwrap(), 0);
        assert!(store.has_key(KeySpace::CommitToTree, b"commit").unwrap());
    }

    #[test]
    fn compacted_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = open(&dir);
            store.put(KeySpace::CommitToTree, b"c", b"t").unwrap();
            store.compact().unwrap();
        }
        let store = open(&dir);
        assert_eq!(
            store.get(KeySpace::CommitToTree, b"c").unwrap().as_deref(),
            Some(&b"t"[..])
        );
    }

    #[test]
    fn corrupt_metadata_value_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.put(KeySpace::BlobMetadata, b"m", b"short").unwrap();
        assert!(matches!(
            store.get_blob_metadata(&oid("m")),
            Err(StoreError::Corrupt { .. })
        ));
    }
}
