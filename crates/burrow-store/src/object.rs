use bytes::Bytes;
use serde::{Deserialize, Serialize};
use burrow_types::{Hash20, ObjectId};

use crate::error::{StoreError, StoreResult};
use crate::keyspace::KeySpace;

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

/// File contents fetched from the backing source.
///
/// The buffer is reference counted: cloning a `Blob` or slicing it never
/// copies the contents, and nothing mutates it after construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    contents: Bytes,
}

impl Blob {
    /// Create a blob that takes ownership of `contents`.
    pub fn new(contents: impl Into<Bytes>) -> Self {
        Self {
            contents: contents.into(),
        }
    }

    /// The blob contents.
    pub fn contents(&self) -> &Bytes {
        &self.contents
    }

    /// The blob contents as a byte slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.contents
    }

    /// Size of the contents in bytes.
    pub fn size(&self) -> u64 {
        self.contents.len() as u64
    }
}

// ---------------------------------------------------------------------------
// BlobMetadata
// ---------------------------------------------------------------------------

/// Cheap summary of a blob: its SHA-1 and size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobMetadata {
    pub sha1: Hash20,
    pub size: u64,
}

impl BlobMetadata {
    /// Length of the serialized form: 8-byte size plus 20-byte digest.
    pub const SERIALIZED_SIZE: usize = 8 + Hash20::RAW_SIZE;

    pub fn new(sha1: Hash20, size: u64) -> Self {
        Self { sha1, size }
    }

    /// Compute the metadata of a fully fetched blob.
    pub fn from_blob(blob: &Blob) -> Self {
        Self {
            sha1: Hash20::sha1(blob.as_slice()),
            size: blob.size(),
        }
    }

    /// Serialize as big-endian size followed by the raw digest.
    pub fn serialize(&self) -> [u8; Self::SERIALIZED_SIZE] {
        let mut out = [0u8; Self::SERIALIZED_SIZE];
        out[..8].copy_from_slice(&self.size.to_be_bytes());
        out[8..].copy_from_slice(self.sha1.as_bytes());
        out
    }

    /// Decode the value stored under `id` in the blob metadata key space.
    pub fn deserialize(id: &ObjectId, bytes: &[u8]) -> StoreResult<Self> {
        if bytes.len() != Self::SERIALIZED_SIZE {
            return Err(StoreError::corrupt(
                KeySpace::BlobMetadata,
                id.as_bytes(),
                format!(
                    "expected {} bytes, got {}",
                    Self::SERIALIZED_SIZE,
                    bytes.len()
                ),
            ));
        }
        let mut size = [0u8; 8];
        size.copy_from_slice(&bytes[..8]);
        let sha1 = Hash20::from_slice(&bytes[8..])
            .map_err(|e| StoreError::corrupt(KeySpace::BlobMetadata, id.as_bytes(), e.to_string()))?;
        Ok(Self {
            sha1,
            size: u64::from_be_bytes(size),
        })
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// Kind of object a tree entry refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreeEntryType {
    RegularFile,
    ExecutableFile,
    Symlink,
    /// Subdirectory.
    Tree,
    /// Git submodule commit link.
    GitSubmodule,
}

/// A single entry in a tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Entry name (file or directory name).
    pub name: String,
    /// Id of the referenced blob or tree.
    pub hash: ObjectId,
    pub entry_type: TreeEntryType,
    /// Content size, when the backing source knows it cheaply.
    pub size: Option<u64>,
    /// Content SHA-1, when the backing source knows it cheaply.
    pub content_sha1: Option<Hash20>,
}

impl TreeEntry {
    pub fn new(name: impl Into<String>, hash: ObjectId, entry_type: TreeEntryType) -> Self {
        Self {
            name: name.into(),
            hash,
            entry_type,
            size: None,
            content_sha1: None,
        }
    }

    /// Attach the size and digest the backing source supplied with the tree.
    pub fn with_metadata(mut self, size: u64, content_sha1: Hash20) -> Self {
        self.size = Some(size);
        self.content_sha1 = Some(content_sha1);
        self
    }

    /// Blob metadata carried inline by this entry.
    ///
    /// Only regular files with both size and digest present qualify.
    pub fn blob_metadata(&self) -> Option<BlobMetadata> {
        if self.entry_type != TreeEntryType::RegularFile {
            return None;
        }
        match (self.size, self.content_sha1) {
            (Some(size), Some(sha1)) => Some(BlobMetadata::new(sha1, size)),
            _ => None,
        }
    }
}

/// Directory listing: entries ordered by name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    id: ObjectId,
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// Create a tree with the given id and entries.
    ///
    /// Entries are sorted by name so lookups can binary search.
    pub fn new(id: ObjectId, mut entries: Vec<TreeEntry>) -> Self {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Self { id, entries }
    }

    /// The id this tree is stored under.
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// Entries in name order.
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries
            .binary_search_by(|entry| entry.name.as_str().cmp(name))
            .ok()
            .map(|idx| &self.entries[idx])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TreeEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize for the tree key space.
    pub fn serialize(&self) -> StoreResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Decode the value stored under `id` in the tree key space.
    pub fn deserialize(id: &ObjectId, bytes: &[u8]) -> StoreResult<Self> {
        let tree: Tree = bincode::deserialize(bytes)
            .map_err(|e| StoreError::corrupt(KeySpace::Tree, id.as_bytes(), e.to_string()))?;
        if tree.id != *id {
            return Err(StoreError::corrupt(
                KeySpace::Tree,
                id.as_bytes(),
                format!("value belongs to tree {}", tree.id),
            ));
        }
        Ok(tree)
    }
}

impl<'a> IntoIterator for &'a Tree {
    type Item = &'a TreeEntry;
    type IntoIter = std::slice::Iter<'a, TreeEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(s: &str) -> ObjectId {
        ObjectId::from_bytes(s.as_bytes().to_vec())
    }

    #[test]
    fn tree_entries_sorted() {
        let tree = Tree::new(
            oid("root"),
            vec![
                TreeEntry::new("zebra.txt", oid("z"), TreeEntryType::RegularFile),
                TreeEntry::new("alpha.txt", oid("a"), TreeEntryType::RegularFile),
                TreeEntry::new("middle", oid("m"), TreeEntryType::Tree),
            ],
        );
        let names: Vec<&str> = tree.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha.txt", "middle", "zebra.txt"]);
    }

    #[test]
    fn tree_get_entry() {
        let tree = Tree::new(
            oid("root"),
            vec![
                TreeEntry::new("a.txt", oid("a"), TreeEntryType::RegularFile),
                TreeEntry::new("b.txt", oid("b"), TreeEntryType::ExecutableFile),
            ],
        );
        assert_eq!(tree.get("b.txt").unwrap().hash, oid("b"));
        assert!(tree.get("missing").is_none());
        assert_eq!(tree.len(), 2);
        assert!(!tree.is_empty());
    }

    #[test]
    fn tree_value_roundtrip() {
        let tree = Tree::new(
            oid("root"),
            vec![
                TreeEntry::new("file.txt", oid("f"), TreeEntryType::RegularFile)
                    .with_metadata(5, Hash20::sha1(b"hello")),
                TreeEntry::new("link", oid("l"), TreeEntryType::Symlink),
                TreeEntry::new("sub", oid("s"), TreeEntryType::GitSubmodule),
            ],
        );
        let bytes = tree.serialize().unwrap();
        let decoded = Tree::deserialize(&oid("root"), &bytes).unwrap();
        assert_eq!(decoded, tree);
    }

    #[test]
    fn tree_value_under_wrong_key_is_corrupt() {
        let tree = Tree::new(oid("root"), vec![]);
        let bytes = tree.serialize().unwrap();
        let err = Tree::deserialize(&oid("other"), &bytes).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Corrupt {
                key_space: KeySpace::Tree,
                ..
            }
        ));
    }

    #[test]
    fn tree_garbage_is_corrupt() {
        let err = Tree::deserialize(&oid("root"), &[0xff, 0x01]).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn entry_metadata_only_for_regular_files() {
        let sha1 = Hash20::sha1(b"x");
        let regular =
            TreeEntry::new("f", oid("f"), TreeEntryType::RegularFile).with_metadata(1, sha1);
        let exec =
            TreeEntry::new("e", oid("e"), TreeEntryType::ExecutableFile).with_metadata(1, sha1);
        let bare = TreeEntry::new("b", oid("b"), TreeEntryType::RegularFile);

        assert_eq!(regular.blob_metadata(), Some(BlobMetadata::new(sha1, 1)));
        assert_eq!(exec.blob_metadata(), None);
        assert_eq!(bare.blob_metadata(), None);
    }

    #[test]
    fn entries_with_same_name_keep_their_fields() {
        let file = TreeEntry::new("same", oid("f"), TreeEntryType::RegularFile);
        let dir = TreeEntry::new("same", oid("d"), TreeEntryType::Tree);
        assert_ne!(file, dir);

        let tree = Tree::new(
            oid("root"),
            vec![
                TreeEntry::new("b", oid("b"), TreeEntryType::Symlink),
                file.clone(),
            ],
        );
        assert_eq!(tree.entries()[1], file);
        assert_eq!(tree.get("b").unwrap().entry_type, TreeEntryType::Symlink);
    }

    #[test]
    fn blob_metadata_from_blob() {
        let blob = Blob::new(&b"hello"[..]);
        let meta = BlobMetadata::from_blob(&blob);
        assert_eq!(meta.size, 5);
        assert_eq!(meta.sha1, Hash20::sha1(b"hello"));
    }

    #[test]
    fn blob_metadata_value_roundtrip() {
        let meta = BlobMetadata::new(Hash20::sha1(b"content"), 0x0102_0304_0506);
        let bytes = meta.serialize();
        assert_eq!(&bytes[..8], &0x0102_0304_0506u64.to_be_bytes());
        let decoded = BlobMetadata::deserialize(&oid("k"), &bytes).unwrap();
        assert_eq!(decoded, meta);
    }

    #[test]
    fn blob_metadata_wrong_length_is_corrupt() {
        let err = BlobMetadata::deserialize(&oid("k"), &[0u8; 27]).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Corrupt {
                key_space: KeySpace::BlobMetadata,
                ..
            }
        ));
    }

    #[test]
    fn blob_clone_shares_buffer() {
        let blob = Blob::new(vec![7u8; 64]);
        let clone = blob.clone();
        assert_eq!(blob.as_slice().as_ptr(), clone.as_slice().as_ptr());
        assert_eq!(clone.size(), 64);
    }
}
