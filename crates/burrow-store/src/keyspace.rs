use serde::{Deserialize, Serialize};

/// Whether a key space holds data that can be regenerated on demand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Persistence {
    /// Pure cache of backing-source data. May be cleared at any time.
    Ephemeral,
    /// Data that cannot be recomputed cheaply and must survive maintenance.
    Persistent,
}

/// A partition of the local store.
///
/// Each object category lives in its own key space. Lookups, iteration and
/// maintenance never cross key space boundaries, so the same key bytes may be
/// present in several key spaces with unrelated values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeySpace {
    /// Git-envelope encoded blob contents.
    Blob,
    /// Serialized [`BlobMetadata`](crate::BlobMetadata) records.
    BlobMetadata,
    /// Serialized [`Tree`](crate::Tree) values.
    Tree,
    /// Auxiliary mapping from commit ids to root tree ids.
    CommitToTree,
}

impl KeySpace {
    /// Every key space, in a stable order.
    pub const ALL: [KeySpace; 4] = [
        KeySpace::Blob,
        KeySpace::BlobMetadata,
        KeySpace::Tree,
        KeySpace::CommitToTree,
    ];

    /// Stable on-disk name of the key space.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::BlobMetadata => "blobmeta",
            Self::Tree => "tree",
            Self::CommitToTree => "commit2tree",
        }
    }

    pub fn persistence(&self) -> Persistence {
        match self {
            Self::Blob | Self::BlobMetadata | Self::Tree => Persistence::Ephemeral,
            Self::CommitToTree => Persistence::Persistent,
        }
    }

    /// Returns `true` if the key space may be discarded during maintenance.
    pub fn is_ephemeral(&self) -> bool {
        self.persistence() == Persistence::Ephemeral
    }
}

impl std::fmt::Display for KeySpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
