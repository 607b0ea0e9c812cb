use crate::keyspace::KeySpace;

/// Errors from local store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A stored value could not be decoded into its typed form.
    #[error("corrupt {key_space} value for key {key}: {reason}")]
    Corrupt {
        key_space: KeySpace,
        key: String,
        reason: String,
    },

    /// A git blob envelope was malformed.
    #[error("malformed blob envelope: {0}")]
    MalformedEnvelope(String),

    /// Serialization of a typed value failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Failure reported by the LMDB engine.
    #[error("LMDB error: {0}")]
    Lmdb(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal lock was poisoned by a panicking writer.
    #[error("store lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    /// Build a [`StoreError::Corrupt`] for a value stored under `key`.
    pub fn corrupt(key_space: KeySpace, key: &[u8], reason: impl Into<String>) -> Self {
        Self::Corrupt {
            key_space,
            key: hex::encode(key),
            reason: reason.into(),
        }
    }
}

impl From<heed::Error> for StoreError {
    fn from(e: heed::Error) -> Self {
        Self::Lmdb(e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
