use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackingError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("root not found: {0}")]
    RootNotFound(String),

    #[error("invalid id: {0}")]
    InvalidId(String),

    /// Failure reported by a backing source, carried verbatim.
    #[error("{0}")]
    Source(Box<dyn std::error::Error + Send + Sync>),

    #[error("a caching store requires a non-empty caching policy")]
    NoCachingPolicy,

    #[error("invalid cache config: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] burrow_store::StoreError),
}

impl BackingError {
    /// Wrap an arbitrary backing-source error.
    pub fn from_source(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Source(err.into())
    }
}

pub type BackingResult<T> = Result<T, BackingError>;
