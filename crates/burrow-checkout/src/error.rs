//! Error types for checkout metadata.

use std::path::PathBuf;

use thiserror::Error;

/// Ways a SNAPSHOT record can be malformed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("SNAPSHOT file is too short ({0} bytes)")]
    TooShort(usize),

    #[error("unsupported legacy SNAPSHOT file")]
    BadMagic,

    #[error("unexpected length for SNAPSHOT file ({0} bytes)")]
    BadLength(usize),

    #[error("SNAPSHOT body declares {declared} bytes but holds {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("SNAPSHOT file parent ID must be 20 or 40 bytes: was {0} bytes")]
    BadRootIdLength(usize),

    #[error("SNAPSHOT file parent ID is not valid hex: {0}")]
    InvalidHex(String),

    #[error("unsupported SNAPSHOT format (version {0})")]
    UnsupportedVersion(u32),
}

/// Errors that can occur while reading or writing checkout metadata.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The SNAPSHOT file exists but could not be decoded.
    #[error("{source}: {}", .path.display())]
    Snapshot {
        path: PathBuf,
        #[source]
        source: SnapshotError,
    },

    /// The client directory map is not valid JSON of the expected shape.
    #[error("invalid client directory map {}: {reason}", .path.display())]
    ClientMap { path: PathBuf, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for checkout operations.
pub type CheckoutResult<T> = std::result::Result<T, CheckoutError>;
