//! Local object storage for burrow.
//!
//! A [`LocalStore`] is a durable key/value store partitioned into
//! [`KeySpace`]s, one per object category. It holds trees, blobs and blob
//! metadata fetched from a backing source so they can be served again
//! without a network round trip.
//!
//! # Value Formats
//!
//! - [`Tree`] -- bincode, keyed by tree id
//! - [`Blob`] -- git envelope (`"blob <len>\0<bytes>"`), keyed by blob id
//! - [`BlobMetadata`] -- 8-byte big-endian size then 20-byte SHA-1
//!
//! # Storage Backends
//!
//! - [`MemoryLocalStore`] -- map-based store for tests and embedding
//! - [`LmdbLocalStore`] -- LMDB environment with one database per key space
//!
//! # Design Rules
//!
//! 1. Key spaces never mix.
//! 2. A missing key is `Ok(None)`; only storage and decode failures are errors.
//! 3. Batches commit atomically on flush and are discarded on drop.
//! 4. The store knows nothing about caching policy.

pub mod config;
pub mod error;
pub mod git;
pub mod keyspace;
pub mod lmdb;
pub mod memory;
pub mod object;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use config::LocalStoreConfig;
pub use error::{StoreError, StoreResult};
pub use git::{decode_git_blob, decode_git_blob_from_slice, encode_git_blob};
pub use keyspace::{KeySpace, Persistence};
pub use lmdb::LmdbLocalStore;
pub use memory::MemoryLocalStore;
pub use object::{Blob, BlobMetadata, Tree, TreeEntry, TreeEntryType};
pub use traits::{BatchPut, LocalStore, WriteBatch};
