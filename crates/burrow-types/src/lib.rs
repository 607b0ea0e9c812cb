//! Foundation types for burrow.
//!
//! This crate provides the identifier and digest types shared by every layer
//! of the object cache. Every other burrow crate depends on `burrow-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Opaque identifier of a tree or blob, defined by the backing source
//! - [`RootId`] -- Opaque identifier of a root (commit) snapshot
//! - [`Hash20`] -- Fixed-width 20-byte digest (SHA-1 content hashes, commit ids)

pub mod error;
pub mod hash;
pub mod object;
pub mod root;

pub use error::TypeError;
pub use hash::Hash20;
pub use object::ObjectId;
pub use root::RootId;
