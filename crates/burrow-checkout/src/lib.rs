//! Checkout metadata for burrow.
//!
//! Each checkout keeps a private client directory. Its `SNAPSHOT` file
//! records the commit the working copy is based on; the state directory's
//! `config.json` maps mount paths to client directories.
//!
//! # Modules
//!
//! - [`snapshot`] -- SNAPSHOT record codec
//! - [`config`] -- [`CheckoutConfig`]: paths, parent commit read and atomic update
//! - [`client_map`] -- client directory map loader
//! - [`error`] -- error types

pub mod client_map;
pub mod config;
pub mod error;
pub mod snapshot;

pub use client_map::{load_client_directory_map, parse_client_directory_map};
pub use config::CheckoutConfig;
pub use error::{CheckoutError, CheckoutResult, SnapshotError};
pub use snapshot::{decode_snapshot, encode_snapshot};
