//! Backing sources and the caching layer in front of them.
//!
//! A [`BackingStore`] is the authoritative, usually slow, provider of trees
//! and blobs. [`CachedBackingStore`] wraps one with a
//! [`LocalStore`](burrow_store::LocalStore) so repeated fetches are served
//! from disk. Because it is itself a `BackingStore`, caching layers compose.
//!
//! Which kinds of object get cached is chosen per store with a
//! [`CachingPolicy`]. Fetch outcomes are counted in a shared
//! [`ObjectStoreStats`].

pub mod cached;
pub mod config;
pub mod error;
pub mod fake;
pub mod policy;
pub mod stats;
pub mod traits;

pub use cached::CachedBackingStore;
pub use config::CacheConfig;
pub use error::{BackingError, BackingResult};
pub use fake::FakeBackingStore;
pub use policy::CachingPolicy;
pub use stats::{ObjectStoreStats, StatCounter, StatsSnapshot};
pub use traits::{
    BackingStore, GetBlobMetadataResult, GetBlobResult, GetTreeResult, ObjectComparison, Origin,
};
