use std::sync::Arc;

use burrow_store::{LmdbLocalStore, LocalStoreConfig};
use serde::{Deserialize, Serialize};

use crate::cached::CachedBackingStore;
use crate::error::{BackingError, BackingResult};
use crate::policy::CachingPolicy;
use crate::stats::ObjectStoreStats;
use crate::traits::BackingStore;

/// Settings for a caching layer backed by an on-disk local store.
///
/// ```toml
/// caching_policy = "TREES | BLOB_METADATA"
///
/// [local_store]
/// path = "/var/cache/burrow/storage"
/// map_size_mb = 4096
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub caching_policy: CachingPolicy,
    pub local_store: LocalStoreConfig,
}

impl CacheConfig {
    pub fn from_toml_str(s: &str) -> BackingResult<Self> {
        toml::from_str(s).map_err(|e| BackingError::Config(e.to_string()))
    }

    pub fn with_caching_policy(mut self, policy: CachingPolicy) -> Self {
        self.caching_policy = policy;
        self
    }

    pub fn with_local_store(mut self, local_store: LocalStoreConfig) -> Self {
        self.local_store = local_store;
        self
    }

    /// Open the configured LMDB store and wrap `backing` with it.
    pub fn open(
        &self,
        backing: Arc<dyn BackingStore>,
        stats: Arc<ObjectStoreStats>,
    ) -> BackingResult<CachedBackingStore> {
        if self.caching_policy.is_empty() {
            return Err(BackingError::NoCachingPolicy);
        }
        let local = LmdbLocalStore::open(&self.local_store)?;
        CachedBackingStore::new(backing, Arc::new(local), stats, self.caching_policy)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            caching_policy: CachingPolicy::default(),
            local_store: LocalStoreConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeBackingStore;
    use std::path::PathBuf;

    #[test]
    fn default_config() {
        let c = CacheConfig::default();
        assert_eq!(c.caching_policy, CachingPolicy::TREES_AND_BLOB_METADATA);
        assert_eq!(c.local_store, LocalStoreConfig::default());
    }

    #[test]
    fn parse_toml() {
        let c = CacheConfig::from_toml_str(
            r#"
            caching_policy = "TREES | BLOBS"

            [local_store]
            path = "/tmp/burrow"
            map_size_mb = 32
            "#,
        )
        .unwrap();
        assert_eq!(c.caching_policy, CachingPolicy::TREES | CachingPolicy::BLOBS);
        assert_eq!(c.local_store.path, PathBuf::from("/tmp/burrow"));
        assert_eq!(c.local_store.map_size_mb, 32);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let c = CacheConfig::from_toml_str("").unwrap();
        assert_eq!(c, CacheConfig::default());
    }

    #[test]
    fn bad_policy_is_a_config_error() {
        let err = CacheConfig::from_toml_str(r#"caching_policy = "EVERYTHING""#).unwrap_err();
        assert!(matches!(err, BackingError::Config(_)));
    }

    #[test]
    fn open_builds_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = CacheConfig::default()
            .with_caching_policy(CachingPolicy::ANYTHING)
            .with_local_store(LocalStoreConfig::new(dir.path()).with_map_size_mb(16));

        let store = config
            .open(
                Arc::new(FakeBackingStore::new()),
                Arc::new(ObjectStoreStats::new()),
            )
            .unwrap();
        assert_eq!(store.policy(), CachingPolicy::ANYTHING);
    }

    #[test]
    fn open_rejects_empty_policy() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = CacheConfig::default()
            .with_caching_policy(CachingPolicy::NO_CACHING)
            .with_local_store(LocalStoreConfig::new(dir.path()));
        let result = config.open(
            Arc::new(FakeBackingStore::new()),
            Arc::new(ObjectStoreStats::new()),
        );
        assert!(matches!(result, Err(BackingError::NoCachingPolicy)));
    }
}
