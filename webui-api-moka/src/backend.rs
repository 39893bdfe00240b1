//! Moka backend implementation.

use async_trait::async_trait;
use chrono::Utc;
use moka::future::Cache;
use webui_api_backend::{Backend, BackendResult, CacheEntry, CacheKey, DeleteStatus};

use crate::builder::{MokaBackendBuilder, NoCapacity};
use crate::metrics;

/// In-memory cache backend powered by Moka.
///
/// Entries expire at their [`CacheEntry::expire`] deadline; entries without
/// one stay until evicted by capacity pressure.
///
/// # Caveats
///
/// - Data is **not persisted**; use `FeOxDbBackend` to keep the cache
///   across restarts
/// - Expiration is **best-effort** in Moka, so reads also check the
///   deadline themselves
#[derive(Clone)]
pub struct MokaBackend {
    /// The underlying Moka async cache instance.
    pub cache: Cache<CacheKey, CacheEntry>,
    /// Label identifying this backend in logs and metrics.
    pub label: String,
}

impl std::fmt::Debug for MokaBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaBackend")
            .field("label", &self.label)
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl MokaBackend {
    /// Starts building a new backend.
    pub fn builder() -> MokaBackendBuilder<NoCapacity> {
        MokaBackendBuilder::new()
    }

    fn record_capacity(&self) {
        metrics::record_capacity(
            &self.label,
            self.cache.entry_count(),
            self.cache.weighted_size(),
        );
    }
}

#[async_trait]
impl Backend for MokaBackend {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheEntry>> {
        Ok(self
            .cache
            .get(key)
            .await
            .filter(|entry| !entry.is_expired(Utc::now())))
    }

    async fn write(&self, key: &CacheKey, entry: CacheEntry) -> BackendResult<()> {
        self.cache.insert(key.clone(), entry).await;
        self.record_capacity();
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        let status = match self.cache.remove(key).await {
            Some(_) => DeleteStatus::Deleted(1),
            None => DeleteStatus::Missing,
        };
        self.record_capacity();
        Ok(status)
    }

    fn label(&self) -> &str {
        &self.label
    }
}
