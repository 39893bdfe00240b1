use std::sync::Arc;

use async_trait::async_trait;

use crate::{BackendError, CacheEntry, CacheKey, DeleteStatus};

pub type BackendResult<T> = Result<T, BackendError>;

/// Storage engine for cached responses.
///
/// Implementations must not return entries whose
/// [`expire`](CacheEntry::expire) deadline has passed.
#[async_trait]
pub trait Backend: Sync + Send {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheEntry>>;

    async fn write(&self, key: &CacheKey, entry: CacheEntry) -> BackendResult<()>;

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus>;

    /// Name of this backend in logs and metrics.
    fn label(&self) -> &str {
        "backend"
    }
}

#[async_trait]
impl Backend for Box<dyn Backend> {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheEntry>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &CacheKey, entry: CacheEntry) -> BackendResult<()> {
        (**self).write(key, entry).await
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        (**self).remove(key).await
    }

    fn label(&self) -> &str {
        (**self).label()
    }
}

#[async_trait]
impl Backend for Arc<dyn Backend + 'static> {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheEntry>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &CacheKey, entry: CacheEntry) -> BackendResult<()> {
        (**self).write(key, entry).await
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        (**self).remove(key).await
    }

    fn label(&self) -> &str {
        (**self).label()
    }
}
