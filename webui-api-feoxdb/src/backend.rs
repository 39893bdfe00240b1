use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use bincode::{
    config::standard as bincode_config,
    serde::{decode_from_slice, encode_to_vec},
};
use chrono::Utc;
use feoxdb::{FeoxError, FeoxStore};
use webui_api_backend::{
    Backend, BackendError, BackendResult, CacheEntry, CacheKey, DeleteStatus,
};

use crate::FeOxDbError;

/// How long entries kept for revalidation stay in the database when not
/// configured.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Longest TTL FeOxDB can add to its nanosecond timestamps without
/// overflowing.
const MAX_TTL_SECS: u64 = u64::MAX / 1_000_000_000 / 2;

/// Disk-based cache backend using FeOxDB.
///
/// This is the counterpart of the browser's persisted storage: cached
/// responses and their validators survive a restart, so the first request
/// after it can still be answered by a `304 Not Modified`.
///
/// ```no_run
/// use webui_api_feoxdb::FeOxDbBackend;
///
/// let backend = FeOxDbBackend::builder()
///     .path("/var/cache/webui")
///     .max_file_size(64 * 1024 * 1024)
///     .build()?;
/// # Ok::<(), webui_api_feoxdb::FeOxDbError>(())
/// ```
///
/// Cloning is cheap; clones share the same underlying database.
#[derive(Clone)]
pub struct FeOxDbBackend {
    store: Arc<FeoxStore>,
    max_age: Duration,
    label: String,
}

impl std::fmt::Debug for FeOxDbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeOxDbBackend")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl FeOxDbBackend {
    /// Starts building a new backend.
    pub fn builder() -> FeOxDbBackendBuilder {
        FeOxDbBackendBuilder::default()
    }

    /// In-memory backend for tests.
    ///
    /// Data is lost when dropped. Equivalent to `builder().build()`.
    pub fn in_memory() -> Result<Self, FeOxDbError> {
        Self::builder().build()
    }

    /// Forces pending writes to disk.
    ///
    /// FeOxDB buffers writes and flushes them periodically. No-op in
    /// memory-only mode.
    pub fn flush(&self) -> Result<(), FeOxDbError> {
        self.store.flush()?;
        Ok(())
    }
}

/// Builder for [`FeOxDbBackend`].
pub struct FeOxDbBackendBuilder {
    path: Option<PathBuf>,
    max_file_size: Option<u64>,
    max_memory: Option<usize>,
    max_age: Duration,
    label: String,
}

impl Default for FeOxDbBackendBuilder {
    fn default() -> Self {
        Self {
            path: None,
            max_file_size: None,
            max_memory: None,
            max_age: DEFAULT_MAX_AGE,
            label: "feoxdb".to_owned(),
        }
    }
}

impl FeOxDbBackendBuilder {
    /// Enables persistent storage at the given path.
    ///
    /// Without this, data lives only in memory. If path is a directory,
    /// `cache.db` is created inside it.
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Pre-allocates disk space and caps maximum storage.
    ///
    /// Writes fail once the file is full. Ignored in memory-only mode.
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = Some(bytes);
        self
    }

    /// Limits RAM usage.
    ///
    /// FeOxDB has no automatic eviction; writes fail when the limit is
    /// reached.
    pub fn max_memory(mut self, bytes: usize) -> Self {
        self.max_memory = Some(bytes);
        self
    }

    /// Caps how long entries without an expiry are kept.
    ///
    /// Responses with validators are stored without an expiry so they can
    /// be revalidated at any time; past this age FeOxDB drops them.
    /// Defaults to [`DEFAULT_MAX_AGE`].
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Sets the label shown in logs.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Opens or creates the database.
    pub fn build(self) -> Result<FeOxDbBackend, FeOxDbError> {
        let mut builder = FeoxStore::builder().enable_ttl(true);

        if let Some(mut path) = self.path {
            if path.is_dir() {
                path.push("cache.db");
            } else if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            builder = builder.device_path(path.to_string_lossy().to_string());
        }

        if let Some(file_size) = self.max_file_size {
            builder = builder.file_size(file_size);
        }

        if let Some(memory) = self.max_memory {
            builder = builder.max_memory(memory);
        }

        let store = builder.build()?;

        Ok(FeOxDbBackend {
            store: Arc::new(store),
            max_age: self.max_age,
            label: self.label,
        })
    }
}

/// FeOxDB TTLs have second granularity: round up, never pass zero.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs()
        .saturating_add(u64::from(ttl.subsec_nanos() > 0))
        .clamp(1, MAX_TTL_SECS)
}

fn internal<E>(error: E) -> BackendError
where
    E: std::error::Error + Send + 'static,
{
    BackendError::InternalError(Box::new(error))
}

#[async_trait]
impl Backend for FeOxDbBackend {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheEntry>> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        tokio::task::spawn_blocking(move || match store.get(&key_bytes) {
            Ok(encoded) => {
                let (entry, _): (CacheEntry, _) =
                    decode_from_slice(&encoded, bincode_config()).map_err(internal)?;

                if entry.is_expired(Utc::now()) {
                    return Ok(None);
                }
                Ok(Some(entry))
            }
            Err(FeoxError::KeyNotFound) => Ok(None),
            Err(e) => Err(BackendError::ConnectionError(Box::new(e))),
        })
        .await
        .map_err(internal)?
    }

    async fn write(&self, key: &CacheKey, entry: CacheEntry) -> BackendResult<()> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        let ttl = ttl_secs(entry.ttl().unwrap_or(self.max_age));
        let value_bytes = encode_to_vec(&entry, bincode_config()).map_err(internal)?;

        tokio::task::spawn_blocking(move || {
            store
                .insert_with_ttl(&key_bytes, &value_bytes, ttl)
                .map_err(|e| BackendError::ConnectionError(Box::new(e)))?;
            Ok(())
        })
        .await
        .map_err(internal)?
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        tokio::task::spawn_blocking(move || {
            if store.contains_key(&key_bytes) {
                store
                    .delete(&key_bytes)
                    .map_err(|e| BackendError::ConnectionError(Box::new(e)))?;
                Ok(DeleteStatus::Deleted(1))
            } else {
                Ok(DeleteStatus::Missing)
            }
        })
        .await
        .map_err(internal)?
    }

    fn label(&self) -> &str {
        &self.label
    }
}
