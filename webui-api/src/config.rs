//! YAML client configuration.
//!
//! ```
//! use webui_api::{ClientConfig, StorageConfig};
//!
//! let config = ClientConfig::from_yaml(
//!     r#"
//!     base_url: https://bmc.example
//!     timeout: 30s
//!     cache:
//!       ttl: 5s
//!     storage:
//!       Memory:
//!         max_entries: 500
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.routes.login, "/login");
//! assert_eq!(config.storage, StorageConfig::Memory { max_entries: 500 });
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use webui_api_backend::Backend;
use webui_api_cache::CachePolicy;
use webui_api_feoxdb::{FeOxDbBackend, FeOxDbError};
use webui_api_moka::MokaBackend;

/// Capacity of the auth event channel when not configured.
pub const DEFAULT_EVENTS_CAPACITY: usize = 16;

/// Entry limit of the in-memory cache when not configured.
pub const DEFAULT_MAX_ENTRIES: u64 = 1_000;

/// Errors raised while loading or applying a [`ClientConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_saphyr::Error),

    #[error("failed to open cache storage: {0}")]
    Storage(#[from] FeOxDbError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Application routes the auth events point at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Routes {
    /// Where an expired session is sent. 401s on this path raise no event.
    pub login: String,
    /// Where an expired password is sent.
    pub change_password: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            login: "/login".to_owned(),
            change_password: "/change-password".to_owned(),
        }
    }
}

/// Where cached responses are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageConfig {
    /// In-process cache, lost on restart.
    Memory {
        #[serde(default = "default_max_entries")]
        max_entries: u64,
    },
    /// Database file that survives restarts.
    Persistent {
        path: PathBuf,
        #[serde(default)]
        max_file_size: Option<u64>,
        /// How long responses kept for revalidation stay on disk.
        #[serde(default, with = "humantime_serde")]
        max_age: Option<Duration>,
    },
    /// No response caching.
    Disabled,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory {
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl StorageConfig {
    /// Open the configured backend. `None` when caching is disabled.
    pub fn open(&self) -> Result<Option<Arc<dyn Backend>>, ConfigError> {
        let backend: Arc<dyn Backend> = match self {
            StorageConfig::Memory { max_entries } => Arc::new(
                MokaBackend::builder()
                    .max_entries(*max_entries)
                    .label("memory")
                    .build(),
            ),
            StorageConfig::Persistent {
                path,
                max_file_size,
                max_age,
            } => {
                let mut builder = FeOxDbBackend::builder().path(path).label("persistent");
                if let Some(size) = max_file_size {
                    builder = builder.max_file_size(*size);
                }
                if let Some(max_age) = max_age {
                    builder = builder.max_age(*max_age);
                }
                Arc::new(builder.build()?)
            }
            StorageConfig::Disabled => return Ok(None),
        };
        Ok(Some(backend))
    }
}

fn default_max_entries() -> u64 {
    DEFAULT_MAX_ENTRIES
}

fn default_events_capacity() -> usize {
    DEFAULT_EVENTS_CAPACITY
}

/// Everything needed to build an [`ApiClient`](crate::ApiClient).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Origin (and optional path prefix) request paths are resolved against.
    pub base_url: Url,
    /// Whole-request timeout. No timeout when absent.
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    /// Buffered auth events per subscriber before it lags.
    #[serde(default = "default_events_capacity")]
    pub events_capacity: usize,
    #[serde(default)]
    pub routes: Routes,
    #[serde(default)]
    pub cache: CachePolicy,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the base URL.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: None,
            events_capacity: DEFAULT_EVENTS_CAPACITY,
            routes: Routes::default(),
            cache: CachePolicy::default(),
            storage: StorageConfig::default(),
        }
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_saphyr::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        validate_events_capacity(self.events_capacity)?;
        if self.base_url.cannot_be_a_base() {
            return Err(ConfigError::Invalid(format!(
                "base_url `{}` cannot be a base",
                self.base_url
            )));
        }
        Ok(())
    }
}

pub(crate) fn validate_events_capacity(capacity: usize) -> Result<(), ConfigError> {
    if capacity == 0 {
        return Err(ConfigError::Invalid(
            "events_capacity must be greater than zero".to_owned(),
        ));
    }
    Ok(())
}
