//! Response cache for `reqwest` clients.
//!
//! [`CacheMiddleware`] plugs into a `reqwest-middleware` chain and stores
//! responses for the methods named in its [`CachePolicy`]. Freshness comes
//! from the policy `ttl` (or `Cache-Control` when `interpret_header` is on);
//! stale entries carrying an `ETag` or `Last-Modified` validator are
//! revalidated with a conditional request and answered from the cache on
//! `304 Not Modified`.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use reqwest_middleware::ClientBuilder;
//! use webui_api_cache::{CacheMiddleware, CachePolicy};
//! use webui_api_moka::MokaBackend;
//!
//! let backend = Arc::new(MokaBackend::builder().max_entries(1_000).build());
//! let middleware = CacheMiddleware::builder()
//!     .backend(backend)
//!     .policy(CachePolicy::default())
//!     .build();
//!
//! let client = ClientBuilder::new(reqwest::Client::new())
//!     .with(middleware)
//!     .build();
//! ```

mod middleware;
pub mod metrics;
mod policy;
mod status;

pub use middleware::{CacheMiddleware, CacheMiddlewareBuilder, NotSet};
pub use policy::{CachePolicy, DEFAULT_CACHE_PREFIX};
pub use status::{CacheStatus, DEFAULT_CACHE_STATUS_HEADER, UnknownCacheStatus};

// Re-export backend types for convenience
pub use webui_api_backend::{Backend, BackendError, CacheEntry, CacheKey, DeleteStatus};
