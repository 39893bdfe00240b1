//! Persisted response cache backend on top of [FeOxDB](https://docs.rs/feoxdb).
//!
//! Stored keys keep the namespace prefix of their [`CacheKey`], so several
//! clients can share one database file without colliding.
//!
//! [`CacheKey`]: webui_api_backend::CacheKey
#![warn(missing_docs)]

mod backend;
mod error;

pub use backend::{DEFAULT_MAX_AGE, FeOxDbBackend, FeOxDbBackendBuilder};
pub use error::FeOxDbError;
