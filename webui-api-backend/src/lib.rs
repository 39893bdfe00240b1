//! Traits and structs for webui-api cache backend interaction.
//!
//! Implement [`Backend`] to plug a new storage engine into the response cache.
mod backend;
mod entry;
mod key;

pub use backend::{Backend, BackendResult};
pub use entry::CacheEntry;
pub use key::CacheKey;
use thiserror::Error;

/// Describes general groups of errors in backend interaction.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Internal backend error, state or computation error.
    ///
    /// Any error not bound to network interaction.
    #[error(transparent)]
    InternalError(Box<dyn std::error::Error + Send>),
    /// Storage device or connection error.
    #[error(transparent)]
    ConnectionError(Box<dyn std::error::Error + Send>),
}

/// Status of a delete operation.
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteStatus {
    /// Record successfully deleted.
    Deleted(u32),
    /// Record already missing.
    Missing,
}
