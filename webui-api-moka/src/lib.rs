//! In-memory response cache backend powered by [Moka](https://docs.rs/moka).
//!
//! ```
//! use webui_api_moka::MokaBackend;
//!
//! let backend = MokaBackend::builder().max_entries(1_000).build();
//! ```
#![warn(missing_docs)]

mod backend;
mod builder;
pub mod metrics;

pub use backend::MokaBackend;
pub use builder::{ByteCapacity, EntryCapacity, MokaBackendBuilder, NoCapacity};
pub use moka::policy::EvictionPolicy;
