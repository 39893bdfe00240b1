//! Cache outcome counters.
//!
//! Enable the `metrics` feature to record, labelled by `backend`:
//!
//! - `webui_api_cache_hit_total`
//! - `webui_api_cache_miss_total`
//! - `webui_api_cache_revalidated_total`
//! - `webui_api_cache_stale_total`

use crate::CacheStatus;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track number of cache hit events.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "webui_api_cache_hit_total",
            "Total number of responses served from a fresh cache entry."
        );
        "webui_api_cache_hit_total"
    };
    /// Track number of cache miss events.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "webui_api_cache_miss_total",
            "Total number of responses fetched from the server."
        );
        "webui_api_cache_miss_total"
    };
    /// Track number of successful revalidations.
    pub static ref CACHE_REVALIDATED_COUNTER: &'static str = {
        metrics::describe_counter!(
            "webui_api_cache_revalidated_total",
            "Total number of 304 responses answered from the cache."
        );
        "webui_api_cache_revalidated_total"
    };
    /// Track number of stale responses served on error.
    pub static ref CACHE_STALE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "webui_api_cache_stale_total",
            "Total number of stale entries served after a server failure."
        );
        "webui_api_cache_stale_total"
    };
}

/// Record a cache outcome for the given backend.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_status(backend: &str, status: CacheStatus) {
    let name = match status {
        CacheStatus::Hit => *CACHE_HIT_COUNTER,
        CacheStatus::Miss => *CACHE_MISS_COUNTER,
        CacheStatus::Revalidated => *CACHE_REVALIDATED_COUNTER,
        CacheStatus::Stale => *CACHE_STALE_COUNTER,
    };
    metrics::counter!(name, "backend" => backend.to_string()).increment(1);
}

/// Record a cache outcome (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_status(_backend: &str, _status: CacheStatus) {}
