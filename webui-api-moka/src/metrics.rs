//! Moka backend capacity metrics.
//!
//! Enable the `metrics` feature to record:
//!
//! - `webui_api_moka_entries` - current number of entries (gauge)
//! - `webui_api_moka_size_bytes` - current weighted size (gauge)
//!
//! Both carry a `backend` label.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Metric name for cache entry count gauge.
    pub static ref MOKA_ENTRIES: &'static str = {
        metrics::describe_gauge!(
            "webui_api_moka_entries",
            "Current number of entries in the Moka response cache."
        );
        "webui_api_moka_entries"
    };

    /// Metric name for cache size gauge.
    pub static ref MOKA_SIZE_BYTES: &'static str = {
        metrics::describe_gauge!(
            "webui_api_moka_size_bytes",
            "Current weighted size of the Moka response cache."
        );
        "webui_api_moka_size_bytes"
    };
}

/// Record current cache capacity metrics.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_capacity(backend: &str, entries: u64, size: u64) {
    metrics::gauge!(*MOKA_ENTRIES, "backend" => backend.to_string()).set(entries as f64);
    metrics::gauge!(*MOKA_SIZE_BYTES, "backend" => backend.to_string()).set(size as f64);
}

/// Record current cache capacity metrics (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_capacity(_backend: &str, _entries: u64, _size: u64) {}
