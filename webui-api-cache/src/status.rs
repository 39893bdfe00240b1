//! Cache status reported on every cached-method response.

use std::fmt;
use std::str::FromStr;

use http::header::{HeaderName, HeaderValue};

/// Default header name carrying the [`CacheStatus`].
pub const DEFAULT_CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache-status");

/// How a response was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from a fresh entry without contacting the server.
    Hit,
    /// Fetched from the server.
    Miss,
    /// Server answered `304 Not Modified`; body served from the entry.
    Revalidated,
    /// Server failed; a stale entry was served instead.
    Stale,
}

impl CacheStatus {
    /// Header value for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Revalidated => "REVALIDATED",
            CacheStatus::Stale => "STALE",
        }
    }

    pub(crate) fn header_value(&self) -> HeaderValue {
        HeaderValue::from_static(self.as_str())
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown cache status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCacheStatus;

impl fmt::Display for UnknownCacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown cache status")
    }
}

impl std::error::Error for UnknownCacheStatus {}

impl FromStr for CacheStatus {
    type Err = UnknownCacheStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HIT" => Ok(CacheStatus::Hit),
            "MISS" => Ok(CacheStatus::Miss),
            "REVALIDATED" => Ok(CacheStatus::Revalidated),
            "STALE" => Ok(CacheStatus::Stale),
            _ => Err(UnknownCacheStatus),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header_values() {
        for status in [
            CacheStatus::Hit,
            CacheStatus::Miss,
            CacheStatus::Revalidated,
            CacheStatus::Stale,
        ] {
            assert_eq!(status.as_str().parse::<CacheStatus>(), Ok(status));
        }
        assert_eq!("hit".parse::<CacheStatus>(), Err(UnknownCacheStatus));
    }
}
