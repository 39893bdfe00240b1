//! Cached response with freshness metadata.
//!
//! An entry has two deadlines:
//!
//! - **fresh_until** - before this instant the entry is served without
//!   contacting the server
//! - **expire** - after this instant the backend drops the entry; `None`
//!   keeps it until evicted, which is how entries carrying an `ETag` stay
//!   around for conditional revalidation
//!
//! ```
//! use chrono::{Duration, Utc};
//! use webui_api_backend::CacheEntry;
//!
//! let now = Utc::now();
//! let entry = CacheEntry::new(200, Vec::new(), "{}".into(), now)
//!     .with_freshness(now + Duration::seconds(30), None);
//!
//! assert!(entry.is_fresh(now));
//! assert!(!entry.is_expired(now + Duration::days(365)));
//! ```

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Response status code.
    pub status: u16,
    /// Response headers as name/raw value pairs, in received order.
    pub headers: Vec<(String, Bytes)>,
    /// Response body.
    pub body: Bytes,
    /// `ETag` validator sent by the server, if any.
    pub etag: Option<String>,
    /// `Last-Modified` validator sent by the server, if any.
    pub last_modified: Option<String>,
    /// When the response was stored.
    pub created: DateTime<Utc>,
    /// Entry is served straight from cache before this instant.
    pub fresh_until: DateTime<Utc>,
    /// Entry is dropped by the backend at this instant.
    pub expire: Option<DateTime<Utc>>,
}

impl CacheEntry {
    /// Creates an entry that is stale right away and never expires.
    pub fn new(
        status: u16,
        headers: Vec<(String, Bytes)>,
        body: Bytes,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            status,
            headers,
            body,
            etag: None,
            last_modified: None,
            created,
            fresh_until: created,
            expire: None,
        }
    }

    /// Sets the validators used for conditional revalidation.
    pub fn with_validators(mut self, etag: Option<String>, last_modified: Option<String>) -> Self {
        self.etag = etag;
        self.last_modified = last_modified;
        self
    }

    /// Sets both deadlines.
    pub fn with_freshness(
        mut self,
        fresh_until: DateTime<Utc>,
        expire: Option<DateTime<Utc>>,
    ) -> Self {
        self.renew(fresh_until, expire);
        self
    }

    /// Moves both deadlines after a successful revalidation.
    pub fn renew(&mut self, fresh_until: DateTime<Utc>, expire: Option<DateTime<Utc>>) {
        self.fresh_until = fresh_until;
        self.expire = expire;
    }

    /// Whether the entry can be served without contacting the server.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.fresh_until
    }

    /// Whether the backend should treat the entry as gone.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire.is_some_and(|expire| expire <= now)
    }

    /// Time left until [`expire`](Self::expire).
    ///
    /// Returns `None` for entries without an expiry and [`Duration::ZERO`]
    /// for entries already past it.
    pub fn ttl(&self) -> Option<Duration> {
        self.expire.map(|expire| {
            let millis = (expire - Utc::now()).num_milliseconds();
            if millis <= 0 {
                Duration::ZERO
            } else {
                Duration::from_millis(millis as u64)
            }
        })
    }

    /// Approximate heap footprint, used by byte-bounded backends.
    pub fn memory_size(&self) -> usize {
        let headers: usize = self
            .headers
            .iter()
            .map(|(name, value)| name.len() + value.len())
            .sum();
        std::mem::size_of::<Self>()
            + headers
            + self.body.len()
            + self.etag.as_ref().map_or(0, String::len)
            + self.last_modified.as_ref().map_or(0, String::len)
    }
}
