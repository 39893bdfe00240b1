//! Cache key construction.
//!
//! A key identifies a response by request method and full URL, namespaced
//! by the storage prefix:
//!
//! ```
//! use http::Method;
//! use webui_api_backend::CacheKey;
//!
//! let key = CacheKey::new("webui-vue-cache:", &Method::GET, "https://bmc/redfish/v1");
//! assert_eq!(key.to_string(), "webui-vue-cache:GET:https://bmc/redfish/v1");
//! assert_eq!(key.prefix(), "webui-vue-cache:");
//! ```

use std::fmt;
use std::sync::Arc;

use http::Method;

/// Identity of a cached response.
///
/// Wraps its formatted text in an [`Arc`], so cloning only bumps a
/// reference count.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    inner: Arc<str>,
    prefix_len: usize,
}

impl CacheKey {
    /// Builds the key `{prefix}{METHOD}:{url}`.
    pub fn new(prefix: &str, method: &Method, url: &str) -> Self {
        Self {
            inner: format!("{prefix}{method}:{url}").into(),
            prefix_len: prefix.len(),
        }
    }

    /// Storage namespace this key belongs to.
    pub fn prefix(&self) -> &str {
        &self.inner[..self.prefix_len]
    }

    /// Key text without the namespace.
    pub fn request_part(&self) -> &str {
        &self.inner[self.prefix_len..]
    }

    /// Full key text, suitable as a storage key.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Full key text as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}
