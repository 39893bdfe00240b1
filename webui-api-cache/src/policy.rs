//! Caching policy configuration.

use std::time::Duration;

use http::header::{CACHE_CONTROL, ETAG, HeaderMap, LAST_MODIFIED};
use http::Method;
use serde::{Deserialize, Serialize};

/// Storage namespace used when none is configured.
pub const DEFAULT_CACHE_PREFIX: &str = "webui-vue-cache:";

/// Which requests are cached and how entries are kept fresh.
///
/// The defaults cache `GET` only, keep nothing fresh (`ttl` of zero) and
/// rely on `ETag` revalidation, so every request reaches the server and a
/// `304 Not Modified` is answered from the stored body.
///
/// ```
/// use std::time::Duration;
/// use webui_api_cache::CachePolicy;
///
/// let policy: CachePolicy = serde_saphyr::from_str(
///     r#"
///     methods: [get]
///     ttl: 30s
///     stale_if_error: true
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(policy.ttl, Duration::from_secs(30));
/// assert!(policy.etag);
/// assert_eq!(policy.prefix, "webui-vue-cache:");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachePolicy {
    /// Request methods whose responses are cached.
    #[serde(with = "method_list")]
    pub methods: Vec<Method>,
    /// Derive freshness from `Cache-Control` instead of `ttl`.
    pub interpret_header: bool,
    /// Keep entries with an `ETag` and revalidate them with `If-None-Match`.
    pub etag: bool,
    /// Keep entries with `Last-Modified` and revalidate them with `If-Modified-Since`.
    pub modified_since: bool,
    /// Serve a stale entry when the server errors or can't be reached.
    pub stale_if_error: bool,
    /// How long a stored response is served without contacting the server.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    /// Namespace prepended to every storage key.
    pub prefix: String,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            methods: vec![Method::GET],
            interpret_header: false,
            etag: true,
            modified_since: false,
            stale_if_error: false,
            ttl: Duration::ZERO,
            prefix: DEFAULT_CACHE_PREFIX.to_owned(),
        }
    }
}

impl CachePolicy {
    /// Whether responses to `method` go through the cache.
    pub fn caches(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// How long a response with these headers stays fresh.
    ///
    /// `None` means the response must not be stored.
    pub fn freshness(&self, headers: &HeaderMap) -> Option<Duration> {
        if !self.interpret_header {
            return Some(self.ttl);
        }
        let Some(cache_control) = headers
            .get_all(CACHE_CONTROL)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .reduce(|_, last| last)
        else {
            return Some(self.ttl);
        };

        let mut max_age = None;
        for directive in cache_control.split(',').map(str::trim) {
            let (name, value) = directive
                .split_once('=')
                .map_or((directive, None), |(name, value)| (name, Some(value)));
            match name.to_ascii_lowercase().as_str() {
                "no-store" => return None,
                "no-cache" => return Some(Duration::ZERO),
                "max-age" => {
                    max_age = value
                        .and_then(|v| v.trim_matches('"').parse::<u64>().ok())
                        .map(Duration::from_secs);
                }
                _ => {}
            }
        }
        Some(max_age.unwrap_or(self.ttl))
    }

    /// The `ETag` of a response, when `etag` revalidation is enabled.
    pub fn etag(&self, headers: &HeaderMap) -> Option<String> {
        self.etag.then(|| header_string(headers, ETAG)).flatten()
    }

    /// The `Last-Modified` of a response, when `modified_since` is enabled.
    pub fn last_modified(&self, headers: &HeaderMap) -> Option<String> {
        self.modified_since
            .then(|| header_string(headers, LAST_MODIFIED))
            .flatten()
    }
}

fn header_string(headers: &HeaderMap, name: http::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

mod method_list {
    use http::Method;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(methods: &[Method], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(methods.iter().map(Method::as_str))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Method>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<String>::deserialize(deserializer)?
            .into_iter()
            .map(|name| {
                Method::from_bytes(name.to_ascii_uppercase().as_bytes()).map_err(D::Error::custom)
            })
            .collect()
    }
}
