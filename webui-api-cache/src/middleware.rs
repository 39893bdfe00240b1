//! Cache middleware for reqwest-middleware.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::header::{
    CONNECTION, CONTENT_LENGTH, HeaderName, HeaderValue, IF_MODIFIED_SINCE, IF_NONE_MATCH,
    TRANSFER_ENCODING,
};
use http::{Extensions, HeaderMap, StatusCode};
use http_body_util::BodyExt;
use reqwest::{Request, Response, ResponseBuilderExt, Url};
use reqwest_middleware::{Middleware, Next, Result};
use tracing::{debug, warn};
use webui_api_backend::{Backend, CacheEntry, CacheKey};

use crate::metrics;
use crate::{CachePolicy, CacheStatus, DEFAULT_CACHE_STATUS_HEADER};

/// Cache middleware for reqwest-middleware.
///
/// Requests whose method is not listed in the [`CachePolicy`] pass through
/// untouched. Every other response carries a cache status header
/// (`x-cache-status` by default).
///
/// Backend failures never fail a request: they are logged and the request
/// proceeds as a cache miss.
pub struct CacheMiddleware<B: ?Sized> {
    backend: Arc<B>,
    policy: CachePolicy,
    status_header: HeaderName,
}

impl<B: ?Sized> CacheMiddleware<B> {
    /// Create a new cache middleware.
    pub fn new(backend: Arc<B>, policy: CachePolicy) -> Self {
        Self {
            backend,
            policy,
            status_header: DEFAULT_CACHE_STATUS_HEADER,
        }
    }

    /// The policy this middleware applies.
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }
}

impl CacheMiddleware<NotSet> {
    /// Start building a cache middleware.
    pub fn builder() -> CacheMiddlewareBuilder<NotSet> {
        CacheMiddlewareBuilder {
            backend: NotSet,
            policy: CachePolicy::default(),
            status_header: DEFAULT_CACHE_STATUS_HEADER,
        }
    }
}

impl<B: ?Sized> Clone for CacheMiddleware<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            policy: self.policy.clone(),
            status_header: self.status_header.clone(),
        }
    }
}

/// Marker type: the backend has not been set yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotSet;

/// Builder for [`CacheMiddleware`].
///
/// `build()` is only available once a backend is set.
pub struct CacheMiddlewareBuilder<B> {
    backend: B,
    policy: CachePolicy,
    status_header: HeaderName,
}

impl<B> CacheMiddlewareBuilder<B> {
    /// Set the storage backend.
    pub fn backend<T: ?Sized>(self, backend: Arc<T>) -> CacheMiddlewareBuilder<Arc<T>> {
        CacheMiddlewareBuilder {
            backend,
            policy: self.policy,
            status_header: self.status_header,
        }
    }

    /// Set the caching policy. Defaults to [`CachePolicy::default`].
    pub fn policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the header used to report the cache status.
    pub fn status_header(mut self, name: HeaderName) -> Self {
        self.status_header = name;
        self
    }
}

impl<T: ?Sized> CacheMiddlewareBuilder<Arc<T>> {
    /// Build the middleware.
    pub fn build(self) -> CacheMiddleware<T> {
        CacheMiddleware {
            backend: self.backend,
            policy: self.policy,
            status_header: self.status_header,
        }
    }
}

impl<B> CacheMiddleware<B>
where
    B: Backend + ?Sized,
{
    async fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        match self.backend.read(key).await {
            Ok(entry) => entry,
            Err(error) => {
                warn!(%key, backend = self.backend.label(), %error, "cache read failed");
                None
            }
        }
    }

    async fn store(&self, key: &CacheKey, entry: CacheEntry) {
        if let Err(error) = self.backend.write(key, entry).await {
            warn!(%key, backend = self.backend.label(), %error, "cache write failed");
        }
    }

    async fn evict(&self, key: &CacheKey) {
        if let Err(error) = self.backend.remove(key).await {
            warn!(%key, backend = self.backend.label(), %error, "cache remove failed");
        }
    }

    /// Attach conditional headers for the entry's validators.
    ///
    /// Returns whether the request became conditional.
    fn add_validators(&self, request: &mut Request, entry: &CacheEntry) -> bool {
        let mut conditional = false;
        if self.policy.etag
            && let Some(value) = entry.etag.as_deref().and_then(header_value)
        {
            request.headers_mut().insert(IF_NONE_MATCH, value);
            conditional = true;
        }
        if self.policy.modified_since
            && let Some(value) = entry.last_modified.as_deref().and_then(header_value)
        {
            request.headers_mut().insert(IF_MODIFIED_SINCE, value);
            conditional = true;
        }
        conditional
    }

    /// Deadlines for a response fresh for `fresh_for`.
    ///
    /// Entries that can be revalidated stay until evicted; the rest expire
    /// with their freshness.
    fn deadlines(
        now: DateTime<Utc>,
        fresh_for: std::time::Duration,
        revalidatable: bool,
    ) -> (DateTime<Utc>, Option<DateTime<Utc>>) {
        let fresh_until = chrono::Duration::from_std(fresh_for)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let expire = (!revalidatable).then_some(fresh_until);
        (fresh_until, expire)
    }

    fn respond_from(&self, entry: &CacheEntry, status: CacheStatus, url: &Url) -> Response {
        metrics::record_status(self.backend.label(), status);
        let mut response = http::Response::new(reqwest::Body::from(entry.body.clone()));
        tag_url(response.extensions_mut(), url.clone());
        *response.status_mut() = StatusCode::from_u16(entry.status).unwrap_or(StatusCode::OK);
        let headers = response.headers_mut();
        for (name, value) in &entry.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_maybe_shared(value.clone()),
            ) {
                headers.append(name, value);
            }
        }
        headers.insert(self.status_header.clone(), status.header_value());
        response.into()
    }

    fn mark(&self, mut response: Response, status: CacheStatus) -> Response {
        metrics::record_status(self.backend.label(), status);
        response
            .headers_mut()
            .insert(self.status_header.clone(), status.header_value());
        response
    }

    /// Serve `entry` after a `304 Not Modified` carrying `headers`.
    ///
    /// The entry takes the validators and headers of the 304. A 304 that
    /// forbids storing still serves the entry but drops it from the cache.
    async fn revalidated(
        &self,
        key: &CacheKey,
        mut entry: CacheEntry,
        headers: &HeaderMap,
        url: &Url,
    ) -> Response {
        if let Some(etag) = self.policy.etag(headers) {
            entry.etag = Some(etag);
        }
        if let Some(last_modified) = self.policy.last_modified(headers) {
            entry.last_modified = Some(last_modified);
        }
        self.merge_headers(&mut entry, headers);

        let Some(fresh_for) = self.policy.freshness(headers) else {
            debug!(%key, "revalidated response not storable, dropping cache entry");
            self.evict(key).await;
            return self.respond_from(&entry, CacheStatus::Revalidated, url);
        };

        let (fresh_until, expire) = Self::deadlines(Utc::now(), fresh_for, true);
        entry.renew(fresh_until, expire);
        debug!(%key, "cache entry revalidated");
        let response = self.respond_from(&entry, CacheStatus::Revalidated, url);
        self.store(key, entry).await;
        response
    }

    /// Replace the stored headers named in a 304 with its values.
    ///
    /// Framing headers describe the empty 304 body and are skipped.
    fn merge_headers(&self, entry: &mut CacheEntry, headers: &HeaderMap) {
        for name in headers.keys() {
            if *name == self.status_header
                || *name == CONTENT_LENGTH
                || *name == TRANSFER_ENCODING
                || *name == CONNECTION
            {
                continue;
            }
            entry
                .headers
                .retain(|(stored, _)| !name.as_str().eq_ignore_ascii_case(stored));
            entry.headers.extend(headers.get_all(name).iter().map(|value| {
                (
                    name.as_str().to_owned(),
                    Bytes::copy_from_slice(value.as_bytes()),
                )
            }));
        }
    }

    async fn from_upstream(
        &self,
        key: &CacheKey,
        had_entry: bool,
        response: Response,
    ) -> Result<Response> {
        if !response.status().is_success() {
            return Ok(self.mark(response, CacheStatus::Miss));
        }

        let headers = response.headers();
        let etag = self.policy.etag(headers);
        let last_modified = self.policy.last_modified(headers);
        let revalidatable = etag.is_some() || last_modified.is_some();
        let fresh_for = self
            .policy
            .freshness(headers)
            .filter(|fresh_for| !fresh_for.is_zero() || revalidatable);

        let Some(fresh_for) = fresh_for else {
            if had_entry {
                debug!(%key, "response not storable, dropping cache entry");
                self.evict(key).await;
            }
            return Ok(self.mark(response, CacheStatus::Miss));
        };

        let url = response.url().clone();
        let http_response: http::Response<reqwest::Body> = response.into();
        let (mut parts, body) = http_response.into_parts();
        let body: Bytes = body
            .collect()
            .await
            .map_err(reqwest_middleware::Error::Reqwest)?
            .to_bytes();

        let now = Utc::now();
        let (fresh_until, expire) = Self::deadlines(now, fresh_for, revalidatable);
        let stored_headers = parts
            .headers
            .iter()
            .filter(|(name, _)| **name != self.status_header)
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    Bytes::copy_from_slice(value.as_bytes()),
                )
            })
            .collect();
        let entry = CacheEntry::new(parts.status.as_u16(), stored_headers, body.clone(), now)
            .with_validators(etag, last_modified)
            .with_freshness(fresh_until, expire);

        debug!(%key, fresh_for = ?fresh_for, revalidatable, "storing response");
        self.store(key, entry).await;

        tag_url(&mut parts.extensions, url);
        let response: Response = http::Response::from_parts(parts, reqwest::Body::from(body)).into();
        Ok(self.mark(response, CacheStatus::Miss))
    }
}

fn header_value(value: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(value).ok()
}

/// Record `url` as the URL of a rebuilt response.
///
/// Converting from `http::Response` otherwise leaves reqwest's placeholder
/// URL on the result.
fn tag_url(extensions: &mut Extensions, url: Url) {
    let mut builder = http::Response::builder().url(url);
    if let Some(tagged) = builder.extensions_mut() {
        extensions.extend(std::mem::take(tagged));
    }
}

#[async_trait]
impl<B> Middleware for CacheMiddleware<B>
where
    B: Backend + ?Sized + 'static,
{
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        if !self.policy.caches(req.method()) {
            return next.run(req, extensions).await;
        }

        let url = req.url().clone();
        let key = CacheKey::new(&self.policy.prefix, req.method(), url.as_str());
        debug!(%key, "looking up cache key");

        let cached = self.lookup(&key).await;
        let mut conditional = false;
        if let Some(entry) = &cached {
            if entry.is_fresh(Utc::now()) {
                debug!(%key, "cache hit");
                return Ok(self.respond_from(entry, CacheStatus::Hit, &url));
            }
            conditional = self.add_validators(&mut req, entry);
        }

        match next.run(req, extensions).await {
            Ok(response) => match cached {
                Some(entry) if conditional && response.status() == StatusCode::NOT_MODIFIED => {
                    Ok(self
                        .revalidated(&key, entry, response.headers(), response.url())
                        .await)
                }
                Some(entry)
                    if self.policy.stale_if_error && response.status().is_server_error() =>
                {
                    warn!(%key, status = %response.status(), "serving stale entry");
                    Ok(self.respond_from(&entry, CacheStatus::Stale, &url))
                }
                cached => self.from_upstream(&key, cached.is_some(), response).await,
            },
            Err(error) => match cached {
                Some(entry) if self.policy.stale_if_error => {
                    warn!(%key, %error, "serving stale entry");
                    Ok(self.respond_from(&entry, CacheStatus::Stale, &url))
                }
                _ => Err(error),
            },
        }
    }
}
