//! Default headers shared by every clone of a client.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use http::header::{ACCEPT, HeaderName, HeaderValue};
use http::{Extensions, HeaderMap};
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result};

/// Header carrying the session token.
pub const AUTH_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-auth-token");

/// Header marking requests as coming from script.
pub const REQUESTED_WITH_HEADER: HeaderName = HeaderName::from_static("x-requested-with");

/// Headers every request starts with.
pub(crate) fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        REQUESTED_WITH_HEADER,
        HeaderValue::from_static("XMLHttpRequest"),
    );
    headers
}

/// Header map that can change after the client is built.
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedHeaders(Arc<RwLock<HeaderMap>>);

impl SharedHeaders {
    pub(crate) fn insert(&self, name: HeaderName, value: HeaderValue) {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, value);
    }

    pub(crate) fn get(&self, name: &HeaderName) -> Option<HeaderValue> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn snapshot(&self) -> HeaderMap {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Copies the shared headers onto each request that doesn't set them itself.
pub(crate) struct HeaderInjector {
    headers: SharedHeaders,
}

impl HeaderInjector {
    pub(crate) fn new(headers: SharedHeaders) -> Self {
        Self { headers }
    }
}

#[async_trait]
impl Middleware for HeaderInjector {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let request_headers = req.headers_mut();
        for (name, value) in self.headers.snapshot() {
            if let Some(name) = name
                && !request_headers.contains_key(&name)
            {
                request_headers.insert(name, value);
            }
        }
        next.run(req, extensions).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_visible_to_clones() {
        let headers = SharedHeaders::default();
        let clone = headers.clone();
        headers.insert(AUTH_TOKEN_HEADER, HeaderValue::from_static("t"));
        assert_eq!(clone.get(&AUTH_TOKEN_HEADER).unwrap(), "t");
    }

    #[test]
    fn test_insert_same_value_is_idempotent() {
        let headers = SharedHeaders::default();
        headers.insert(AUTH_TOKEN_HEADER, HeaderValue::from_static("t"));
        let before = headers.snapshot();
        headers.insert(AUTH_TOKEN_HEADER, HeaderValue::from_static("t"));
        assert_eq!(headers.snapshot(), before);
        assert_eq!(headers.snapshot().len(), 1);
    }
}
