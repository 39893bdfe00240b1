//! Request options and the response envelope.

use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use reqwest_middleware::RequestBuilder;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;
use webui_api_cache::{CacheStatus, DEFAULT_CACHE_STATUS_HEADER};

use crate::ApiError;

/// Host reqwest reports for responses built without a URL.
const PLACEHOLDER_HOST: &str = "no.url.provided.local";

/// Per-request options forwarded to the underlying call.
///
/// Headers set here take precedence over the client defaults, including
/// the auth token.
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Extra request headers.
    pub headers: HeaderMap,
    /// Query pairs appended to the URL.
    pub query: Vec<(String, String)>,
    /// Timeout for this request only.
    pub timeout: Option<Duration>,
}

impl RequestConfig {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a request header.
    pub fn header(mut self, name: http::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Add a query pair.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set a timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) fn extend_url(&self, url: &mut Url) {
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
    }

    pub(crate) fn apply(self, mut builder: RequestBuilder) -> RequestBuilder {
        if !self.headers.is_empty() {
            builder = builder.headers(self.headers);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }
}

/// A fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    url: Url,
    body: Bytes,
}

impl ApiResponse {
    /// Build a response envelope from its parts.
    pub fn new(status: StatusCode, headers: HeaderMap, url: Url, body: Bytes) -> Self {
        Self {
            status,
            headers,
            url,
            body,
        }
    }

    /// Buffer a transport response.
    ///
    /// Keeps the URL the response came from, after redirects. `requested`
    /// stands in for responses that lost theirs in a middleware.
    pub(crate) async fn read(
        response: reqwest::Response,
        requested: Url,
    ) -> Result<Self, ApiError> {
        let url = if response.url().host_str() == Some(PLACEHOLDER_HOST) {
            requested
        } else {
            response.url().clone()
        };
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Self::new(status, headers, url, body))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Final URL of the response, after redirects, query included.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The body parsed as JSON, or `None` when it is empty or not JSON.
    pub fn data(&self) -> Option<Value> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }

    /// Deserialize the body into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// The body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// How the cache produced this response. `None` for uncached methods.
    pub fn cache_status(&self) -> Option<CacheStatus> {
        self.headers
            .get(DEFAULT_CACHE_STATUS_HEADER)?
            .to_str()
            .ok()?
            .parse()
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn response(body: &'static str) -> ApiResponse {
        let mut headers = HeaderMap::new();
        headers.insert("x-cache-status", HeaderValue::from_static("REVALIDATED"));
        ApiResponse::new(
            StatusCode::OK,
            headers,
            Url::parse("https://bmc.example/redfish/v1").unwrap(),
            Bytes::from_static(body.as_bytes()),
        )
    }

    #[test]
    fn test_data_parses_json_body() {
        let data = response(r#"{"Id": "bmc"}"#).data().unwrap();
        assert_eq!(data["Id"], "bmc");
    }

    #[test]
    fn test_data_is_none_for_empty_or_invalid_body() {
        assert!(response("").data().is_none());
        assert!(response("<html>").data().is_none());
    }

    #[test]
    fn test_json_reports_decode_error() {
        let error = response("nope").json::<Value>().unwrap_err();
        assert!(matches!(error, ApiError::Decode(_)));
    }

    #[test]
    fn test_cache_status_from_header() {
        assert_eq!(
            response("").cache_status(),
            Some(CacheStatus::Revalidated)
        );
    }
}
