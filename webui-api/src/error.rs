//! Error types for the API client.

use http::StatusCode;
use thiserror::Error;

use crate::config::ConfigError;
use crate::response::ApiResponse;

/// Errors returned by [`ApiClient`](crate::ApiClient) operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    ///
    /// The full response is kept so callers can inspect the body.
    #[error("HTTP {} from {}", .0.status(), .0.url())]
    Http(Box<ApiResponse>),

    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest_middleware::Error),

    /// The path could not be resolved against the base URL.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A header value contained characters HTTP doesn't allow.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    /// The response body was not the expected JSON.
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// A spread callback received the wrong number of results.
    #[error("callback takes {expected} results, got {found}")]
    Arity {
        /// Arity of the callback.
        expected: usize,
        /// Number of results passed in.
        found: usize,
    },

    /// The client could not be built from its configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ApiError {
    /// HTTP status of the failed response, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http(response) => Some(response.status()),
            ApiError::Transport(reqwest_middleware::Error::Reqwest(error)) => error.status(),
            _ => None,
        }
    }

    /// The failed response, for [`ApiError::Http`].
    pub fn response(&self) -> Option<&ApiResponse> {
        match self {
            ApiError::Http(response) => Some(response),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        ApiError::Transport(reqwest_middleware::Error::Reqwest(error))
    }
}
