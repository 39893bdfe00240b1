//! Session and authorization failure handling.
//!
//! [`AuthInterceptor`] watches every response for `401 Unauthorized` and
//! `403 Forbidden` and publishes an [`AuthEvent`] describing what the
//! application should do. Responses are always passed on unchanged, so the
//! caller still sees the failure.

use async_trait::async_trait;
use bytes::Bytes;
use http::{Extensions, StatusCode};
use http_body_util::BodyExt;
use reqwest::{Request, Response, ResponseBuilderExt};
use reqwest_middleware::{Middleware, Next, Result};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use url::Url;
use webui_api_core::is_password_expired;

use crate::config::Routes;

/// What the application should do after an auth failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A 401 outside the login page: navigate to `redirect` and log out.
    SessionExpired { url: Url, redirect: String },
    /// A 403 asking for a new password: navigate to `redirect`.
    PasswordChangeRequired { url: Url, redirect: String },
    /// Any other 403: tell the user the action is not allowed.
    Unauthorized { url: Url },
}

impl AuthEvent {
    /// The request that failed.
    pub fn url(&self) -> &Url {
        match self {
            AuthEvent::SessionExpired { url, .. }
            | AuthEvent::PasswordChangeRequired { url, .. }
            | AuthEvent::Unauthorized { url } => url,
        }
    }

    /// Route to navigate to, if any.
    pub fn redirect(&self) -> Option<&str> {
        match self {
            AuthEvent::SessionExpired { redirect, .. }
            | AuthEvent::PasswordChangeRequired { redirect, .. } => Some(redirect),
            AuthEvent::Unauthorized { .. } => None,
        }
    }

    /// Whether the session state must be cleared.
    pub fn requires_logout(&self) -> bool {
        matches!(self, AuthEvent::SessionExpired { .. })
    }
}

/// The path a caller passed to the client, before resolution against the
/// base URL.
#[derive(Debug, Clone)]
pub(crate) struct RequestPath(pub(crate) String);

/// Publishes an [`AuthEvent`] for each 401/403 response.
pub(crate) struct AuthInterceptor {
    routes: Routes,
    base_path: String,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthInterceptor {
    pub(crate) fn new(routes: Routes, base_url: &Url, events: broadcast::Sender<AuthEvent>) -> Self {
        Self {
            routes,
            base_path: base_url.path().trim_end_matches('/').to_owned(),
            events,
        }
    }

    /// Whether the request targeted the login route.
    ///
    /// Uses the path the caller asked for when known, otherwise the URL path
    /// relative to the base URL.
    fn is_login(&self, url: &Url, requested: Option<&RequestPath>) -> bool {
        let path = match requested {
            Some(RequestPath(path)) => path.as_str(),
            None => url
                .path()
                .strip_prefix(self.base_path.as_str())
                .unwrap_or(url.path()),
        };
        path == self.routes.login
    }

    fn emit(&self, event: AuthEvent) {
        info!(?event, "auth event");
        if self.events.send(event).is_err() {
            debug!("no auth event subscribers");
        }
    }

    /// Buffer a 403 body so it can be inspected and still handed on.
    async fn inspect_forbidden(&self, url: Url, response: Response) -> Result<Response> {
        // The rebuilt response keeps the URL it was answered from.
        let mut tagged = http::Response::builder().url(response.url().clone());
        let response: http::Response<reqwest::Body> = response.into();
        let (mut parts, body) = response.into_parts();
        if let Some(extensions) = tagged.extensions_mut() {
            parts.extensions.extend(std::mem::take(extensions));
        }
        let body: Bytes = body
            .collect()
            .await
            .map_err(reqwest_middleware::Error::Reqwest)?
            .to_bytes();

        let data = if body.is_empty() {
            None
        } else {
            match serde_json::from_slice::<Value>(&body) {
                Ok(data) => Some(data),
                Err(error) => {
                    warn!(%url, %error, "403 body is not JSON");
                    None
                }
            }
        };

        let event = if is_password_expired(data.as_ref()) {
            AuthEvent::PasswordChangeRequired {
                url,
                redirect: self.routes.change_password.clone(),
            }
        } else {
            AuthEvent::Unauthorized { url }
        };
        self.emit(event);

        Ok(http::Response::from_parts(parts, reqwest::Body::from(body)).into())
    }
}

#[async_trait]
impl Middleware for AuthInterceptor {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let url = req.url().clone();
        let requested = extensions.get::<RequestPath>().cloned();
        let response = next.run(req, extensions).await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                if self.is_login(&url, requested.as_ref()) {
                    debug!(%url, "401 on login route");
                } else {
                    self.emit(AuthEvent::SessionExpired {
                        url,
                        redirect: self.routes.login.clone(),
                    });
                }
                Ok(response)
            }
            StatusCode::FORBIDDEN => self.inspect_forbidden(url, response).await,
            _ => Ok(response),
        }
    }
}
