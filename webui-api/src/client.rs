//! The shared API client.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use http::{HeaderValue, Method};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;
use url::Url;
use webui_api_backend::Backend;
use webui_api_cache::{CacheMiddleware, CachePolicy};
use webui_api_moka::MokaBackend;

use crate::batch::{self, Spread};
use crate::config::{
    ClientConfig, ConfigError, DEFAULT_EVENTS_CAPACITY, DEFAULT_MAX_ENTRIES, Routes,
    validate_events_capacity,
};
use crate::headers::{AUTH_TOKEN_HEADER, HeaderInjector, SharedHeaders, default_headers};
use crate::interceptor::{AuthEvent, AuthInterceptor, RequestPath};
use crate::{ApiError, ApiResponse, RequestConfig};

/// HTTP client shared by the whole application.
///
/// Build one per session and clone it where needed: clones share the
/// response cache, the auth token and the auth event channel.
///
/// Every request carries `Accept: application/json` and
/// `X-Requested-With: XMLHttpRequest`, sends back session cookies and goes
/// through the response cache and the auth interceptor. Non-2xx responses
/// are returned as [`ApiError::Http`].
#[derive(Clone)]
pub struct ApiClient {
    http: ClientWithMiddleware,
    base_url: Url,
    headers: SharedHeaders,
    events: broadcast::Sender<AuthEvent>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("subscribers", &self.events.receiver_count())
            .finish()
    }
}

impl ApiClient {
    /// Start building a client for `base_url`.
    pub fn builder(base_url: Url) -> ApiClientBuilder {
        ApiClientBuilder::new(base_url)
    }

    /// Build a client from a loaded configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        config.validate()?;
        let mut builder = Self::builder(config.base_url.clone())
            .events_capacity(config.events_capacity)
            .routes(config.routes.clone())
            .cache_policy(config.cache.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        builder = match config.storage.open()? {
            Some(backend) => builder.backend(backend),
            None => builder.without_cache(),
        };
        builder.build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Receive the auth events raised by requests sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Send `X-Auth-Token: token` on every later request from every clone.
    pub fn set_auth_token(&self, token: &str) -> Result<(), ApiError> {
        let mut value = HeaderValue::from_str(token)?;
        value.set_sensitive(true);
        self.headers.insert(AUTH_TOKEN_HEADER, value);
        Ok(())
    }

    /// The token set by [`set_auth_token`](Self::set_auth_token).
    pub fn auth_token(&self) -> Option<String> {
        self.headers
            .get(&AUTH_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok().map(str::to_owned))
    }

    pub async fn get(
        &self,
        path: &str,
        config: Option<RequestConfig>,
    ) -> Result<ApiResponse, ApiError> {
        self.send::<()>(Method::GET, path, None, config).await
    }

    pub async fn delete(
        &self,
        path: &str,
        config: Option<RequestConfig>,
    ) -> Result<ApiResponse, ApiError> {
        self.send::<()>(Method::DELETE, path, None, config).await
    }

    /// POST `payload` as JSON.
    pub async fn post<P: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &P,
        config: Option<RequestConfig>,
    ) -> Result<ApiResponse, ApiError> {
        self.send(Method::POST, path, Some(payload), config).await
    }

    /// PATCH `payload` as JSON.
    pub async fn patch<P: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &P,
        config: Option<RequestConfig>,
    ) -> Result<ApiResponse, ApiError> {
        self.send(Method::PATCH, path, Some(payload), config).await
    }

    /// PUT `payload` as JSON.
    pub async fn put<P: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &P,
        config: Option<RequestConfig>,
    ) -> Result<ApiResponse, ApiError> {
        self.send(Method::PUT, path, Some(payload), config).await
    }

    /// See [`batch::all`].
    pub async fn all<I, F, T>(&self, requests: I) -> Result<Vec<T>, ApiError>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = Result<T, ApiError>>,
    {
        batch::all(requests).await
    }

    /// See [`batch::all_settled`].
    pub async fn all_settled<I, F, T>(&self, requests: I) -> Vec<Result<T, ApiError>>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = Result<T, ApiError>>,
    {
        batch::all_settled(requests).await
    }

    /// See [`batch::spread`].
    pub fn spread<T, Args, F>(
        &self,
        callback: F,
    ) -> impl Fn(Vec<T>) -> Result<F::Output, ApiError> + use<T, Args, F>
    where
        F: Spread<T, Args>,
    {
        batch::spread(callback)
    }

    /// Resolve `path` against the base URL.
    ///
    /// Absolute URLs are used as they are. Anything else is appended to the
    /// base URL, keeping its path prefix.
    pub fn resolve(&self, path: &str) -> Result<Url, ApiError> {
        if let Ok(url) = Url::parse(path) {
            return Ok(url);
        }
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    async fn send<P: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: Option<&P>,
        config: Option<RequestConfig>,
    ) -> Result<ApiResponse, ApiError> {
        let mut url = self.resolve(path)?;
        if let Some(config) = &config {
            config.extend_url(&mut url);
        }
        debug!(%method, %url, "sending request");

        let mut request = self
            .http
            .request(method, url.clone())
            .with_extension(RequestPath(path.to_owned()));
        if let Some(payload) = payload {
            request = request.json(payload);
        }
        if let Some(config) = config {
            request = config.apply(request);
        }

        let response = request.send().await?;
        let response = ApiResponse::read(response, url).await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            debug!(status = %response.status(), url = %response.url(), "request failed");
            Err(ApiError::Http(Box::new(response)))
        }
    }
}

enum CacheBackend {
    Default,
    Custom(Arc<dyn Backend>),
    Disabled,
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    base_url: Url,
    timeout: Option<Duration>,
    events_capacity: usize,
    routes: Routes,
    policy: CachePolicy,
    backend: CacheBackend,
}

impl ApiClientBuilder {
    fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: None,
            events_capacity: DEFAULT_EVENTS_CAPACITY,
            routes: Routes::default(),
            policy: CachePolicy::default(),
            backend: CacheBackend::Default,
        }
    }

    /// Set the whole-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set how many auth events a subscriber may fall behind.
    pub fn events_capacity(mut self, capacity: usize) -> Self {
        self.events_capacity = capacity;
        self
    }

    /// Set the routes carried by auth events.
    pub fn routes(mut self, routes: Routes) -> Self {
        self.routes = routes;
        self
    }

    /// Set the caching policy. Defaults to [`CachePolicy::default`].
    pub fn cache_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Store cached responses in `backend`.
    ///
    /// Defaults to an in-memory cache of 1000 entries.
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = CacheBackend::Custom(backend);
        self
    }

    /// Send every request to the server.
    pub fn without_cache(mut self) -> Self {
        self.backend = CacheBackend::Disabled;
        self
    }

    pub fn build(self) -> Result<ApiClient, ApiError> {
        validate_events_capacity(self.events_capacity)?;
        if self.base_url.cannot_be_a_base() {
            return Err(ConfigError::Invalid(format!(
                "base_url `{}` cannot be a base",
                self.base_url
            ))
            .into());
        }

        let mut client = reqwest::Client::builder()
            .default_headers(default_headers())
            .cookie_store(true);
        if let Some(timeout) = self.timeout {
            client = client.timeout(timeout);
        }
        let client = client.build().map_err(ConfigError::Client)?;

        let (events, _) = broadcast::channel(self.events_capacity);
        let headers = SharedHeaders::default();

        let mut chain = ClientBuilder::new(client)
            .with(HeaderInjector::new(headers.clone()))
            .with(AuthInterceptor::new(
                self.routes,
                &self.base_url,
                events.clone(),
            ));

        let backend: Option<Arc<dyn Backend>> = match self.backend {
            CacheBackend::Default => Some(Arc::new(
                MokaBackend::builder()
                    .max_entries(DEFAULT_MAX_ENTRIES)
                    .label("memory")
                    .build(),
            )),
            CacheBackend::Custom(backend) => Some(backend),
            CacheBackend::Disabled => None,
        };
        if let Some(backend) = backend {
            chain = chain.with(CacheMiddleware::new(backend, self.policy));
        }

        Ok(ApiClient {
            http: chain.build(),
            base_url: self.base_url,
            headers,
            events,
        })
    }
}
