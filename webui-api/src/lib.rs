//! Shared Redfish HTTP client for BMC web front ends.
//!
//! [`ApiClient`] wraps a `reqwest` client with:
//!
//! - default `Accept` and `X-Requested-With` headers and a cookie store
//! - an `X-Auth-Token` header settable at any time with [`ApiClient::set_auth_token`]
//! - a response cache revalidated with `ETag` (see [`CachePolicy`])
//! - an interceptor turning 401/403 responses into [`AuthEvent`]s
//!
//! ```no_run
//! use webui_api::{ApiClient, AuthEvent, ClientConfig};
//!
//! # async fn run() -> Result<(), webui_api::ApiError> {
//! let config = ClientConfig::from_file("webui.yaml")?;
//! let client = ApiClient::from_config(&config)?;
//!
//! let mut events = client.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         if let Some(route) = event.redirect() {
//!             println!("navigate to {route}");
//!         }
//!     }
//! });
//!
//! client.set_auth_token("token")?;
//! let systems = client.get("/redfish/v1/Systems", None).await?;
//! println!("{:?}", systems.data());
//! # Ok(())
//! # }
//! ```

mod batch;
mod client;
mod config;
mod error;
mod headers;
mod interceptor;
mod response;

pub use batch::{Spread, all, all_settled, spread};
pub use client::{ApiClient, ApiClientBuilder};
pub use config::{
    ClientConfig, ConfigError, DEFAULT_EVENTS_CAPACITY, DEFAULT_MAX_ENTRIES, Routes,
    StorageConfig,
};
pub use error::ApiError;
pub use headers::{AUTH_TOKEN_HEADER, REQUESTED_WITH_HEADER};
pub use interceptor::AuthEvent;
pub use response::{ApiResponse, RequestConfig};

pub use webui_api_backend::Backend;
pub use webui_api_cache::{CachePolicy, CacheStatus};
pub use webui_api_core::{
    ResponseCount, find_base_message_id, find_message_id, get_response_count,
    is_password_expired,
};
