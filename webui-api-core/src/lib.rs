#![warn(missing_docs)]
//! Shared helpers for the webui-api client.
//!
//! This crate has no I/O. It inspects Redfish response bodies and
//! summarizes batches of settled requests:
//!
//! - [`find_message_id`] - locate an `@Message.ExtendedInfo` entry by registry and key
//! - [`is_password_expired`] - detect the `Base...PasswordChangeRequired` signal
//! - [`get_response_count`] - count successes and failures in a settled batch
//!
//! ```
//! use serde_json::json;
//! use webui_api_core::{find_message_id, is_password_expired};
//!
//! let body = json!({
//!     "@Message.ExtendedInfo": [
//!         { "MessageId": "Base.1.8.PasswordChangeRequired" }
//!     ]
//! });
//!
//! assert!(is_password_expired(Some(&body)));
//! assert!(find_message_id(Some(&body), "PasswordChangeRequired", "Base").is_some());
//! ```

pub mod message;
mod response_count;

pub use message::{
    DEFAULT_REGISTRY, EXTENDED_INFO_FIELD, MESSAGE_ID_FIELD, PASSWORD_CHANGE_REQUIRED,
    find_base_message_id, find_message_id, is_password_expired,
};
pub use response_count::{ResponseCount, get_response_count};
