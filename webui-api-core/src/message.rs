//! Redfish `@Message.ExtendedInfo` lookup.
//!
//! Redfish services attach structured diagnostics to response bodies:
//!
//! ```json
//! {
//!   "@Message.ExtendedInfo": [
//!     { "MessageId": "Base.1.8.PasswordChangeRequired", "Severity": "Critical" }
//!   ]
//! }
//! ```
//!
//! A `MessageId` is dot separated: the registry name comes first, the
//! message key comes last and any version segments in between are ignored.

use serde_json::Value;

/// Body field holding the sequence of extended info messages.
pub const EXTENDED_INFO_FIELD: &str = "@Message.ExtendedInfo";

/// Field of a single message holding its dotted identifier.
pub const MESSAGE_ID_FIELD: &str = "MessageId";

/// Registry used when the caller doesn't name one.
pub const DEFAULT_REGISTRY: &str = "Base";

/// Message key sent by the service when the account password has expired.
pub const PASSWORD_CHANGE_REQUIRED: &str = "PasswordChangeRequired";

/// Returns the first extended info message whose registry is `registry`
/// and whose key is `key`.
///
/// A missing body, a missing or non-array `@Message.ExtendedInfo` and
/// messages without a string `MessageId` are all treated as "no match".
/// Identifiers with a single segment compare that segment against both
/// `registry` and `key`.
///
/// ```
/// use serde_json::json;
/// use webui_api_core::find_message_id;
///
/// let body = json!({ "@Message.ExtendedInfo": [{ "MessageId": "Base.1.0.Foo" }] });
/// let message = find_message_id(Some(&body), "Foo", "Base").unwrap();
/// assert_eq!(message["MessageId"], "Base.1.0.Foo");
///
/// assert!(find_message_id(Some(&body), "Foo", "Other").is_none());
/// assert!(find_message_id(None, "Foo", "Base").is_none());
/// ```
pub fn find_message_id<'a>(
    data: Option<&'a Value>,
    key: &str,
    registry: &str,
) -> Option<&'a Value> {
    data?
        .get(EXTENDED_INFO_FIELD)?
        .as_array()?
        .iter()
        .find(|message| matches_message_id(message, key, registry))
}

/// [`find_message_id`] against the [`DEFAULT_REGISTRY`].
pub fn find_base_message_id<'a>(data: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    find_message_id(data, key, DEFAULT_REGISTRY)
}

/// Whether the body carries the `Base` registry `PasswordChangeRequired` message.
pub fn is_password_expired(data: Option<&Value>) -> bool {
    find_base_message_id(data, PASSWORD_CHANGE_REQUIRED).is_some()
}

fn matches_message_id(message: &Value, key: &str, registry: &str) -> bool {
    let Some(id) = message.get(MESSAGE_ID_FIELD).and_then(Value::as_str) else {
        return false;
    };
    let mut words = id.split('.');
    // split always yields at least one item
    let first = words.next().unwrap_or_default();
    let last = words.next_back().unwrap_or(first);
    last == key && first == registry
}
