//! Helpers for the backend's response conventions.
//!
//! The backend wraps payloads as `{ success, data, timestamp?, message? }`
//! on most routes but not all, and reports errors with a `message` that is
//! either a string or a validation object `{ message: [..] }`.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ApiError;

/// Strip the `{ data: ... }` envelope if present.
pub fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) if matches!(map.get("data"), Some(Value::Object(_))) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        Value::Object(mut map)
            if map.contains_key("success") && map.contains_key("data") =>
        {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Decode a payload, unwrapping the envelope first.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(unwrap_data(value))
        .map_err(|e| ApiError::InvalidResponse(format!("Unexpected payload: {}", e)))
}

/// The most specific human-readable message in an error body.
///
/// Checked in order: `message.message[0]`, `message.message`, `message`,
/// `data.message`, `error`.
pub fn server_message(body: &Value) -> Option<String> {
    let message = body.get("message");

    let nested = message.and_then(|m| m.get("message"));
    let candidates = [
        nested.and_then(|n| n.get(0)),
        nested,
        message,
        body.get("data").and_then(|d| d.get("message")),
        body.get("error"),
    ];

    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_data() {
        assert_eq!(
            unwrap_data(json!({ "success": true, "data": { "total": 3 } })),
            json!({ "total": 3 })
        );
        assert_eq!(
            unwrap_data(json!({ "success": true, "data": [1, 2] })),
            json!([1, 2])
        );
        // Page payloads carry a data array without an envelope
        let page = json!({ "data": [1], "total": 1, "page": 1 });
        assert_eq!(unwrap_data(page.clone()), page);
        assert_eq!(unwrap_data(json!({ "accessToken": "t" })), json!({ "accessToken": "t" }));
    }

    #[test]
    fn test_server_message_precedence() {
        let validation = json!({ "message": { "message": ["email must be an email", "x"] } });
        assert_eq!(server_message(&validation).as_deref(), Some("email must be an email"));

        let nested = json!({ "message": { "message": "Customer exists" } });
        assert_eq!(server_message(&nested).as_deref(), Some("Customer exists"));

        let flat = json!({ "message": "Bad code", "error": "Bad Request" });
        assert_eq!(server_message(&flat).as_deref(), Some("Bad code"));

        let wrapped = json!({ "data": { "message": "Code expired" } });
        assert_eq!(server_message(&wrapped).as_deref(), Some("Code expired"));

        let error_only = json!({ "error": "Forbidden" });
        assert_eq!(server_message(&error_only).as_deref(), Some("Forbidden"));

        assert_eq!(server_message(&json!({ "message": "" })), None);
        assert_eq!(server_message(&json!(null)), None);
    }
}
