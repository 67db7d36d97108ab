//! REST client adapter
//!
//! Everything above this layer talks to the backend through [`ApiClient`],
//! which exchanges parsed JSON bodies. [`HttpApiClient`] is the reqwest-backed
//! implementation that attaches the session's bearer token.

use async_trait::async_trait;
use serde_json::Value;

pub mod http;

pub use http::HttpApiClient;

/// Failure of a backend call
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// The server answered with a non-success status
    #[error("HTTP {status}{}", message_suffix(.message))]
    Http { status: u16, message: Option<String> },

    /// The request never produced a response (connect, timeout, TLS)
    #[error("Request failed: {0}")]
    Transport(String),

    /// The response body was not the JSON we expected
    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

impl ApiError {
    /// Human-readable message supplied by the server, if any
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Http { message, .. } => message.as_deref().filter(|m| !m.is_empty()),
            _ => None,
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Minimal JSON REST surface
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, ApiError>;

    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    async fn post(&self, path: &str, body: Value) -> Result<Value, ApiError>;

    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    async fn put(&self, path: &str, body: Value) -> Result<Value, ApiError>;

    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    async fn delete(&self, path: &str) -> Result<Value, ApiError>;
}

/// Pull the error message out of a failure body
///
/// Servers put it either at `message` or under `data.message`.
#[must_use]
pub fn extract_error_message(body: &Value) -> Option<String> {
    body.get("message")
        .or_else(|| body.get("data")?.get("message"))
        .or_else(|| body.get("error"))
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(ToString::to_string)
}

/// Strip a `{ "data": ... }` envelope if present
#[must_use]
pub fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_error_message_shapes() {
        assert_eq!(
            extract_error_message(&json!({ "message": "Title required" })).as_deref(),
            Some("Title required")
        );
        assert_eq!(
            extract_error_message(&json!({ "data": { "message": "Not yours" } })).as_deref(),
            Some("Not yours")
        );
        assert_eq!(extract_error_message(&json!({ "message": "  " })), None);
        assert_eq!(extract_error_message(&json!("plain")), None);
    }

    #[test]
    fn test_api_error_display_and_message() {
        let err = ApiError::Http {
            status: 422,
            message: Some("Price must be positive".into()),
        };
        assert_eq!(err.to_string(), "HTTP 422: Price must be positive");
        assert_eq!(err.server_message(), Some("Price must be positive"));

        let bare = ApiError::Http {
            status: 500,
            message: None,
        };
        assert_eq!(bare.to_string(), "HTTP 500");
        assert_eq!(ApiError::Transport("timeout".into()).server_message(), None);
    }

    #[test]
    fn test_unwrap_envelope() {
        assert_eq!(unwrap_envelope(json!({ "data": [1, 2] })), json!([1, 2]));
        assert_eq!(unwrap_envelope(json!([3])), json!([3]));
        assert_eq!(unwrap_envelope(json!({ "id": 1 })), json!({ "id": 1 }));
    }
}
