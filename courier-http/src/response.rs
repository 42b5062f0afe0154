//! Response wrapper and settled payloads.

use crate::error::{ClientError, Result};
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Snapshot of an HTTP response.
///
/// Cheap to clone (the body is reference-counted), which lets deduplicated
/// callers share one raw-passthrough result.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: StatusCode,
    status_text: String,
    headers: HeaderMap,
    url: String,
    body: Bytes,
}

impl Response {
    /// Create a response snapshot. Used by custom [`Transport`](crate::Transport)
    /// implementations.
    pub fn new(
        status: StatusCode,
        headers: HeaderMap,
        url: impl Into<String>,
        body: impl Into<Bytes>,
    ) -> Self {
        Self {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            url: url.into(),
            body: body.into(),
        }
    }

    /// Create a response from a reqwest response.
    pub(crate) async fn from_reqwest(response: reqwest::Response) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().to_string();
        let body = response.bytes().await.unwrap_or_default();

        Self {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            url,
            body,
        }
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the status text ("Not Found" for 404, ...).
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Whether the response counts as successful: 2xx or 304.
    pub fn ok(&self) -> bool {
        self.status.is_success() || self.status == StatusCode::NOT_MODIFIED
    }

    /// Get the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|value| value.to_str().ok())
    }

    /// Get the final request URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the response body as bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Get the response body as text (lossy on invalid UTF-8).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the response body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| ClientError::Json(e.to_string()))
    }
}

/// What an orchestrated request settles with.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Body parsed as JSON.
    Json(Value),
    /// Body kept as text because JSON parsing failed.
    Text(String),
    /// Ignored status code: no value.
    Empty,
    /// Raw-passthrough response, body untouched.
    Raw(Response),
}

/// Store envelope for payloads. `Raw` is deliberately absent: raw responses
/// are never persisted.
#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
enum StoredPayload {
    Json(Value),
    Text(String),
    Empty,
}

impl Payload {
    /// Best-effort body parsing: JSON when it parses, raw text otherwise.
    pub fn from_body(text: String) -> Self {
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Payload::Json(value),
            Err(_) => Payload::Text(text),
        }
    }

    /// Decode into a caller type. `Empty` decodes as JSON `null`, so an
    /// `Option<T>` target observes an ignored status as `None`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T> {
        let value = match self {
            Payload::Json(value) => value,
            Payload::Text(text) => Value::String(text),
            Payload::Empty => Value::Null,
            Payload::Raw(_) => {
                return Err(ClientError::Json(
                    "raw response payload cannot be decoded".to_string(),
                ));
            }
        };
        serde_json::from_value(value).map_err(|e| ClientError::Json(e.to_string()))
    }

    /// Serialize for the persistent store. `None` for raw payloads.
    pub(crate) fn to_store_value(&self) -> Option<String> {
        let stored = match self {
            Payload::Json(value) => StoredPayload::Json(value.clone()),
            Payload::Text(text) => StoredPayload::Text(text.clone()),
            Payload::Empty => StoredPayload::Empty,
            Payload::Raw(_) => return None,
        };
        serde_json::to_string(&stored).ok()
    }

    /// Read back a store envelope. `None` when the entry is unreadable.
    pub(crate) fn from_store_value(raw: &str) -> Option<Self> {
        let stored: StoredPayload = serde_json::from_str(raw).ok()?;
        Some(match stored {
            StoredPayload::Json(value) => Payload::Json(value),
            StoredPayload::Text(text) => Payload::Text(text),
            StoredPayload::Empty => Payload::Empty,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_body_parses_json() {
        let payload = Payload::from_body(r#"{"a":1}"#.to_string());
        assert_eq!(payload, Payload::Json(json!({"a": 1})));
    }

    #[test]
    fn test_from_body_falls_back_to_text() {
        let payload = Payload::from_body("ok".to_string());
        assert_eq!(payload, Payload::Text("ok".to_string()));
    }

    #[test]
    fn test_decode_typed() {
        #[derive(Deserialize, PartialEq, Debug)]
        struct User {
            name: String,
        }

        let payload = Payload::from_body(r#"{"name":"Alice"}"#.to_string());
        let user: User = payload.decode().unwrap();
        assert_eq!(user.name, "Alice");
    }

    #[test]
    fn test_decode_empty_as_none() {
        let value: Option<Value> = Payload::Empty.decode().unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_store_round_trip() {
        let payload = Payload::Json(json!({"a": [1, 2]}));
        let stored = payload.to_store_value().unwrap();
        assert_eq!(Payload::from_store_value(&stored), Some(payload));

        let text = Payload::Text("plain".to_string());
        let stored = text.to_store_value().unwrap();
        assert_eq!(Payload::from_store_value(&stored), Some(text));
    }

    #[test]
    fn test_raw_payload_never_stored() {
        let response = Response::new(StatusCode::OK, HeaderMap::new(), "http://x/", "body");
        assert_eq!(Payload::Raw(response).to_store_value(), None);
    }

    #[test]
    fn test_corrupt_store_entry_is_none() {
        assert_eq!(Payload::from_store_value("not an envelope"), None);
    }

    #[test]
    fn test_response_ok_includes_304() {
        let response = Response::new(
            StatusCode::NOT_MODIFIED,
            HeaderMap::new(),
            "http://x/",
            Bytes::new(),
        );
        assert!(response.ok());

        let response = Response::new(
            StatusCode::NOT_FOUND,
            HeaderMap::new(),
            "http://x/",
            Bytes::new(),
        );
        assert!(!response.ok());
        assert_eq!(response.status_text(), "Not Found");
    }
}
