//! Wire response type and the adapter that normalizes handler return values.

use serde_json::Value;
use smallvec::SmallVec;
use std::fmt::Display;
use tracing::error;

/// Maximum inline headers before heap allocation. Responses produced by this
/// layer carry very few headers.
pub const MAX_INLINE_HEADERS: usize = 8;

/// Stack-allocated header storage.
pub type HeaderVec = SmallVec<[(String, String); MAX_INLINE_HEADERS]>;

/// Wire response handed back to the host framework.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code (200, 404, 500, ...)
    pub status: u16,
    /// Response headers
    pub headers: HeaderVec,
    /// Raw body bytes
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, headers: HeaderVec, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Empty success response.
    pub fn empty() -> Self {
        Self::new(200, HeaderVec::new(), Vec::new())
    }

    /// Plain-text response with the given status.
    pub fn text(status: u16, body: &str) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((
            "content-type".to_string(),
            "text/plain; charset=utf-8".to_string(),
        ));
        Self::new(status, headers, body.as_bytes().to_vec())
    }

    /// JSON response serialized from a [`Value`].
    pub fn json_value(status: u16, body: &Value) -> Self {
        let bytes = match serde_json::to_vec(body) {
            Ok(b) => b,
            Err(e) => {
                error!(error = %e, "Failed to serialize response body");
                return Self::error(500, "response serialization failed");
            }
        };
        let mut headers = HeaderVec::new();
        headers.push(("content-type".to_string(), "application/json".to_string()));
        Self::new(status, headers, bytes)
    }

    /// JSON error envelope, `{"error": message}`.
    pub fn error(status: u16, message: &str) -> Self {
        Self::json_value(status, &serde_json::json!({ "error": message }))
    }

    pub fn not_found() -> Self {
        Self::error(404, "not found")
    }

    pub fn unauthorized() -> Self {
        Self::error(401, "unauthorized")
    }

    pub fn bad_request(message: &str) -> Self {
        Self::error(400, message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::error(500, message)
    }

    /// Get a header by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header.
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value));
    }
}

/// Value produced by a handler before adaptation into a wire [`Response`].
///
/// Handlers return whichever variant is natural for them; the adapter owns
/// the mapping onto status, headers, and body.
#[derive(Debug, Clone)]
pub enum HandlerValue {
    /// Nothing to say: empty success.
    None,
    /// Pre-built response, passed through unchanged.
    Response(Response),
    /// Rendered as literal `"true"` / `"false"` text.
    Bool(bool),
    /// Serialized as JSON.
    Json(Value),
    /// Body verbatim, text content type.
    Text(String),
    /// Body verbatim, raw bytes.
    Bytes(Vec<u8>),
    /// Fallback: display-string form as body.
    Display(String),
}

impl HandlerValue {
    /// Capture any displayable value as the fallback variant.
    pub fn display<T: Display>(value: T) -> Self {
        HandlerValue::Display(value.to_string())
    }
}

impl From<()> for HandlerValue {
    fn from(_: ()) -> Self {
        HandlerValue::None
    }
}

impl From<bool> for HandlerValue {
    fn from(v: bool) -> Self {
        HandlerValue::Bool(v)
    }
}

impl From<Value> for HandlerValue {
    fn from(v: Value) -> Self {
        HandlerValue::Json(v)
    }
}

impl From<String> for HandlerValue {
    fn from(v: String) -> Self {
        HandlerValue::Text(v)
    }
}

impl From<&str> for HandlerValue {
    fn from(v: &str) -> Self {
        HandlerValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for HandlerValue {
    fn from(v: Vec<u8>) -> Self {
        HandlerValue::Bytes(v)
    }
}

impl From<Response> for HandlerValue {
    fn from(v: Response) -> Self {
        HandlerValue::Response(v)
    }
}

/// Normalize a handler's return value into a wire response.
pub fn adapt(value: HandlerValue) -> Response {
    match value {
        HandlerValue::None => Response::empty(),
        HandlerValue::Response(r) => r,
        HandlerValue::Bool(b) => Response::text(200, if b { "true" } else { "false" }),
        HandlerValue::Json(v) => Response::json_value(200, &v),
        HandlerValue::Text(s) => Response::text(200, &s),
        HandlerValue::Bytes(b) => {
            let mut headers = HeaderVec::new();
            headers.push((
                "content-type".to_string(),
                "application/octet-stream".to_string(),
            ));
            Response::new(200, headers, b)
        }
        HandlerValue::Display(s) => Response::text(200, &s),
    }
}
