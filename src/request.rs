//! Host-supplied request abstraction.
//!
//! The host framework owns the network loop and body transport; this type is
//! the boundary it hands over. On top of the raw parts the request exposes
//! two lazily derived, read-only views used by the parameter binder: the
//! parsed JSON body (empty if absent or invalid) and normalized single-value
//! query/form access.

use http::Method;
use once_cell::sync::OnceCell;
use serde_json::Value;
use smallvec::SmallVec;
use tracing::warn;
use url::form_urlencoded;

/// Maximum inline headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

pub type RequestHeaderVec = SmallVec<[(String, String); MAX_INLINE_HEADERS]>;

#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    query_string: String,
    headers: RequestHeaderVec,
    body: Vec<u8>,
    // Derived views, parsed at most once per request.
    json: OnceCell<Value>,
    form: OnceCell<Vec<(String, String)>>,
    query: OnceCell<Vec<(String, String)>>,
}

impl Request {
    pub fn builder(method: Method, path: &str) -> RequestBuilder {
        RequestBuilder {
            method,
            path: path.to_string(),
            query_string: String::new(),
            headers: RequestHeaderVec::new(),
            body: Vec::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Get a header by name (case-insensitive per RFC 7230).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Content type without parameters (`application/json; charset=utf-8`
    /// yields `application/json`).
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
            .map(|v| v.split(';').next().unwrap_or(v).trim())
    }

    pub fn is_json(&self) -> bool {
        self.content_type() == Some("application/json")
    }

    /// Derived view: the request body parsed as JSON.
    ///
    /// Empty object when the content type is not JSON, the body is empty, or
    /// deserialization fails; a failed parse is logged and never aborts the
    /// request.
    pub fn json(&self) -> &Value {
        self.json.get_or_init(|| {
            if !self.is_json() || self.body.is_empty() {
                return Value::Object(serde_json::Map::new());
            }
            match serde_json::from_slice(&self.body) {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "Deserialize request body failed");
                    Value::Object(serde_json::Map::new())
                }
            }
        })
    }

    /// Derived view: first query-string value for `name`, percent-decoded.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .get_or_init(|| {
                form_urlencoded::parse(self.query_string.as_bytes())
                    .into_owned()
                    .collect()
            })
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Derived view: first form-encoded body value for `name`.
    ///
    /// Only populated for form-encoded bodies; JSON bodies surface through
    /// [`Request::json`] instead.
    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .get_or_init(|| {
                if self.content_type() == Some("application/x-www-form-urlencoded") {
                    form_urlencoded::parse(&self.body).into_owned().collect()
                } else {
                    Vec::new()
                }
            })
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

pub struct RequestBuilder {
    method: Method,
    path: String,
    query_string: String,
    headers: RequestHeaderVec,
    body: Vec<u8>,
}

impl RequestBuilder {
    pub fn query(mut self, query_string: &str) -> Self {
        self.query_string = query_string.trim_start_matches('?').to_string();
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn json_body(self, value: &Value) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_default();
        self.header("content-type", "application/json").body(body)
    }

    pub fn form_body(self, pairs: &[(&str, &str)]) -> Self {
        let mut encoder = form_urlencoded::Serializer::new(String::new());
        for (k, v) in pairs {
            encoder.append_pair(k, v);
        }
        let body = encoder.finish().into_bytes();
        self.header("content-type", "application/x-www-form-urlencoded")
            .body(body)
    }

    pub fn build(self) -> Request {
        Request {
            method: self.method,
            path: self.path,
            query_string: self.query_string,
            headers: self.headers,
            body: self.body,
            json: OnceCell::new(),
            form: OnceCell::new(),
            query: OnceCell::new(),
        }
    }
}
