//! Request descriptors, call options and outcomes

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// HTTP verbs used against the platform API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            other => Err(format!("unsupported HTTP method: {}", other)),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Request body in its declared encoding
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(serde_json::Value),
    /// Pre-encoded YAML document, sent verbatim
    Yaml(String),
    /// The caller's value could not be serialized; nothing will be sent
    Unencodable(String),
}

impl Body {
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Body::Json(_) => Some("application/json"),
            Body::Yaml(_) => Some("application/x-yaml"),
            Body::Empty | Body::Unencodable(_) => None,
        }
    }

    /// Bytes to put on the wire
    pub(crate) fn encode(&self) -> Result<Option<Vec<u8>>, String> {
        match self {
            Body::Empty => Ok(None),
            Body::Json(value) => serde_json::to_vec(value)
                .map(Some)
                .map_err(|e| e.to_string()),
            Body::Yaml(text) => Ok(Some(text.clone().into_bytes())),
            Body::Unencodable(reason) => Err(reason.clone()),
        }
    }
}

/// One call to the platform API
///
/// # Example
///
/// ```rust
/// use keel_platform::{Method, Request};
/// use serde_json::json;
///
/// let request = Request::post("/api/v1/environments").json(&json!({"name": "dev"}));
/// assert_eq!(request.method(), Method::Post);
/// assert_eq!(request.body().content_type(), Some("application/json"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    path: String,
    body: Body,
}

impl Request {
    /// `path` is server-relative with identifiers already interpolated
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: Body::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Attach a JSON body
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.body = match serde_json::to_value(value) {
            Ok(json) => Body::Json(json),
            Err(e) => Body::Unencodable(e.to_string()),
        };
        self
    }

    /// Attach a value serialized as YAML
    pub fn yaml<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.body = match serde_yaml_ng::to_string(value) {
            Ok(text) => Body::Yaml(text),
            Err(e) => Body::Unencodable(e.to_string()),
        };
        self
    }

    /// Attach an already encoded YAML document
    pub fn yaml_text(mut self, text: impl Into<String>) -> Self {
        self.body = Body::Yaml(text.into());
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> &Body {
        &self.body
    }
}

/// Call-time behaviour flags
///
/// The only flag is the set of non-2xx statuses the caller expects and wants
/// treated as success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpOptions {
    allowed: Vec<u16>,
}

impl HttpOptions {
    /// Treat 404 as success (removal checks, deletes)
    pub fn allow_404() -> Self {
        Self::default().allow(404)
    }

    /// Treat `status` as success
    pub fn allow(mut self, status: u16) -> Self {
        if !self.allowed.contains(&status) {
            self.allowed.push(status);
        }
        self
    }

    pub fn is_allowed(&self, status: u16) -> bool {
        self.allowed.contains(&status)
    }
}

/// Classified result of one executor call
///
/// `status` is `None` when no response was received. `value` is only set
/// for a 2xx response whose body decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    ok: bool,
    status: Option<u16>,
    body: String,
    value: Option<T>,
}

impl<T> Outcome<T> {
    pub(crate) fn success(status: u16, body: String, value: Option<T>) -> Self {
        Self {
            ok: true,
            status: Some(status),
            body,
            value,
        }
    }

    pub(crate) fn failure(status: Option<u16>, body: String) -> Self {
        Self {
            ok: false,
            status,
            body,
            value: None,
        }
    }

    pub fn ok(&self) -> bool {
        self.ok
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_status(&self, status: u16) -> bool {
        self.status == Some(status)
    }

    /// Raw response body, empty when no response was received
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<T> {
        self.value
    }
}
