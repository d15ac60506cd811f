//! Request and response values passed between handlers and the client

use crate::error::{Error, Result};
use crate::types::Method;
use reqwest::header::HeaderMap;
use serde_json::Value;

/// A fully formed request produced by a handler's build step
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Absolute URL, or a path joined onto the client's base URL
    pub url: String,
    /// Extra headers; a `Content-Type` here overrides the JSON default
    pub headers: Vec<(String, String)>,
    /// JSON body
    pub body: Option<Value>,
}

impl Request {
    /// Create a request without a body
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// POST request with a JSON body
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, url).json(body)
    }

    /// PUT request with a JSON body
    pub fn put(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, url).json(body)
    }

    /// PATCH request with a JSON body
    pub fn patch(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, url).json(body)
    }

    /// DELETE request
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Value of a header (case-insensitive)
    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// A successful response
#[derive(Debug, Clone, Default)]
pub struct Response {
    /// HTTP status
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Parsed JSON body; `None` for 204 or an empty body
    pub body: Option<Value>,
}

impl Response {
    /// Body, or `EmptyResponse` when there is none
    pub fn require_body(&self) -> Result<&Value> {
        self.body.as_ref().ok_or(Error::EmptyResponse)
    }

    /// Body, or `Value::Null` when there is none
    pub fn body_or_null(&self) -> &Value {
        self.body.as_ref().unwrap_or(&Value::Null)
    }
}
