//! Call shapes exchanged with the transport

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use spbridge_domain::Result;

/// A call described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// HTTP method on the wire.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Headers in insertion order.
    pub headers: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Send the session cookies with the request.
    pub with_credentials: bool,
    /// Allow the transport to retry the call on transient failures.
    pub retryable: bool,
}

impl TransportRequest {
    /// Call with no headers, body or credentials.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            with_credentials: false,
            retryable: true,
        }
    }

    /// GET call.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// POST call.
    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Append a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the JSON body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Send the session cookies.
    #[must_use]
    pub fn with_credentials(mut self) -> Self {
        self.with_credentials = true;
        self
    }

    /// Send the call exactly once, whatever the transport's retry policy.
    #[must_use]
    pub fn single_attempt(mut self) -> Self {
        self.retryable = false;
        self
    }

    /// First header value matching `name`, case-insensitively.
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A settled call. Only successful statuses reach the caller as a response;
/// everything else is an error.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON body; `Null` when empty, a string when not JSON.
    pub body: Value,
}

/// Executes calls against the platform.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and wait for it to settle.
    ///
    /// # Errors
    /// `SpError::Transport` when no response was produced and
    /// `SpError::HttpStatus` for non-success statuses.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}
