use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use serde_json::Value;
use spbridge_domain::{Result, SpError};
use tracing::debug;

use super::transport::{Transport, TransportRequest, TransportResponse};
use crate::errors::InfraError;

/// HTTP client with built-in retry and timeout support.
///
/// Holds two reqwest clients: one with a cookie store for calls made with
/// credentials, one without for anonymous fetches such as local fixtures.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    anonymous: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U, with_credentials: bool) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        if with_credentials {
            self.client.request(method, url)
        } else {
            self.anonymous.request(method, url)
        }
    }

    /// Execute the provided request builder with retry semantics.
    ///
    /// Server errors are retried only for safe methods; a POST that reached
    /// the server is never replayed.
    pub async fn send_raw(&self, builder: RequestBuilder, with_credentials: bool) -> Result<Response> {
        self.send_with_attempts(builder, with_credentials, self.max_attempts).await
    }

    async fn send_with_attempts(
        &self,
        builder: RequestBuilder,
        with_credentials: bool,
        max_attempts: usize,
    ) -> Result<Response> {
        let attempts = max_attempts.max(1);

        for attempt in 0..attempts {
            let cloned_builder = builder.try_clone().ok_or_else(|| {
                SpError::Transport(
                    "request body cannot be cloned; buffer the body to enable retries".into(),
                )
            })?;

            let request = cloned_builder.build().map_err(|err| SpError::from(InfraError::from(err)))?;

            let method = request.method().clone();
            let url = request.url().clone();
            let replayable = is_safe(&method);
            debug!(attempt = attempt + 1, %method, %url, "sending HTTP request");

            let client = if with_credentials { &self.client } else { &self.anonymous };
            match client.execute(request).await {
                Ok(response) => {
                    let status = response.status();
                    debug!(attempt = attempt + 1, %method, %url, %status, "received HTTP response");

                    if status.is_server_error() && replayable && attempt + 1 < attempts {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    return Ok(response);
                }
                Err(err) => {
                    debug!(attempt = attempt + 1, %method, %url, error = %err, "HTTP request failed");

                    if attempt + 1 < attempts && should_retry_error(&err, replayable) {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    return Err(InfraError::from(err).into());
                }
            }
        }

        Err(SpError::Transport("http client exhausted retries without producing a result".into()))
    }

    fn backoff_delay(&self, retry_number: usize) -> Duration {
        let shift = retry_number.saturating_sub(1).min(8) as u32;
        let multiplier = 1u32 << shift;
        self.base_backoff.saturating_mul(multiplier)
    }

    async fn sleep_with_backoff(&self, retry_number: usize) {
        let delay = self.backoff_delay(retry_number);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let url = request.url.clone();
        let with_credentials = request.with_credentials;
        let attempts = if request.retryable { self.max_attempts } else { 1 };
        let mut builder = self.request(request.method, request.url.as_str(), with_credentials);

        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| SpError::InvalidInput(format!("invalid header name {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| SpError::InvalidInput(format!("invalid header value for {name}: {e}")))?;
            headers.append(name, value);
        }
        builder = builder.headers(headers);

        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = self.send_with_attempts(builder, with_credentials, attempts).await?;
        let status = response.status();
        let text = response.text().await.map_err(|err| SpError::from(InfraError::from(err)))?;

        if !status.is_success() {
            return Err(SpError::HttpStatus { status: status.as_u16(), url, body: text });
        }

        Ok(TransportResponse { status: status.as_u16(), body: parse_body(&text) })
    }
}

/// Empty bodies become `Null`, non-JSON bodies a JSON string.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: Option<String>,
    default_headers: Option<HeaderMap>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            user_agent: None,
            default_headers: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let client = self.reqwest_builder().cookie_store(true).build().map_err(into_sp_error)?;
        let anonymous = self.reqwest_builder().build().map_err(into_sp_error)?;

        Ok(HttpClient {
            client,
            anonymous,
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
        })
    }

    fn reqwest_builder(&self) -> reqwest::ClientBuilder {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent.clone());
        }

        if let Some(headers) = &self.default_headers {
            builder = builder.default_headers(headers.clone());
        }

        builder
    }
}

fn into_sp_error(err: reqwest::Error) -> SpError {
    InfraError::from(err).into()
}

fn should_retry_error(err: &reqwest::Error, replayable: bool) -> bool {
    // A refused connection never reached the server
    if err.is_connect() {
        return true;
    }
    replayable && (err.is_timeout() || err.is_request())
}
