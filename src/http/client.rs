//! HTTP client façade
//!
//! Sends handler-built requests through an authenticated transport and
//! returns the parsed JSON body or a typed error:
//! - Authentication artifacts attached per request
//! - JSON `Content-Type` on bodied verbs unless the handler overrides it
//! - Optional client-side rate limiting
//! - Non-2xx bodies handed to the provider's error handler
//!
//! There are no automatic retries; a 429 surfaces as `RateLimited`.

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use super::request::{Request, Response};
use crate::auth::{AuthConfig, Authenticator};
use crate::error::{Error, Result};
use crate::interpreter::ErrorHandler;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL for relative request paths
    pub base_url: Option<String>,
    /// Request timeout; `None` leaves the deadline to the caller
    pub timeout: Option<Duration>,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: None,
            rate_limit: None,
            default_headers: HashMap::new(),
            user_agent: format!("unified-connectors/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// HTTP client bound to one provider
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    authenticator: Authenticator,
    rate_limiter: Option<RateLimiter>,
    error_handler: ErrorHandler,
}

impl HttpClient {
    /// Create a new HTTP client with custom configuration and no auth
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        Self::with_auth(config, AuthConfig::None)
    }

    /// Create a client that attaches the given auth artifact
    pub fn with_auth(config: HttpClientConfig, auth_config: AuthConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self::with_transport(client, config, auth_config))
    }

    /// Wrap a caller-supplied transport, e.g. one that already carries an
    /// OAuth2 token or signs requests itself
    pub fn with_transport(client: Client, config: HttpClientConfig, auth_config: AuthConfig) -> Self {
        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);
        Self {
            authenticator: Authenticator::with_client(auth_config, client.clone()),
            client,
            config,
            rate_limiter,
            error_handler: ErrorHandler::default(),
        }
    }

    /// Set the default error handler
    #[must_use]
    pub fn with_error_handler(mut self, error_handler: ErrorHandler) -> Self {
        self.error_handler = error_handler;
        self
    }

    /// Replace the base URL for relative paths
    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.config.base_url = Some(base_url.into());
    }

    /// Base URL for relative paths
    pub fn base_url(&self) -> Option<&str> {
        self.config.base_url.as_deref()
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// Make a GET request
    pub async fn get(&self, url: &str) -> Result<Option<Value>> {
        self.body_of(Request::get(url)).await
    }

    /// Make a POST request
    pub async fn post(&self, url: &str, body: Value) -> Result<Option<Value>> {
        self.body_of(Request::post(url, body)).await
    }

    /// Make a PUT request
    pub async fn put(&self, url: &str, body: Value) -> Result<Option<Value>> {
        self.body_of(Request::put(url, body)).await
    }

    /// Make a PATCH request
    pub async fn patch(&self, url: &str, body: Value) -> Result<Option<Value>> {
        self.body_of(Request::patch(url, body)).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, url: &str) -> Result<Option<Value>> {
        self.body_of(Request::delete(url)).await
    }

    async fn body_of(&self, request: Request) -> Result<Option<Value>> {
        Ok(self.execute(&request).await?.body)
    }

    /// Send a request using the client's default error handler
    pub async fn execute(&self, request: &Request) -> Result<Response> {
        self.execute_with(request, &self.error_handler).await
    }

    /// Send a request, interpreting non-2xx bodies with `errors`
    pub async fn execute_with(&self, request: &Request, errors: &ErrorHandler) -> Result<Response> {
        let url = self.build_url(&request.url)?;

        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }

        let mut req = self
            .client
            .request(request.method.into(), url.clone());

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if let Some(ref body) = request.body {
            if request.header_value("Content-Type").is_none() {
                req = req.header(CONTENT_TYPE, "application/json");
            }
            req = req.body(serde_json::to_vec(body)?);
        }

        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        req = self.authenticator.apply(req, request.method, &url).await?;

        debug!("Sending request: {} {}", request.method, redact(&url));
        let response = req.send().await?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let bytes = response.bytes().await?;

        if !(200..300).contains(&status) {
            warn!(
                "Request failed with {}: {} {}",
                status,
                request.method,
                redact(&url)
            );
            return Err(errors.interpret(status, content_type.as_deref(), &bytes));
        }

        let body = if status == 204 || bytes.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            Some(serde_json::from_slice::<Value>(&bytes).map_err(|e| {
                Error::unmarshal(format!("{} {}: {e}", request.method, url.path()))
            })?)
        };

        Ok(Response {
            status,
            headers,
            body,
        })
    }

    /// Build full URL from path
    fn build_url(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(Url::parse(path)?);
        }

        let full = match &self.config.base_url {
            Some(base) => {
                let base = base.trim_end_matches('/');
                let path = path.trim_start_matches('/');
                format!("{base}/{path}")
            }
            None => path.to_string(),
        };
        Ok(Url::parse(&full)?)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("authenticator", &self.authenticator)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// URL without its query string, for logging
fn redact(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}
