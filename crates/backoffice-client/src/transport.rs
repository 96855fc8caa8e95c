//! Transport layer.
//!
//! [`Transport`] is the seam between the refresh protocol and the network.
//! [`HttpTransport`] is the reqwest implementation used in production; tests
//! substitute scripted transports.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::Url;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::request::ApiRequest;

/// A response as received, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a request and returns whatever the server answered.
///
/// Implementations return `Err` only when no response was received; error
/// statuses are returned as `Ok` responses.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, Error>;
}

/// reqwest-backed transport.
///
/// Keeps a cookie jar so cookie-based sessions (access and refresh cookies
/// set by the sign-in and refresh endpoints) are sent with every request.
/// The jar can be exported and restored for processes that do not outlive a
/// single command.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    origin: Url,
    cookies: Arc<Jar>,
}

impl HttpTransport {
    /// Build a transport from the client configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        config.validate()?;

        let origin: Url = config
            .base_url
            .parse()
            .map_err(|e| Error::Config(format!("invalid base URL '{}': {}", config.base_url, e)))?;

        let cookies = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .cookie_provider(cookies.clone())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            origin,
            cookies,
        })
    }

    /// Cookies that would be sent to the API, as a `Cookie` header value.
    pub fn cookie_header(&self) -> Option<String> {
        self.cookies
            .cookies(&self.origin)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    /// Load cookies previously returned by [`cookie_header`](Self::cookie_header).
    pub fn restore_cookies(&self, header: &str) {
        for pair in header.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            self.cookies.add_cookie_str(pair, &self.origin);
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, Error> {
        let mut builder = self
            .http
            .request(request.method.into(), self.url(&request.path));

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response body: {}", e)))?;

        Ok(RawResponse::new(status, body.to_vec()))
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .finish()
    }
}
