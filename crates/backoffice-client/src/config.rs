//! Client configuration.

use std::time::Duration;

use backoffice_proto::{EntityId, PrincipalKind};

use crate::error::Error;

/// Environment variable holding the API base URL.
pub const API_URL_ENV: &str = "BACKOFFICE_API_URL";

/// Environment variable overriding the request timeout, in milliseconds.
pub const API_TIMEOUT_ENV: &str = "BACKOFFICE_API_TIMEOUT_MS";

/// Default overall request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Delay between the session-expired notice and the redirect to sign-in.
pub const DEFAULT_EXPIRY_REDIRECT_DELAY: Duration = Duration::from_secs(2);

/// Default route of the sign-in page.
pub const DEFAULT_SIGN_IN_ROUTE: &str = "/auth/login";

/// API paths used by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Credentials in, principal out.
    pub sign_in: String,
    /// Returns the principal bound to the current session cookie.
    pub session_check: String,
    pub sign_out: String,
    /// Exchanges the refresh cookie for a new access cookie. No body.
    pub refresh: String,
    /// Prefix of the settings-by-module endpoint; the module name is appended.
    pub settings_by_module: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            sign_in: "/auth/sign-in".to_string(),
            session_check: "/auth/me".to_string(),
            sign_out: "/auth/sign-out".to_string(),
            refresh: "/auth/refresh".to_string(),
            settings_by_module: "/settings/module".to_string(),
        }
    }
}

impl Endpoints {
    /// Whether `path` is the sign-in endpoint.
    pub fn is_sign_in(&self, path: &str) -> bool {
        strip_query(path) == self.sign_in
    }

    /// Whether `path` is the session-check endpoint.
    pub fn is_session_check(&self, path: &str) -> bool {
        strip_query(path) == self.session_check
    }

    /// Path of the settings for `module`.
    pub fn settings_for(&self, module: &str) -> String {
        format!("{}/{}", self.settings_by_module.trim_end_matches('/'), module)
    }

    /// Path of the canonical record of a principal.
    pub fn principal_record(&self, kind: PrincipalKind, id: &EntityId) -> String {
        format!("/{}/{}", kind.collection(), id)
    }
}

fn strip_query(path: &str) -> &str {
    path.split_once('?').map(|(p, _)| p).unwrap_or(path)
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API (e.g., "https://api.example.com/v1").
    pub base_url: String,

    /// Overall request timeout.
    pub timeout: Duration,

    /// Delay before redirecting to sign-in after a session expires.
    pub expiry_redirect_delay: Duration,

    /// API paths.
    pub endpoints: Endpoints,

    /// Route the UI navigates to when a session expires.
    pub sign_in_route: String,

    /// User agent sent with every request.
    pub user_agent: String,
}

impl ClientConfig {
    /// Create a new client configuration for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            expiry_redirect_delay: DEFAULT_EXPIRY_REDIRECT_DELAY,
            endpoints: Endpoints::default(),
            sign_in_route: DEFAULT_SIGN_IN_ROUTE.to_string(),
            user_agent: format!("backoffice-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Build a configuration from the environment.
    ///
    /// Fails when [`API_URL_ENV`] is unset or empty rather than guessing a
    /// default backend.
    pub fn from_env() -> Result<Self, Error> {
        let base_url = std::env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::Config(format!("{} is not set", API_URL_ENV)))?;

        let mut config = Self::new(base_url.trim());

        if let Ok(raw) = std::env::var(API_TIMEOUT_ENV) {
            let millis: u64 = raw.trim().parse().map_err(|_| {
                Error::Config(format!("{} must be a number of milliseconds, got '{}'", API_TIMEOUT_ENV, raw))
            })?;
            config.timeout = Duration::from_millis(millis);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<(), Error> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("base URL is empty".to_string()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the delay between the session-expired notice and the redirect.
    pub fn with_expiry_redirect_delay(mut self, delay: Duration) -> Self {
        self.expiry_redirect_delay = delay;
        self
    }

    /// Replace the API paths.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Set the sign-in route used for redirects.
    pub fn with_sign_in_route(mut self, route: impl Into<String>) -> Self {
        self.sign_in_route = route.into();
        self
    }

    /// Set the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
