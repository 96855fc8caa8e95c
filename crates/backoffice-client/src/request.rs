//! Outbound request descriptions.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::Error;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Put => write!(f, "PUT"),
            Method::Patch => write!(f, "PATCH"),
            Method::Delete => write!(f, "DELETE"),
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

/// A request relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path starting with `/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// Create a request.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        Self {
            method,
            path,
            query: Vec::new(),
            body: None,
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

    /// Attach a JSON body.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, Error> {
        let value = serde_json::to_value(body).map_err(|e| Error::Encode(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Add a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// One issue of a request, with the number of times it has been retried.
///
/// Retrying produces a new `Attempt`; the request itself is shared and never
/// modified.
#[derive(Debug, Clone)]
pub struct Attempt {
    request: Arc<ApiRequest>,
    retry_count: u32,
}

impl Attempt {
    /// First issue of `request`.
    pub fn new(request: ApiRequest) -> Self {
        Self {
            request: Arc::new(request),
            retry_count: 0,
        }
    }

    pub fn request(&self) -> &ApiRequest {
        &self.request
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Whether this attempt is itself a retry.
    pub fn is_retry(&self) -> bool {
        self.retry_count > 0
    }

    /// The next attempt of the same request.
    pub fn retried(&self) -> Self {
        Self {
            request: Arc::clone(&self.request),
            retry_count: self.retry_count + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_is_normalized() {
        assert_eq!(ApiRequest::get("auth/me").path, "/auth/me");
        assert_eq!(ApiRequest::get("/auth/me").path, "/auth/me");
    }

    #[test]
    fn test_retried_attempt_shares_request() {
        let first = Attempt::new(ApiRequest::post("/roles").with_query("page", "2"));
        let second = first.retried();

        assert!(!first.is_retry());
        assert!(second.is_retry());
        assert_eq!(second.retry_count(), 1);
        assert_eq!(first.retry_count(), 0);
        assert!(Arc::ptr_eq(&first.request, &second.request));
    }

    #[test]
    fn test_json_body() {
        let request = ApiRequest::post("/auth/sign-in")
            .with_json(&serde_json::json!({"email": "a@b.c"}))
            .unwrap();
        assert_eq!(request.body.unwrap()["email"], "a@b.c");
        assert_eq!(Method::Patch.to_string(), "PATCH");
    }
}
