//! Core error types.

use thiserror::Error;

/// Core errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A server call failed.
    #[error("client error: {0}")]
    Client(#[from] backoffice_client::Error),

    /// Durable storage failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A snapshot could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A required-permission expression could not be parsed.
    #[error("invalid permission expression: {0}")]
    InvalidPermission(String),
}

impl Error {
    /// The underlying client error, if this is one.
    pub fn as_client(&self) -> Option<&backoffice_client::Error> {
        match self {
            Error::Client(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
