//! Wire decoding errors.

use thiserror::Error;

/// Errors raised while decoding API payloads.
#[derive(Debug, Error)]
pub enum Error {
    /// The body was not valid JSON for the expected shape.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Serializing a request payload failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Deserialization(err.to_string())
    }
}
