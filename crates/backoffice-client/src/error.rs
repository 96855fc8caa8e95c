//! Client error types.

use thiserror::Error;

/// Message shown when the server could not be reached.
pub const NETWORK_ERROR_MESSAGE: &str = "Could not reach the server. Please try again.";

/// Message shown when the session could not be recovered.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

/// Client errors.
///
/// Errors are cloneable so a single refresh failure can be delivered to every
/// request waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The request never reached the server.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("http error {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Message derived from the response body.
        message: String,
    },

    /// The access token expired and refreshing it failed.
    #[error("session expired: {message}")]
    AuthExpired {
        /// Message reported by the refresh attempt.
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("invalid response: {0}")]
    Decode(String),

    /// The request body could not be serialized.
    #[error("invalid request: {0}")]
    Encode(String),

    /// A response that should carry data had none.
    #[error("response carried no data")]
    MissingData,

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the session could not be recovered.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Error::AuthExpired { .. })
    }

    /// Whether the server rejected the request as unauthenticated.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Text suitable for a user-facing notice.
    pub fn user_message(&self) -> String {
        match self {
            Error::Network(_) => NETWORK_ERROR_MESSAGE.to_string(),
            Error::Http { message, .. } => message.clone(),
            Error::AuthExpired { .. } => SESSION_EXPIRED_MESSAGE.to_string(),
            Error::Decode(_) | Error::MissingData => {
                backoffice_proto::GENERIC_ERROR_MESSAGE.to_string()
            }
            Error::Encode(msg) | Error::Config(msg) => msg.clone(),
        }
    }
}

impl From<backoffice_proto::Error> for Error {
    fn from(err: backoffice_proto::Error) -> Self {
        match err {
            backoffice_proto::Error::Serialization(msg) => Error::Encode(msg),
            backoffice_proto::Error::Deserialization(msg) => Error::Decode(msg),
        }
    }
}
