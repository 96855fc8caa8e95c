//! Response envelope.
//!
//! Every API response, successful or not, is a JSON object of the form
//! `{ "data": ..., "message": ..., "statusCode": ... }`. `message` is either a
//! single string or, for validation failures, an array of strings.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Message shown when an error body carries nothing usable.
pub const GENERIC_ERROR_MESSAGE: &str = "Unexpected server error";

/// Server message: a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    /// A single message.
    Text(String),
    /// Several messages, most relevant first.
    List(Vec<String>),
}

impl Message {
    /// The message to surface to a user: the first element of a list, or the
    /// text itself. Empty strings count as absent.
    pub fn primary(&self) -> Option<&str> {
        let text = match self {
            Message::Text(text) => Some(text.as_str()),
            Message::List(items) => items.first().map(String::as_str),
        };
        text.filter(|t| !t.trim().is_empty())
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::Text(text.to_string())
    }
}

/// JSON response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    /// Payload, absent for responses that only report an outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human readable message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// HTTP status code echoed by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl<T> Envelope<T> {
    /// Create a successful envelope around `data`.
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            message: None,
            status_code: Some(200),
        }
    }

    /// Create an envelope without payload.
    pub fn empty(status_code: u16, message: impl Into<Message>) -> Self {
        Self {
            data: None,
            message: Some(message.into()),
            status_code: Some(status_code),
        }
    }

    /// Set the message.
    pub fn with_message(mut self, message: impl Into<Message>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Take the payload, if any.
    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// The primary message, if any.
    pub fn message_text(&self) -> Option<&str> {
        self.message.as_ref().and_then(Message::primary)
    }
}

impl<T: DeserializeOwned> Envelope<T> {
    /// Decode an envelope from a response body.
    ///
    /// An empty body decodes as an envelope with no data, which is what
    /// `204 No Content` responses produce.
    pub fn from_slice(body: &[u8]) -> Result<Self, Error> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self {
                data: None,
                message: None,
                status_code: None,
            });
        }
        Ok(serde_json::from_slice(body)?)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<Message>,
}

/// Derive a user-facing message from an error response body.
///
/// Takes the first element when the body carries a list of messages, the
/// string message otherwise, and falls back to [`GENERIC_ERROR_MESSAGE`] when
/// the body is empty, not JSON, or has no message.
pub fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .and_then(|m| m.primary().map(str::to_string))
        .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_from_list() {
        let body = br#"{"message":["email must be an email","password is too short"],"statusCode":400}"#;
        assert_eq!(error_message(body), "email must be an email");
    }

    #[test]
    fn test_error_message_from_text() {
        let body = br#"{"message":"Invalid credentials","statusCode":401}"#;
        assert_eq!(error_message(body), "Invalid credentials");
    }

    #[test]
    fn test_error_message_fallback() {
        assert_eq!(error_message(b""), GENERIC_ERROR_MESSAGE);
        assert_eq!(error_message(b"<html>Bad gateway</html>"), GENERIC_ERROR_MESSAGE);
        assert_eq!(error_message(br#"{"statusCode":500}"#), GENERIC_ERROR_MESSAGE);
        assert_eq!(error_message(br#"{"message":[]}"#), GENERIC_ERROR_MESSAGE);
        assert_eq!(error_message(br#"{"message":"  "}"#), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_envelope_decode() {
        let body = br#"{"data":[1,2,3],"message":"ok","statusCode":200}"#;
        let envelope: Envelope<Vec<u32>> = Envelope::from_slice(body).unwrap();
        assert_eq!(envelope.data, Some(vec![1, 2, 3]));
        assert_eq!(envelope.message_text(), Some("ok"));
        assert_eq!(envelope.status_code, Some(200));
    }

    #[test]
    fn test_envelope_without_data() {
        let envelope: Envelope<serde_json::Value> =
            Envelope::from_slice(br#"{"message":"Signed out","statusCode":200}"#).unwrap();
        assert!(envelope.data.is_none());

        let empty: Envelope<serde_json::Value> = Envelope::from_slice(b"").unwrap();
        assert!(empty.data.is_none());
        assert!(empty.message.is_none());
    }

    #[test]
    fn test_envelope_rejects_wrong_shape() {
        let result: Result<Envelope<Vec<u32>>, _> = Envelope::from_slice(br#"{"data":"nope"}"#);
        assert!(matches!(result, Err(Error::Deserialization(_))));
    }
}
