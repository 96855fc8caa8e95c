//! Events published by the client for the UI layer.

use crate::error::Error;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
    /// The session ended and could not be recovered.
    SessionExpired,
}

/// A dismissible, user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn session_expired() -> Self {
        Self {
            level: NoticeLevel::SessionExpired,
            message: crate::error::SESSION_EXPIRED_MESSAGE.to_string(),
        }
    }

    /// The notice a failed operation should surface.
    pub fn from_error(error: &Error) -> Self {
        if error.is_auth_expired() {
            Self::session_expired()
        } else {
            Self::error(error.user_message())
        }
    }
}

/// Something the UI should react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Show a notice.
    Notice(Notice),
    /// Navigate to a route.
    Redirect { to: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_from_error() {
        let notice = Notice::from_error(&Error::AuthExpired {
            message: "expired".into(),
        });
        assert_eq!(notice.level, NoticeLevel::SessionExpired);

        let notice = Notice::from_error(&Error::Http {
            status: 409,
            message: "Role already exists".into(),
        });
        assert_eq!(notice, Notice::error("Role already exists"));
    }
}
