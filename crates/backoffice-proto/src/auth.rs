//! Sign-in payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::principal::{Principal, PrincipalKind};

/// Credentials posted to the sign-in endpoint.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful sign-in: the principal and the collection it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInResponse {
    #[serde(rename = "user", alias = "admin", alias = "principal")]
    pub principal: Principal,
    #[serde(rename = "type")]
    pub kind: PrincipalKind,
}

impl SignInResponse {
    /// The principal tagged with the kind reported by the server.
    pub fn into_principal(self) -> Principal {
        let mut principal = self.principal;
        principal.kind = self.kind;
        principal
    }
}
