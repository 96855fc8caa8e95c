//! Authentication endpoints.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use backoffice_proto::{Credentials, EntityId, Principal, PrincipalKind, SignInResponse};

use crate::client::Client;
use crate::error::Error;
use crate::request::ApiRequest;

/// Sign-in, sign-out and session lookups.
#[derive(Debug, Clone)]
pub struct AuthApi {
    client: Arc<Client>,
}

impl AuthApi {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// Exchange credentials for a principal. The server sets the session
    /// cookies on success.
    ///
    /// A `401` here is a wrong password, never an expired token.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Principal, Error> {
        let path = self.client.config().endpoints.sign_in.clone();
        let response: SignInResponse = self.client.post_data(&path, credentials).await?;
        let principal = response.into_principal();
        info!(id = %principal.id, kind = %principal.kind, "signed in");
        Ok(principal)
    }

    /// The principal bound to the current session.
    pub async fn who_am_i(&self) -> Result<Principal, Error> {
        let path = self.client.config().endpoints.session_check.clone();
        self.client.get_data(&path).await
    }

    /// End the session on the server.
    pub async fn sign_out(&self) -> Result<(), Error> {
        let path = self.client.config().endpoints.sign_out.clone();
        self.client.request::<Value>(ApiRequest::post(path)).await?;
        info!("signed out");
        Ok(())
    }

    /// Fetch the canonical record of a principal.
    pub async fn principal(&self, kind: PrincipalKind, id: &EntityId) -> Result<Principal, Error> {
        let path = self.client.config().endpoints.principal_record(kind, id);
        let mut principal: Principal = self.client.get_data(&path).await?;
        principal.kind = kind;
        Ok(principal)
    }
}
