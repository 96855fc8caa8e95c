//! Server calls used by the session store and the initializer.

use std::sync::Arc;

use async_trait::async_trait;

use backoffice_client::{AuthApi, Client, Error as ClientError, SettingsApi};
use backoffice_proto::{Principal, Setting};

/// Server operations the session lifecycle depends on.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Fetch the canonical record of `principal`.
    async fn fetch_principal(&self, principal: &Principal) -> Result<Principal, ClientError>;

    /// Fetch the settings of `module`.
    async fn fetch_settings(&self, module: &str) -> Result<Vec<Setting>, ClientError>;
}

/// [`SessionBackend`] over the REST API.
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    auth: AuthApi,
    settings: SettingsApi,
}

impl RemoteBackend {
    pub fn new(client: Arc<Client>) -> Self {
        Self {
            auth: AuthApi::new(client.clone()),
            settings: SettingsApi::new(client),
        }
    }

    pub fn auth(&self) -> &AuthApi {
        &self.auth
    }
}

#[async_trait]
impl SessionBackend for RemoteBackend {
    async fn fetch_principal(&self, principal: &Principal) -> Result<Principal, ClientError> {
        self.auth.principal(principal.kind, &principal.id).await
    }

    async fn fetch_settings(&self, module: &str) -> Result<Vec<Setting>, ClientError> {
        self.settings.by_module(module).await
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;

    /// Scripted backend that counts calls.
    pub struct MockBackend {
        principal: Mutex<Result<Principal, ClientError>>,
        settings: Mutex<Result<Vec<Setting>, ClientError>>,
        delay: Duration,
        settings_delay: Duration,
        principal_calls: AtomicUsize,
        settings_calls: AtomicUsize,
    }

    impl MockBackend {
        pub fn returning(principal: Principal) -> Self {
            Self {
                principal: Mutex::new(Ok(principal)),
                settings: Mutex::new(Ok(Vec::new())),
                delay: Duration::ZERO,
                settings_delay: Duration::ZERO,
                principal_calls: AtomicUsize::new(0),
                settings_calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(error: ClientError) -> Self {
            let backend = Self::returning(Principal::new(
                "0",
                Default::default(),
                backoffice_proto::Role::new("none", "none"),
            ));
            *backend.principal.lock() = Err(error);
            backend
        }

        pub fn with_settings(self, settings: Vec<Setting>) -> Self {
            *self.settings.lock() = Ok(settings);
            self
        }

        pub fn with_failing_settings(self, error: ClientError) -> Self {
            *self.settings.lock() = Err(error);
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn with_settings_delay(mut self, delay: Duration) -> Self {
            self.settings_delay = delay;
            self
        }

        pub fn principal_calls(&self) -> usize {
            self.principal_calls.load(Ordering::SeqCst)
        }

        pub fn settings_calls(&self) -> usize {
            self.settings_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SessionBackend for MockBackend {
        async fn fetch_principal(&self, _principal: &Principal) -> Result<Principal, ClientError> {
            self.principal_calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.principal.lock().clone()
        }

        async fn fetch_settings(&self, _module: &str) -> Result<Vec<Setting>, ClientError> {
            self.settings_calls.fetch_add(1, Ordering::SeqCst);
            if !self.settings_delay.is_zero() {
                tokio::time::sleep(self.settings_delay).await;
            }
            self.settings.lock().clone()
        }
    }
}
