//! Wiring of the client, stores and initializer for one CLI invocation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, warn};

use backoffice_client::{Client, ClientEvent, HttpTransport, NoticeLevel};
use backoffice_core::{
    AppInitializer, FileStorage, KeyValueStorage, RemoteBackend, SessionStore, SettingsStore,
};

use crate::config::CliConfig;
use crate::formatter::format_event;

/// Storage key of the exported cookie jar.
pub const COOKIES_KEY: &str = "cookies";

/// How long to wait for the sign-in redirect after a session-expired notice.
const REDIRECT_GRACE: Duration = Duration::from_millis(100);

pub struct App {
    pub backend: Arc<RemoteBackend>,
    pub session: Arc<SessionStore>,
    pub settings: Arc<SettingsStore>,
    pub initializer: AppInitializer,
    transport: Arc<HttpTransport>,
    storage: Arc<FileStorage>,
    events: broadcast::Receiver<ClientEvent>,
}

impl App {
    /// Build the application state and restore cookies from the last run.
    pub async fn open(config: &CliConfig) -> anyhow::Result<Self> {
        let client_config = config.client_config()?;
        let transport = Arc::new(HttpTransport::new(&client_config)?);
        let client = Arc::new(Client::with_transport(client_config, transport.clone()));
        let events = client.subscribe();

        let storage = Arc::new(FileStorage::new(&config.state_dir));
        let session = Arc::new(SessionStore::new(storage.clone()));
        let settings = Arc::new(SettingsStore::new(storage.clone()));
        let backend = Arc::new(RemoteBackend::new(client.clone()));
        let initializer = AppInitializer::new(session.clone(), settings.clone(), backend.clone());

        // Detached: lives until the runtime shuts down.
        let _ = session.clear_on_expiry(client.subscribe());

        if let Some(cookies) = storage
            .load(COOKIES_KEY)
            .await
            .context("failed to read stored cookies")?
        {
            transport.restore_cookies(cookies.trim());
            debug!("restored session cookies");
        }

        Ok(Self {
            backend,
            session,
            settings,
            initializer,
            transport,
            storage,
            events,
        })
    }

    /// Save the cookie jar for the next run.
    pub async fn save_cookies(&self) -> anyhow::Result<()> {
        match self.transport.cookie_header() {
            Some(header) => self.storage.save(COOKIES_KEY, &header).await?,
            None => self.storage.remove(COOKIES_KEY).await?,
        }
        Ok(())
    }

    /// Drop the stored cookies.
    pub async fn forget_cookies(&self) -> anyhow::Result<()> {
        self.storage.remove(COOKIES_KEY).await?;
        Ok(())
    }

    /// Print pending client events to stderr.
    pub async fn flush_events(&mut self) {
        let mut expecting_redirect = false;
        loop {
            let event = match self.events.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "missed client events");
                    continue;
                }
                Err(TryRecvError::Empty) if expecting_redirect => {
                    match tokio::time::timeout(REDIRECT_GRACE, self.events.recv()).await {
                        Ok(Ok(event)) => event,
                        _ => break,
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            };

            expecting_redirect = match &event {
                ClientEvent::Notice(notice) => notice.level == NoticeLevel::SessionExpired,
                ClientEvent::Redirect { .. } => false,
            };
            eprintln!("{}", format_event(&event));
        }
    }
}
