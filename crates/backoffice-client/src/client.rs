//! Backoffice client API.
//!
//! This module provides the main `Client` struct. Every request goes through
//! [`Client::request`], which applies the refresh protocol:
//!
//! - a `401` on a request that is neither the sign-in endpoint nor already a
//!   retry enters the [`RefreshGate`];
//! - the gate's leader calls the refresh endpoint once, other requests wait;
//! - on success every affected request is issued again, once;
//! - on failure every affected request fails with [`Error::AuthExpired`], a
//!   session-expired notice is published and a redirect to the sign-in route
//!   follows after the configured delay.
//!
//! No other request is retried.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use backoffice_proto::{error_message, Envelope};

use crate::config::ClientConfig;
use crate::error::Error;
use crate::event::{ClientEvent, Notice};
use crate::refresh::{GateEntry, RefreshGate};
use crate::request::{ApiRequest, Attempt};
use crate::transport::{HttpTransport, RawResponse, Transport};

/// Capacity of the event channel.
const EVENT_CAPACITY: usize = 32;

/// A client for the Backoffice REST API.
///
/// Construct one per application and share it behind an `Arc`.
///
/// # Example
///
/// ```ignore
/// use backoffice_client::{Client, ClientConfig};
///
/// let client = Client::new(ClientConfig::new("https://api.example.com"))?;
/// let roles: Vec<serde_json::Value> = client.get_data("/roles").await?;
/// ```
pub struct Client {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    gate: RefreshGate,
    events: broadcast::Sender<ClientEvent>,
    next_request_id: AtomicU64,
}

impl Client {
    /// Create a client that talks HTTP to `config.base_url`.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over a custom transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            transport,
            gate: RefreshGate::new(),
            events,
            next_request_id: AtomicU64::new(1),
        }
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Subscribe to notices and redirects.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Whether a token refresh is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.gate.is_refreshing()
    }

    /// Issue a request and decode its envelope.
    pub async fn request<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<Envelope<T>, Error> {
        let request_id = self.next_request_id();
        let mut attempt = Attempt::new(request);

        loop {
            let response = self.send(request_id, &attempt).await?;

            if response.is_success() {
                return Envelope::from_slice(&response.body).map_err(Error::from);
            }

            if response.status == 401 && self.should_refresh(&attempt) {
                self.recover(request_id, &attempt).await?;
                attempt = attempt.retried();
                continue;
            }

            return Err(Error::Http {
                status: response.status,
                message: error_message(&response.body),
            });
        }
    }

    /// Issue a request and return its payload.
    pub async fn request_data<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, Error> {
        self.request(request).await?.into_data().ok_or(Error::MissingData)
    }

    /// `GET` a path and return its payload.
    pub async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.request_data(ApiRequest::get(path)).await
    }

    /// `POST` a JSON body and return the payload.
    pub async fn post_data<T, B>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request_data(ApiRequest::post(path).with_json(body)?).await
    }

    fn next_request_id(&self) -> u64 {
        self.next_request_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn send(&self, request_id: u64, attempt: &Attempt) -> Result<RawResponse, Error> {
        let request = attempt.request();
        debug!(
            request_id,
            method = %request.method,
            path = %request.path,
            retry = attempt.retry_count(),
            "sending request"
        );

        let response = self.transport.send(request).await.map_err(|e| {
            warn!(request_id, path = %request.path, error = %e, "request did not reach the server");
            e
        })?;

        debug!(request_id, status = response.status, "response received");
        Ok(response)
    }

    fn should_refresh(&self, attempt: &Attempt) -> bool {
        !attempt.is_retry() && !self.config.endpoints.is_sign_in(&attempt.request().path)
    }

    /// Run or join the refresh cycle for a request that received a 401.
    async fn recover(&self, request_id: u64, attempt: &Attempt) -> Result<(), Error> {
        let announce = !self.config.endpoints.is_session_check(&attempt.request().path);

        match self.gate.enter(announce) {
            GateEntry::Leader(lease) => {
                debug!(request_id, "access token rejected, refreshing");
                let outcome = self.refresh_token().await;
                let announce = lease.complete(&outcome);

                match &outcome {
                    Ok(()) => info!(request_id, "access token refreshed"),
                    Err(e) => {
                        warn!(request_id, error = %e, "token refresh failed");
                        if announce {
                            self.announce_expiry();
                        }
                    }
                }
                outcome
            }
            GateEntry::Waiter(rx) => rx.await.unwrap_or_else(|_| {
                Err(Error::AuthExpired {
                    message: "token refresh was interrupted".to_string(),
                })
            }),
        }
    }

    /// Call the refresh endpoint. Never goes through the refresh protocol.
    async fn refresh_token(&self) -> Result<(), Error> {
        let request = ApiRequest::post(self.config.endpoints.refresh.as_str());
        match self.transport.send(&request).await {
            Ok(response) if response.is_success() => Ok(()),
            Ok(response) => Err(Error::AuthExpired {
                message: error_message(&response.body),
            }),
            Err(e) => Err(Error::AuthExpired {
                message: e.to_string(),
            }),
        }
    }

    /// Publish the session-expired notice and schedule the sign-in redirect.
    fn announce_expiry(&self) {
        // No subscribers is not an error: nothing is listening for notices.
        let _ = self.events.send(ClientEvent::Notice(Notice::session_expired()));

        let events = self.events.clone();
        let delay = self.config.expiry_redirect_delay;
        let to = self.config.sign_in_route.clone();
        // Detached: the redirect fires even if nobody awaits it.
        let _ = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!(route = %to, "redirecting after session expiry");
            let _ = events.send(ClientEvent::Redirect { to });
        });
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.config.base_url)
            .field("refreshing", &self.gate.is_refreshing())
            .field("next_request_id", &self.next_request_id.load(Ordering::SeqCst))
            .finish()
    }
}
