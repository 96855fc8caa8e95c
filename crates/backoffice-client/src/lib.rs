//! Backoffice Client - HTTP client library for the Backoffice REST API.
//!
//! This crate wraps outbound requests with consistent base configuration and
//! recovers from expired access tokens: a `401` triggers a single refresh
//! call, concurrent failures queue behind it, and every affected request is
//! re-issued exactly once.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use backoffice_client::{AuthApi, Client, ClientConfig};
//! use backoffice_proto::Credentials;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(Client::new(ClientConfig::from_env()?)?);
//!     let auth = AuthApi::new(client.clone());
//!
//!     let principal = auth.sign_in(&Credentials::new("root@example.com", "secret")).await?;
//!     println!("signed in as {}", principal.display_name());
//!
//!     auth.sign_out().await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod refresh;
pub mod request;
pub mod settings;
pub mod transport;

pub use auth::AuthApi;
pub use client::Client;
pub use config::{ClientConfig, Endpoints};
pub use error::Error;
pub use event::{ClientEvent, Notice, NoticeLevel};
pub use refresh::{GateEntry, RefreshGate, RefreshLease};
pub use request::{ApiRequest, Attempt, Method};
pub use settings::SettingsApi;
pub use transport::{HttpTransport, RawResponse, Transport};

/// Re-export wire types.
pub use backoffice_proto as proto;
