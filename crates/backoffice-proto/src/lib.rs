//! Backoffice wire types.
//!
//! This crate defines the JSON shapes exchanged with the Backoffice REST API.
//! Every response is wrapped in an [`Envelope`] carrying `data`, `message`
//! and `statusCode`.
//!
//! # Modules
//!
//! - [`envelope`] - Response envelope and server message extraction
//! - [`principal`] - Principals, roles, grants and permissions
//! - [`auth`] - Sign-in request and response payloads
//! - [`settings`] - Settings records returned per module
//! - [`id`] - Entity identifiers accepted as JSON strings or numbers
//! - [`error`] - Decoding errors
//!
//! # Decoding
//!
//! ```ignore
//! use backoffice_proto::{Envelope, Principal};
//!
//! let body = br#"{"data":{"id":1,"username":"root","role":{"name":"Admin","value":"admin"}},"message":"ok","statusCode":200}"#;
//! let envelope: Envelope<Principal> = Envelope::from_slice(body)?;
//! ```

pub mod auth;
pub mod envelope;
pub mod error;
pub mod id;
pub mod principal;
pub mod settings;

pub use auth::{Credentials, SignInResponse};
pub use envelope::{error_message, Envelope, Message, GENERIC_ERROR_MESSAGE};
pub use error::Error;
pub use id::EntityId;
pub use principal::{Permission, Principal, PrincipalKind, Role, RoleGrant, SUPER_ROLE_VALUES};
pub use settings::{Setting, APPEARANCE_MODULE};
