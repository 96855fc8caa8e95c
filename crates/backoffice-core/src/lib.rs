//! Backoffice Core - client-side session lifecycle and authorization.
//!
//! This crate holds the pieces that decide who is signed in and what they may
//! see:
//!
//! - [`session`] - the persisted session store with explicit hydration states
//! - [`settings`] - the persisted settings cache and derived appearance
//! - [`initializer`] - startup sequencing that revalidates a stored session
//! - [`permission`] - the pure permission evaluator
//! - [`guard`] - route and inline guards built on the two above
//! - [`storage`] - durable key/value storage for snapshots
//! - [`backend`] - the server calls the store and initializer depend on
//!
//! Client-side decisions only gate rendering and navigation. The server is the
//! enforcement point for every privileged action.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use backoffice_core::{AppInitializer, RemoteBackend, SessionStore, SettingsStore, FileStorage};
//! use backoffice_core::guard::{AuthGuard, Routes};
//!
//! let storage = Arc::new(FileStorage::new("/var/lib/backoffice"));
//! let session = Arc::new(SessionStore::new(storage.clone()));
//! let settings = Arc::new(SettingsStore::new(storage));
//! let backend = Arc::new(RemoteBackend::new(client.clone()));
//!
//! let initializer = AppInitializer::new(session.clone(), settings, backend);
//! let mount = initializer.mount();
//! initializer.run(&mount).await;
//!
//! let decision = AuthGuard::new(Routes::default()).decide(&session.hydration());
//! ```

pub mod backend;
pub mod error;
pub mod guard;
pub mod initializer;
pub mod permission;
pub mod session;
pub mod settings;
pub mod storage;

pub use backend::{RemoteBackend, SessionBackend};
pub use error::{Error, Result};
pub use guard::{
    AuthGuard, DisplayMode, GuardDecision, GuestGuard, InlineDecision, PermissionGate,
    PermissionGuard, Routes,
};
pub use initializer::{AppInitializer, InitOutcome, InitPhase, Mount};
pub use permission::{evaluate, EffectivePermissions, PermissionsExt, Policy, RequiredPermission};
pub use session::{Hydration, SessionStore};
pub use settings::{Appearance, SettingsStore, ThemeMode};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};

/// Re-export wire types.
pub use backoffice_proto as proto;
