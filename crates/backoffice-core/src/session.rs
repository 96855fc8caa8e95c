//! Session store.
//!
//! Holds the signed-in principal with an explicit hydration state, persists it
//! as a versioned snapshot, and publishes every transition on a watch
//! channel. Readers never block on writers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use backoffice_client::{ClientEvent, NoticeLevel};
use backoffice_proto::Principal;

use crate::backend::SessionBackend;
use crate::error::Result;
use crate::storage::{KeyValueStorage, SESSION_KEY};

/// Version written into session snapshots.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Where the session stands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Hydration {
    /// Persisted state has not been read yet.
    #[default]
    NotHydrated,
    /// Hydrated, nobody is signed in.
    Empty,
    /// Hydrated, a principal is signed in.
    Present(Arc<Principal>),
}

impl Hydration {
    pub fn is_hydrated(&self) -> bool {
        !matches!(self, Hydration::NotHydrated)
    }

    pub fn principal(&self) -> Option<&Arc<Principal>> {
        match self {
            Hydration::Present(principal) => Some(principal),
            _ => None,
        }
    }

    fn from_principal(principal: Option<Principal>) -> Self {
        match principal {
            Some(principal) => Hydration::Present(Arc::new(principal)),
            None => Hydration::Empty,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionSnapshot {
    version: u32,
    saved_at: DateTime<Utc>,
    principal: Option<Principal>,
}

/// The signed-in principal and its persisted copy.
pub struct SessionStore {
    state: watch::Sender<Hydration>,
    storage: Arc<dyn KeyValueStorage>,
    /// Serializes writers so a snapshot on disk matches the last transition.
    write_lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        let (state, _) = watch::channel(Hydration::NotHydrated);
        Self {
            state,
            storage,
            write_lock: Mutex::new(()),
        }
    }

    /// Current hydration state.
    pub fn hydration(&self) -> Hydration {
        self.state.borrow().clone()
    }

    /// The signed-in principal, if any.
    pub fn principal(&self) -> Option<Arc<Principal>> {
        self.state.borrow().principal().cloned()
    }

    pub fn is_hydrated(&self) -> bool {
        self.state.borrow().is_hydrated()
    }

    /// Watch hydration transitions.
    pub fn subscribe(&self) -> watch::Receiver<Hydration> {
        self.state.subscribe()
    }

    /// Wait until the store is hydrated and return its state.
    pub async fn wait_hydrated(&self) -> Hydration {
        let mut rx = self.subscribe();
        let state = match rx.wait_for(Hydration::is_hydrated).await {
            Ok(state) => state.clone(),
            Err(_) => self.hydration(),
        };
        state
    }

    /// Read the persisted snapshot.
    ///
    /// Does nothing when the store already left `NotHydrated`, so a principal
    /// set before hydration finished is never overwritten by an older
    /// snapshot. A corrupt snapshot is discarded and hydrates as empty. A
    /// storage failure also hydrates as empty and is returned.
    pub async fn hydrate(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.is_hydrated() {
            debug!("session already hydrated");
            return Ok(());
        }

        let raw = match self.storage.load(SESSION_KEY).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "failed to read session snapshot");
                self.state.send_replace(Hydration::Empty);
                return Err(e);
            }
        };

        let principal = match raw.as_deref().map(serde_json::from_str::<SessionSnapshot>) {
            None => None,
            Some(Ok(snapshot)) if snapshot.version == SNAPSHOT_VERSION => snapshot.principal,
            Some(Ok(snapshot)) => {
                warn!(version = snapshot.version, "discarding session snapshot of unknown version");
                self.discard_snapshot().await;
                None
            }
            Some(Err(e)) => {
                warn!(error = %e, "discarding corrupt session snapshot");
                self.discard_snapshot().await;
                None
            }
        };

        info!(signed_in = principal.is_some(), "session hydrated");
        self.state.send_replace(Hydration::from_principal(principal));
        Ok(())
    }

    /// Replace the principal, or clear it with `None`.
    ///
    /// The in-memory state changes even if persisting fails; the error is
    /// returned so the caller can report it.
    pub async fn set_principal(&self, principal: Option<Principal>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.replace(principal).await
    }

    pub async fn clear_principal(&self) -> Result<()> {
        self.set_principal(None).await
    }

    /// Re-fetch the held principal from the server.
    ///
    /// Returns `Ok(None)` without a request when nobody is signed in. On
    /// failure the stale principal stays in place and the error is returned.
    /// If the session changed while the request was in flight, the response
    /// is dropped.
    pub async fn refresh_principal(&self, backend: &dyn SessionBackend) -> Result<Option<Arc<Principal>>> {
        let Some(current) = self.principal() else {
            debug!("no principal to refresh");
            return Ok(None);
        };

        let fresh = match backend.fetch_principal(&current).await {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!(id = %current.id, error = %e, "principal refresh failed, keeping cached copy");
                return Err(e.into());
            }
        };

        self.accept_refreshed(&current, fresh).await
    }

    /// Store `fresh` if the session still holds the same identity as
    /// `previous`. Otherwise the session moved on and `fresh` is dropped.
    pub async fn accept_refreshed(&self, previous: &Principal, fresh: Principal) -> Result<Option<Arc<Principal>>> {
        let _guard = self.write_lock.lock().await;
        let still_current = self
            .principal()
            .is_some_and(|held| held.identity() == previous.identity());
        if !still_current {
            debug!(id = %previous.id, "session changed during refresh, dropping response");
            return Ok(self.principal());
        }

        self.replace(Some(fresh)).await?;
        Ok(self.principal())
    }

    /// Clear the session whenever the client reports it expired.
    pub fn clear_on_expiry(self: &Arc<Self>, mut events: broadcast::Receiver<ClientEvent>) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(ClientEvent::Notice(notice)) if notice.level == NoticeLevel::SessionExpired => {
                        info!("session expired, clearing principal");
                        if let Err(e) = store.clear_principal().await {
                            warn!(error = %e, "failed to persist cleared session");
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "session listener lagged behind client events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Must be called with `write_lock` held.
    async fn replace(&self, principal: Option<Principal>) -> Result<()> {
        let snapshot = SessionSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            principal,
        };

        match &snapshot.principal {
            Some(p) => info!(id = %p.id, kind = %p.kind, role = %p.role.value, "session set"),
            None => info!("session cleared"),
        }
        let encoded = serde_json::to_string(&snapshot);
        self.state
            .send_replace(Hydration::from_principal(snapshot.principal));

        if let Err(e) = self.storage.save(SESSION_KEY, &encoded?).await {
            warn!(error = %e, "failed to persist session snapshot");
            return Err(e);
        }
        Ok(())
    }

    async fn discard_snapshot(&self) {
        if let Err(e) = self.storage.remove(SESSION_KEY).await {
            warn!(error = %e, "failed to remove session snapshot");
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("hydration", &*self.state.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;
    use crate::storage::MemoryStorage;
    use backoffice_client::{Error as ClientError, Notice};
    use backoffice_proto::{PrincipalKind, Role};
    use std::time::Duration;

    fn ana() -> Principal {
        Principal::new("7", PrincipalKind::Admin, Role::new("Administrador", "administrador").with_permission("admin-view"))
            .with_username("ana")
    }

    fn snapshot_of(principal: &Principal) -> String {
        serde_json::to_string(&SessionSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            principal: Some(principal.clone()),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_starts_not_hydrated() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        assert_eq!(store.hydration(), Hydration::NotHydrated);
        assert!(store.principal().is_none());

        store.hydrate().await.unwrap();
        assert_eq!(store.hydration(), Hydration::Empty);
    }

    #[tokio::test]
    async fn test_hydrates_persisted_principal() {
        let storage = Arc::new(MemoryStorage::with_entry(SESSION_KEY, snapshot_of(&ana())));
        let store = SessionStore::new(storage);

        store.hydrate().await.unwrap();
        assert_eq!(store.principal().unwrap().username.as_deref(), Some("ana"));
    }

    #[tokio::test]
    async fn test_set_before_hydrate_wins() {
        let storage = Arc::new(MemoryStorage::with_entry(SESSION_KEY, snapshot_of(&ana())));
        let store = SessionStore::new(storage);

        let bo = Principal::new("8", PrincipalKind::User, Role::new("Staff", "staff"));
        store.set_principal(Some(bo)).await.unwrap();
        store.hydrate().await.unwrap();

        assert_eq!(store.principal().unwrap().id.as_str(), "8");
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_discarded() {
        let storage = Arc::new(MemoryStorage::with_entry(SESSION_KEY, "{not json"));
        let store = SessionStore::new(storage.clone());

        store.hydrate().await.unwrap();
        assert_eq!(store.hydration(), Hydration::Empty);
        assert_eq!(storage.get(SESSION_KEY), None);
    }

    #[tokio::test]
    async fn test_changes_are_persisted() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(storage.clone());

        store.set_principal(Some(ana())).await.unwrap();
        let saved: serde_json::Value = serde_json::from_str(&storage.get(SESSION_KEY).unwrap()).unwrap();
        assert_eq!(saved["version"], SNAPSHOT_VERSION);
        assert_eq!(saved["principal"]["username"], "ana");

        store.clear_principal().await.unwrap();
        let saved: serde_json::Value = serde_json::from_str(&storage.get(SESSION_KEY).unwrap()).unwrap();
        assert!(saved["principal"].is_null());

        // A fresh store over the same storage sees the cleared session.
        let reopened = SessionStore::new(storage);
        reopened.hydrate().await.unwrap();
        assert_eq!(reopened.hydration(), Hydration::Empty);
    }

    #[tokio::test]
    async fn test_wait_hydrated_observes_transition() {
        let store = Arc::new(SessionStore::new(Arc::new(MemoryStorage::new())));

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move { store.wait_hydrated().await })
        };
        tokio::task::yield_now().await;
        store.set_principal(Some(ana())).await.unwrap();

        let state = waiter.await.unwrap();
        assert!(matches!(state, Hydration::Present(_)));
    }

    #[tokio::test]
    async fn test_refresh_without_principal_is_noop() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        store.hydrate().await.unwrap();
        let backend = MockBackend::returning(ana());

        assert!(store.refresh_principal(&backend).await.unwrap().is_none());
        assert_eq!(backend.principal_calls(), 0);
    }

    #[tokio::test]
    async fn test_refresh_replaces_principal() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        store.set_principal(Some(ana())).await.unwrap();

        let updated = ana().with_email("ana@example.com");
        let backend = MockBackend::returning(updated.clone());

        let fresh = store.refresh_principal(&backend).await.unwrap().unwrap();
        assert_eq!(*fresh, updated);
        assert_eq!(store.principal().unwrap().email.as_deref(), Some("ana@example.com"));
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_stale_principal() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        store.set_principal(Some(ana())).await.unwrap();
        let backend = MockBackend::failing(ClientError::Network("connection reset".into()));

        let err = store.refresh_principal(&backend).await.unwrap_err();
        assert!(matches!(err.as_client(), Some(ClientError::Network(_))));
        assert_eq!(store.principal().unwrap().username.as_deref(), Some("ana"));
    }

    #[tokio::test]
    async fn test_refresh_dropped_when_session_changes() {
        let store = Arc::new(SessionStore::new(Arc::new(MemoryStorage::new())));
        store.set_principal(Some(ana())).await.unwrap();
        let backend = Arc::new(MockBackend::returning(ana().with_email("late@example.com")).with_delay(Duration::from_millis(50)));

        let refresh = {
            let store = store.clone();
            let backend = backend.clone();
            tokio::spawn(async move { store.refresh_principal(&*backend).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.clear_principal().await.unwrap();

        assert!(refresh.await.unwrap().unwrap().is_none());
        assert!(store.principal().is_none());
    }

    #[tokio::test]
    async fn test_clears_on_session_expired_notice() {
        let store = Arc::new(SessionStore::new(Arc::new(MemoryStorage::new())));
        store.set_principal(Some(ana())).await.unwrap();

        let (tx, rx) = broadcast::channel(8);
        let listener = store.clear_on_expiry(rx);
        let mut watch = store.subscribe();

        tx.send(ClientEvent::Notice(Notice::info("saved"))).unwrap();
        tx.send(ClientEvent::Notice(Notice::session_expired())).unwrap();

        watch.wait_for(|state| *state == Hydration::Empty).await.unwrap();
        drop(tx);
        listener.await.unwrap();
    }
}
