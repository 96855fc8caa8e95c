//! Startup sequencing.
//!
//! The initializer runs when the application mounts. It waits for the
//! persisted stores to hydrate, revalidates a held principal against the
//! server, loads the appearance settings and then unblocks rendering by
//! moving to [`InitPhase::Ready`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use backoffice_proto::{EntityId, PrincipalKind, APPEARANCE_MODULE};

use crate::backend::SessionBackend;
use crate::session::SessionStore;
use crate::settings::SettingsStore;

/// Where startup stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InitPhase {
    #[default]
    Uninitialized,
    Initializing,
    /// Rendering may proceed.
    Ready,
}

/// What a call to [`AppInitializer::run`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// Another run was in flight; nothing was done.
    AlreadyRunning,
    /// The held principal was already initialized; no request was made.
    Skipped,
    /// The held principal was confirmed by the server.
    Revalidated,
    /// Nobody is signed in.
    Anonymous,
    /// Revalidation failed and the principal was cleared.
    SessionCleared,
    /// The mount went away mid-run; state was left untouched.
    Detached,
}

/// Liveness of the component that started a run.
///
/// Dropping the mount, or calling [`Mount::unmount`], stops an in-flight run
/// from touching state.
#[derive(Debug)]
pub struct Mount {
    alive: AtomicBool,
}

impl Mount {
    pub fn new() -> Self {
        Self {
            alive: AtomicBool::new(true),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn unmount(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

impl Default for Mount {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Mount {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Boot-time revalidation of the stored session.
pub struct AppInitializer {
    session: Arc<SessionStore>,
    settings: Arc<SettingsStore>,
    backend: Arc<dyn SessionBackend>,
    phase: watch::Sender<InitPhase>,
    in_flight: AtomicBool,
    last_identity: Mutex<Option<(PrincipalKind, EntityId)>>,
}

impl AppInitializer {
    pub fn new(session: Arc<SessionStore>, settings: Arc<SettingsStore>, backend: Arc<dyn SessionBackend>) -> Self {
        let (phase, _) = watch::channel(InitPhase::Uninitialized);
        Self {
            session,
            settings,
            backend,
            phase,
            in_flight: AtomicBool::new(false),
            last_identity: Mutex::new(None),
        }
    }

    /// A fresh mount handle.
    pub fn mount(&self) -> Mount {
        Mount::new()
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    pub fn phase(&self) -> InitPhase {
        *self.phase.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.phase() == InitPhase::Ready
    }

    pub fn subscribe(&self) -> watch::Receiver<InitPhase> {
        self.phase.subscribe()
    }

    /// Wait until rendering may proceed.
    pub async fn wait_ready(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|phase| *phase == InitPhase::Ready).await;
    }

    /// Run startup once.
    ///
    /// Concurrent calls return [`InitOutcome::AlreadyRunning`]. Unless the
    /// mount went away, the phase always ends at `Ready`.
    pub async fn run(&self, mount: &Mount) -> InitOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("initializer already running");
            return InitOutcome::AlreadyRunning;
        }
        let _flight = InFlight(&self.in_flight);

        if let Err(e) = self.session.hydrate().await {
            warn!(error = %e, "session hydration failed");
        }
        if let Err(e) = self.settings.hydrate().await {
            warn!(error = %e, "settings hydration failed");
        }
        if !mount.is_alive() {
            return InitOutcome::Detached;
        }

        let held = self.session.principal();
        if let Some(principal) = &held {
            let identity = (principal.kind, principal.id.clone());
            if self.last_identity.lock().as_ref() == Some(&identity) {
                debug!(id = %principal.id, "principal already initialized");
                self.phase.send_replace(InitPhase::Ready);
                return InitOutcome::Skipped;
            }
        }

        self.phase.send_replace(InitPhase::Initializing);
        let _ready = ReadyOnExit {
            phase: &self.phase,
            mount,
        };

        let Some(current) = held else {
            *self.last_identity.lock() = None;
            info!("no stored session");
            return InitOutcome::Anonymous;
        };

        let fetched = self.backend.fetch_principal(&current).await;
        if !mount.is_alive() {
            debug!("unmounted during revalidation");
            return InitOutcome::Detached;
        }

        match fetched {
            Ok(fresh) => {
                let identity = (fresh.kind, fresh.id.clone());
                if let Err(e) = self.session.accept_refreshed(&current, fresh).await {
                    warn!(error = %e, "failed to store revalidated principal");
                }
                self.load_appearance(mount).await;
                if !mount.is_alive() {
                    debug!("unmounted while loading appearance");
                    return InitOutcome::Detached;
                }
                *self.last_identity.lock() = Some(identity);
                info!(id = %current.id, "session revalidated");
                InitOutcome::Revalidated
            }
            Err(e) => {
                warn!(id = %current.id, error = %e, "session revalidation failed, signing out");
                *self.last_identity.lock() = None;
                if let Err(e) = self.session.clear_principal().await {
                    warn!(error = %e, "failed to persist cleared session");
                }
                InitOutcome::SessionCleared
            }
        }
    }

    async fn load_appearance(&self, mount: &Mount) {
        match self.backend.fetch_settings(APPEARANCE_MODULE).await {
            Ok(settings) if mount.is_alive() => {
                if let Err(e) = self.settings.apply_module(APPEARANCE_MODULE, settings).await {
                    warn!(error = %e, "failed to persist appearance settings");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "failed to load appearance settings"),
        }
    }
}

impl std::fmt::Debug for AppInitializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppInitializer")
            .field("phase", &self.phase())
            .field("in_flight", &self.in_flight.load(Ordering::SeqCst))
            .finish()
    }
}

/// Releases the in-flight flag on every exit path.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Moves the phase to `Ready` on every exit path while still mounted.
struct ReadyOnExit<'a> {
    phase: &'a watch::Sender<InitPhase>,
    mount: &'a Mount,
}

impl Drop for ReadyOnExit<'_> {
    fn drop(&mut self) {
        if self.mount.is_alive() {
            self.phase.send_replace(InitPhase::Ready);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;
    use crate::settings::ThemeMode;
    use crate::storage::MemoryStorage;
    use backoffice_client::Error as ClientError;
    use backoffice_proto::{Principal, Role, Setting};
    use std::time::Duration;

    fn ana() -> Principal {
        Principal::new("7", PrincipalKind::Admin, Role::new("Administrador", "administrador").with_permission("admin-view"))
    }

    async fn initializer(backend: Arc<MockBackend>, principal: Option<Principal>) -> AppInitializer {
        let storage = Arc::new(MemoryStorage::new());
        let session = Arc::new(SessionStore::new(storage.clone()));
        session.set_principal(principal).await.unwrap();
        let settings = Arc::new(SettingsStore::new(storage));
        AppInitializer::new(session, settings, backend)
    }

    #[tokio::test]
    async fn test_anonymous_startup() {
        let backend = Arc::new(MockBackend::returning(ana()));
        let init = initializer(backend.clone(), None).await;
        let mount = init.mount();

        assert_eq!(init.phase(), InitPhase::Uninitialized);
        assert_eq!(init.run(&mount).await, InitOutcome::Anonymous);
        assert!(init.is_ready());
        assert_eq!(backend.principal_calls(), 0);
        assert_eq!(backend.settings_calls(), 0);
    }

    #[tokio::test]
    async fn test_revalidates_and_applies_appearance() {
        let backend = Arc::new(
            MockBackend::returning(ana().with_username("ana"))
                .with_settings(vec![Setting::new(APPEARANCE_MODULE, "theme", "dark")]),
        );
        let init = initializer(backend.clone(), Some(ana())).await;
        let mount = init.mount();

        assert_eq!(init.run(&mount).await, InitOutcome::Revalidated);
        assert!(init.is_ready());
        assert_eq!(init.session().principal().unwrap().username.as_deref(), Some("ana"));
        assert_eq!(init.settings().appearance().theme, ThemeMode::Dark);
    }

    #[tokio::test]
    async fn test_same_identity_is_not_revalidated_twice() {
        let backend = Arc::new(MockBackend::returning(ana()));
        let init = initializer(backend.clone(), Some(ana())).await;
        let mount = init.mount();

        assert_eq!(init.run(&mount).await, InitOutcome::Revalidated);
        assert_eq!(init.run(&mount).await, InitOutcome::Skipped);
        assert_eq!(backend.principal_calls(), 1);
        assert_eq!(backend.settings_calls(), 1);

        // A different principal is revalidated again.
        let other = Principal::new("8", PrincipalKind::User, Role::new("Staff", "staff"));
        init.session().set_principal(Some(other)).await.unwrap();
        assert_eq!(init.run(&mount).await, InitOutcome::Revalidated);
        assert_eq!(backend.principal_calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_revalidation_clears_and_reaches_ready() {
        let backend = Arc::new(MockBackend::failing(ClientError::Http {
            status: 404,
            message: "Admin not found".into(),
        }));
        let init = initializer(backend.clone(), Some(ana())).await;
        let mount = init.mount();

        assert_eq!(init.run(&mount).await, InitOutcome::SessionCleared);
        assert!(init.is_ready());
        assert!(init.session().principal().is_none());
        assert_eq!(backend.settings_calls(), 0);

        // The in-flight flag was released.
        assert_eq!(init.run(&mount).await, InitOutcome::Anonymous);
    }

    #[tokio::test]
    async fn test_settings_failure_is_not_fatal() {
        let backend = Arc::new(
            MockBackend::returning(ana()).with_failing_settings(ClientError::Network("timed out".into())),
        );
        let init = initializer(backend, Some(ana())).await;
        let mount = init.mount();

        assert_eq!(init.run(&mount).await, InitOutcome::Revalidated);
        assert!(init.is_ready());
        assert!(init.session().principal().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_run_is_rejected() {
        let backend = Arc::new(MockBackend::returning(ana()).with_delay(Duration::from_millis(50)));
        let init = Arc::new(initializer(backend.clone(), Some(ana())).await);
        let mount = Arc::new(init.mount());

        let first = {
            let init = init.clone();
            let mount = mount.clone();
            tokio::spawn(async move { init.run(&mount).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(init.run(&mount).await, InitOutcome::AlreadyRunning);
        assert_eq!(first.await.unwrap(), InitOutcome::Revalidated);
        assert_eq!(backend.principal_calls(), 1);
    }

    #[tokio::test]
    async fn test_unmount_leaves_state_untouched() {
        let backend = Arc::new(
            MockBackend::failing(ClientError::Http {
                status: 401,
                message: "Unauthorized".into(),
            })
            .with_delay(Duration::from_millis(50)),
        );
        let init = Arc::new(initializer(backend, Some(ana())).await);
        let mount = Arc::new(init.mount());

        let run = {
            let init = init.clone();
            let mount = mount.clone();
            tokio::spawn(async move { init.run(&mount).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        mount.unmount();

        assert_eq!(run.await.unwrap(), InitOutcome::Detached);
        assert_eq!(init.phase(), InitPhase::Initializing);
        assert!(init.session().principal().is_some());
    }

    #[tokio::test]
    async fn test_unmount_during_settings_load_is_retried_on_remount() {
        let backend = Arc::new(
            MockBackend::returning(ana())
                .with_settings(vec![Setting::new(APPEARANCE_MODULE, "theme", "dark")])
                .with_settings_delay(Duration::from_millis(50)),
        );
        let init = Arc::new(initializer(backend.clone(), Some(ana())).await);
        let mount = Arc::new(init.mount());

        let run = {
            let init = init.clone();
            let mount = mount.clone();
            tokio::spawn(async move { init.run(&mount).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        mount.unmount();

        assert_eq!(run.await.unwrap(), InitOutcome::Detached);
        assert_eq!(init.settings().appearance().theme, ThemeMode::System);

        let mount = init.mount();
        assert_eq!(init.run(&mount).await, InitOutcome::Revalidated);
        assert!(init.is_ready());
        assert_eq!(init.settings().appearance().theme, ThemeMode::Dark);
        assert_eq!(backend.principal_calls(), 2);
        assert_eq!(backend.settings_calls(), 2);
    }

    #[tokio::test]
    async fn test_wait_ready() {
        let backend = Arc::new(MockBackend::returning(ana()).with_delay(Duration::from_millis(20)));
        let init = Arc::new(initializer(backend, Some(ana())).await);

        let waiter = {
            let init = init.clone();
            tokio::spawn(async move { init.wait_ready().await })
        };

        let mount = init.mount();
        init.run(&mount).await;
        waiter.await.unwrap();
        assert!(init.is_ready());
    }
}
