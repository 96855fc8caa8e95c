//! Settings cache.
//!
//! Settings are cached per module and persisted under their own storage key,
//! independent of the session. The appearance module additionally drives an
//! [`Appearance`] value that is published whenever it changes.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use backoffice_proto::{Setting, APPEARANCE_MODULE};

use crate::error::Result;
use crate::storage::{KeyValueStorage, SETTINGS_KEY};

/// Version written into settings snapshots.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Appearance setting holding the theme.
pub const THEME_KEY: &str = "theme";

/// Appearance setting holding the primary color.
pub const PRIMARY_COLOR_KEY: &str = "primaryColor";

/// Color scheme preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    /// Follow the operating system.
    #[default]
    System,
}

impl FromStr for ThemeMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            "system" | "auto" => Ok(ThemeMode::System),
            other => Err(format!("unknown theme '{}'", other)),
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThemeMode::Light => write!(f, "light"),
            ThemeMode::Dark => write!(f, "dark"),
            ThemeMode::System => write!(f, "system"),
        }
    }
}

/// Presentation preferences derived from the appearance module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appearance {
    pub theme: ThemeMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
}

impl Appearance {
    /// Build from appearance settings. Unknown keys and unreadable values
    /// are ignored.
    pub fn from_settings(settings: &[Setting]) -> Self {
        let mut appearance = Appearance::default();
        for setting in settings {
            match setting.key.as_str() {
                THEME_KEY => match setting.as_str().map(str::parse::<ThemeMode>) {
                    Some(Ok(theme)) => appearance.theme = theme,
                    _ => debug!(value = %setting.value, "ignoring unreadable theme setting"),
                },
                PRIMARY_COLOR_KEY => {
                    appearance.primary_color = setting.as_str().map(str::to_string);
                }
                _ => {}
            }
        }
        appearance
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsSnapshot {
    version: u32,
    saved_at: Option<DateTime<Utc>>,
    modules: BTreeMap<String, Vec<Setting>>,
}

/// Cached settings, keyed by module.
pub struct SettingsStore {
    modules: Mutex<BTreeMap<String, Vec<Setting>>>,
    appearance: watch::Sender<Appearance>,
    storage: Arc<dyn KeyValueStorage>,
    hydrated: AtomicBool,
}

impl SettingsStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        let (appearance, _) = watch::channel(Appearance::default());
        Self {
            modules: Mutex::new(BTreeMap::new()),
            appearance,
            storage,
            hydrated: AtomicBool::new(false),
        }
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated.load(Ordering::SeqCst)
    }

    /// Read the persisted snapshot. Later calls do nothing.
    ///
    /// Modules applied before hydration finished take precedence over the
    /// snapshot. A corrupt snapshot is discarded.
    pub async fn hydrate(&self) -> Result<()> {
        let mut modules = self.modules.lock().await;
        if self.is_hydrated() {
            return Ok(());
        }

        let raw = self.storage.load(SETTINGS_KEY).await;
        self.hydrated.store(true, Ordering::SeqCst);

        let snapshot = match raw? {
            None => SettingsSnapshot::default(),
            Some(raw) => match serde_json::from_str::<SettingsSnapshot>(&raw) {
                Ok(snapshot) if snapshot.version == SNAPSHOT_VERSION => snapshot,
                Ok(snapshot) => {
                    warn!(version = snapshot.version, "discarding settings snapshot of unknown version");
                    self.discard_snapshot().await;
                    SettingsSnapshot::default()
                }
                Err(e) => {
                    warn!(error = %e, "discarding corrupt settings snapshot");
                    self.discard_snapshot().await;
                    SettingsSnapshot::default()
                }
            },
        };

        for (module, settings) in snapshot.modules {
            modules.entry(module).or_insert(settings);
        }
        self.publish_appearance(&modules);
        debug!(modules = modules.len(), "settings hydrated");
        Ok(())
    }

    /// Cached settings of `module`.
    pub async fn module(&self, module: &str) -> Option<Vec<Setting>> {
        self.modules.lock().await.get(module).cloned()
    }

    /// Replace the cached settings of `module` and persist the cache.
    ///
    /// Applying the appearance module republishes [`Appearance`] when it
    /// changed.
    pub async fn apply_module(&self, module: &str, settings: Vec<Setting>) -> Result<()> {
        let mut modules = self.modules.lock().await;
        modules.insert(module.to_string(), settings);
        if module == APPEARANCE_MODULE {
            self.publish_appearance(&modules);
        }
        info!(module, "settings applied");
        self.persist(&modules).await
    }

    /// Current appearance.
    pub fn appearance(&self) -> Appearance {
        self.appearance.borrow().clone()
    }

    /// Watch appearance changes.
    pub fn subscribe_appearance(&self) -> watch::Receiver<Appearance> {
        self.appearance.subscribe()
    }

    /// Drop every cached module.
    pub async fn clear(&self) -> Result<()> {
        let mut modules = self.modules.lock().await;
        modules.clear();
        self.publish_appearance(&modules);
        self.storage.remove(SETTINGS_KEY).await
    }

    fn publish_appearance(&self, modules: &BTreeMap<String, Vec<Setting>>) {
        let next = modules
            .get(APPEARANCE_MODULE)
            .map(|settings| Appearance::from_settings(settings))
            .unwrap_or_default();

        self.appearance.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                debug!(theme = %next.theme, "appearance changed");
                *current = next;
                true
            }
        });
    }

    async fn persist(&self, modules: &BTreeMap<String, Vec<Setting>>) -> Result<()> {
        let snapshot = SettingsSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Some(Utc::now()),
            modules: modules.clone(),
        };
        let encoded = serde_json::to_string(&snapshot)?;
        if let Err(e) = self.storage.save(SETTINGS_KEY, &encoded).await {
            warn!(error = %e, "failed to persist settings snapshot");
            return Err(e);
        }
        Ok(())
    }

    async fn discard_snapshot(&self) {
        if let Err(e) = self.storage.remove(SETTINGS_KEY).await {
            warn!(error = %e, "failed to remove settings snapshot");
        }
    }
}

impl fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsStore")
            .field("hydrated", &self.is_hydrated())
            .field("appearance", &*self.appearance.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn appearance_settings(theme: &str) -> Vec<Setting> {
        vec![
            Setting::new(APPEARANCE_MODULE, THEME_KEY, theme),
            Setting::new(APPEARANCE_MODULE, PRIMARY_COLOR_KEY, "#0f766e"),
            Setting::new(APPEARANCE_MODULE, "fontSize", 14),
        ]
    }

    #[test]
    fn test_appearance_from_settings() {
        let appearance = Appearance::from_settings(&appearance_settings("dark"));
        assert_eq!(appearance.theme, ThemeMode::Dark);
        assert_eq!(appearance.primary_color.as_deref(), Some("#0f766e"));

        let appearance = Appearance::from_settings(&[Setting::new(APPEARANCE_MODULE, THEME_KEY, "neon")]);
        assert_eq!(appearance, Appearance::default());
    }

    #[tokio::test]
    async fn test_apply_publishes_appearance() {
        let store = SettingsStore::new(Arc::new(MemoryStorage::new()));
        let mut rx = store.subscribe_appearance();

        store
            .apply_module(APPEARANCE_MODULE, appearance_settings("light"))
            .await
            .unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().theme, ThemeMode::Light);

        // Same values again: no change notification.
        store
            .apply_module(APPEARANCE_MODULE, appearance_settings("light"))
            .await
            .unwrap();
        assert!(!rx.has_changed().unwrap());

        // Other modules leave appearance alone.
        store
            .apply_module("business", vec![Setting::new("business", "name", "Acme")])
            .await
            .unwrap();
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_snapshot_survives_reopen() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SettingsStore::new(storage.clone());
        store
            .apply_module(APPEARANCE_MODULE, appearance_settings("dark"))
            .await
            .unwrap();

        let reopened = SettingsStore::new(storage);
        reopened.hydrate().await.unwrap();
        assert_eq!(reopened.appearance().theme, ThemeMode::Dark);
        assert_eq!(
            reopened.module(APPEARANCE_MODULE).await.unwrap().len(),
            3
        );
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_discarded() {
        let storage = Arc::new(MemoryStorage::with_entry(SETTINGS_KEY, "{\"version\":"));
        let store = SettingsStore::new(storage.clone());

        store.hydrate().await.unwrap();
        assert!(store.is_hydrated());
        assert_eq!(store.appearance(), Appearance::default());
        assert_eq!(storage.get(SETTINGS_KEY), None);
    }

    #[tokio::test]
    async fn test_clear_resets_appearance() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SettingsStore::new(storage.clone());
        store
            .apply_module(APPEARANCE_MODULE, appearance_settings("dark"))
            .await
            .unwrap();

        store.clear().await.unwrap();
        assert_eq!(store.appearance(), Appearance::default());
        assert!(store.module(APPEARANCE_MODULE).await.is_none());
        assert_eq!(storage.get(SETTINGS_KEY), None);
    }
}
