//! Durable key/value storage for client-side snapshots.
//!
//! Two independent keys are used: one for the session and one for the
//! settings cache. Values are JSON documents.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Error, Result};

/// Key of the persisted session snapshot.
pub const SESSION_KEY: &str = "session";

/// Key of the persisted settings snapshot.
pub const SETTINGS_KEY: &str = "settings";

/// Durable storage for snapshot documents.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    /// Read the value stored under `key`.
    async fn load(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn save(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// One JSON file per key inside a directory.
///
/// Writes go to a temporary file that is renamed over the target, so a crash
/// never leaves a half-written snapshot behind.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::Storage(format!("invalid storage key '{}'", key)))
    }
}

#[async_trait]
impl KeyValueStorage for FileStorage {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(key, path = %path.display(), "snapshot written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with `value` under `key`.
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let storage = Self::new();
        storage.entries.lock().insert(key.into(), value.into());
        storage
    }

    /// Current value under `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }
}

#[async_trait]
impl KeyValueStorage for MemoryStorage {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key))
    }

    async fn save(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
