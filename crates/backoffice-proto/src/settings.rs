//! Settings records.

use serde::{Deserialize, Serialize};

use crate::id::EntityId;

/// Module holding appearance preferences.
pub const APPEARANCE_MODULE: &str = "appearance";

/// A single key/value setting belonging to a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub module: String,
    pub key: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl Setting {
    pub fn new(module: impl Into<String>, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            id: None,
            module: module.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    /// The value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }
}
