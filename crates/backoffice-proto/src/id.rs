//! Entity identifiers.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identifier of a backend record.
///
/// The API is not consistent about identifier types: some collections use
/// numeric keys, others UUID strings. Both decode into the same textual form
/// so identities can be compared without caring about the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(String);

impl EntityId {
    /// Create an identifier from its textual form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => EntityId(n.to_string()),
            RawId::Text(s) => EntityId(s),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_and_text_ids_compare_equal() {
        let numeric: EntityId = serde_json::from_str("42").unwrap();
        let text: EntityId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(numeric, text);
        assert_eq!(numeric.as_str(), "42");
    }

    #[test]
    fn test_serializes_as_string() {
        let id = EntityId::from(7u64);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"7\"");
    }
}
