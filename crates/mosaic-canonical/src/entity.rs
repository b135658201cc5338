//! Entity data
//!
//! The unit the reconciliation engine compares and persists: an entity's
//! full field payload, keyed by field name, with JSON values. A component
//! tree travels inside its field as the flat wire array.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Full field state of one entity in one language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityData {
    /// Entity type id (`page`, `pattern`, ...)
    pub entity_type: String,
    /// Entity id within its type
    pub entity_id: String,
    /// Language code, `None` for language-neutral entities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub langcode: Option<String>,
    /// Field values keyed by field name
    pub fields: IndexMap<String, Value>,
}

impl EntityData {
    /// Entity with an empty field payload
    #[inline]
    #[must_use]
    pub fn new(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            langcode: None,
            fields: IndexMap::new(),
        }
    }

    /// Set the language code
    #[inline]
    #[must_use]
    pub fn with_langcode(mut self, langcode: impl Into<String>) -> Self {
        self.langcode = Some(langcode.into());
        self
    }

    /// Set a field value
    #[inline]
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Read a field value
    #[inline]
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Write a field value in place
    #[inline]
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Human-facing label, when the `label` field holds a string
    #[inline]
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.fields.get("label").and_then(Value::as_str)
    }
}
