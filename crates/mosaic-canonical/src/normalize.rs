//! Canonical-form normalization
//!
//! [`Normalizer::normalize`] turns entity data into a comparison-ready
//! [`CanonicalForm`]: volatile fields are dropped, composite values are
//! recursively key-sorted, typed scalars are cast to their canonical
//! primitive, and component-tree fields go through the optimize-inputs
//! pass. The result is a value, not a string; byte encoding is the
//! digest's job, so the same normalization serves any encoding.
//!
//! Normalization is total for well-typed input: a malformed tree field
//! falls back to generic value normalization rather than failing.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use mosaic_tree::{cast_scalar, ComponentTree};

use crate::entity::EntityData;

/// Field handling rules for normalization
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Fields whose value is derived or transient; never hashed
    pub volatile_fields: Vec<String>,
    /// Fields carrying a component tree in wire form
    pub tree_fields: Vec<String>,
    /// Fields cast to canonical booleans
    pub boolean_fields: Vec<String>,
    /// Fields cast to canonical integers
    pub integer_fields: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            volatile_fields: vec![
                "changed".to_string(),
                "revision_timestamp".to_string(),
                "editor_state".to_string(),
            ],
            tree_fields: vec!["component_tree".to_string()],
            boolean_fields: vec!["status".to_string()],
            integer_fields: Vec::new(),
        }
    }
}

/// Comparison-ready representation of an entity's data
///
/// Composite members are key-sorted and free of volatile fields and
/// resolution caches; two forms are meaningfully equal exactly when their
/// wrapped values are equal.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CanonicalForm(Value);

impl CanonicalForm {
    /// The wrapped canonical value
    #[inline]
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Unwrap the canonical value
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Applies the normalization rules of a [`NormalizerConfig`]
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    /// Normalizer with explicit rules
    #[inline]
    #[must_use]
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Produce the canonical form of an entity
    #[must_use]
    pub fn normalize(&self, entity: &EntityData) -> CanonicalForm {
        let mut fields = Map::new();
        for (name, value) in &entity.fields {
            if self.config.volatile_fields.iter().any(|f| f == name) {
                continue;
            }
            fields.insert(name.clone(), self.normalize_field(name, value));
        }

        let mut root = Map::new();
        root.insert(
            "entity_type".to_string(),
            Value::String(entity.entity_type.clone()),
        );
        root.insert(
            "entity_id".to_string(),
            Value::String(entity.entity_id.clone()),
        );
        if let Some(langcode) = &entity.langcode {
            root.insert("langcode".to_string(), Value::String(langcode.clone()));
        }
        root.insert("fields".to_string(), Value::Object(fields));
        CanonicalForm(Value::Object(root))
    }

    /// Normalize a bare field payload (no entity identity envelope)
    #[must_use]
    pub fn normalize_fields(&self, fields: &IndexMap<String, Value>) -> CanonicalForm {
        let mut out = Map::new();
        for (name, value) in fields {
            if self.config.volatile_fields.iter().any(|f| f == name) {
                continue;
            }
            out.insert(name.clone(), self.normalize_field(name, value));
        }
        CanonicalForm(Value::Object(out))
    }

    fn normalize_field(&self, name: &str, value: &Value) -> Value {
        if self.config.tree_fields.iter().any(|f| f == name) {
            // Optimize-inputs pass; a value that is not a wire tree falls
            // back to generic normalization.
            if let Ok(tree) = serde_json::from_value::<ComponentTree>(value.clone()) {
                return tree.canonical_value();
            }
        }

        let field_type = if self.config.boolean_fields.iter().any(|f| f == name) {
            Some("boolean")
        } else if self.config.integer_fields.iter().any(|f| f == name) {
            Some("integer")
        } else {
            None
        };
        Self::normalize_value(value, field_type)
    }

    fn normalize_value(value: &Value, field_type: Option<&str>) -> Value {
        match value {
            Value::Object(map) => {
                let mut sorted = Map::new();
                for (key, member) in map {
                    sorted.insert(key.clone(), Self::normalize_value(member, field_type));
                }
                Value::Object(sorted)
            }
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| Self::normalize_value(item, field_type))
                    .collect(),
            ),
            scalar => field_type.map_or_else(|| scalar.clone(), |ft| cast_scalar(scalar, ft)),
        }
    }
}
