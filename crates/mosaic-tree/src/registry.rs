//! Component definitions and their registry
//!
//! A [`ComponentDefinition`] declares the named slots a component exposes;
//! mutations consult the [`ComponentRegistry`] so that a node can only be
//! placed into a slot its parent actually declares.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Declaration of a single component type
///
/// # Invariants
/// - `id` is stable and unique within a registry
/// - `slots` lists every slot the component may parent children under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDefinition {
    id: String,
    version: String,
    #[serde(default)]
    slots: Vec<String>,
}

impl ComponentDefinition {
    /// Create a definition with no slots
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            slots: Vec::new(),
        }
    }

    /// Add a declared slot
    #[inline]
    #[must_use]
    pub fn with_slot(mut self, slot: impl Into<String>) -> Self {
        self.slots.push(slot.into());
        self
    }

    /// Component id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Component version
    #[inline]
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Declared slot names, in declaration order
    #[inline]
    #[must_use]
    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    /// Check whether the component declares a slot
    #[inline]
    #[must_use]
    pub fn declares_slot(&self, slot: &str) -> bool {
        self.slots.iter().any(|s| s == slot)
    }
}

/// Registry of component definitions keyed by component id
#[derive(Debug, Default, Clone)]
pub struct ComponentRegistry {
    definitions: HashMap<String, ComponentDefinition>,
}

impl ComponentRegistry {
    /// Create an empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            definitions: HashMap::new(),
        }
    }

    /// Register a definition, replacing any previous one with the same id
    pub fn register(&mut self, definition: ComponentDefinition) {
        self.definitions
            .insert(definition.id().to_string(), definition);
    }

    /// Look up a definition by component id
    #[inline]
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ComponentDefinition> {
        self.definitions.get(id)
    }

    /// Check whether a component id is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    /// Number of registered definitions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Check if the registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Registered component ids
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.definitions.keys().map(String::as_str).collect()
    }
}
