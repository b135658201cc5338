//! Shadow violation store values
//!
//! Unsaved-but-invalid edits are not silently discarded: their validation
//! errors live in a second store keyed and expiring exactly like drafts.
//! Violation entries carry no draft payload.

use serde::{Deserialize, Serialize};

use mosaic_store::StoredValue;

/// One pending form-validation error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormViolation {
    /// Field the violation points at, `None` for entity-level errors
    #[serde(default)]
    pub field: Option<String>,
    /// Human-facing message
    pub message: String,
}

impl FormViolation {
    /// Violation anchored to a field
    #[inline]
    #[must_use]
    pub fn on_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Entity-level violation
    #[inline]
    #[must_use]
    pub fn on_entity(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }
}

/// The stored set of pending violations for one key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationList(pub Vec<FormViolation>);

impl ViolationList {
    /// Whether any violation is pending
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl StoredValue for ViolationList {
    fn has_payload(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors() {
        let on_field = FormViolation::on_field("label", "may not be empty");
        assert_eq!(on_field.field.as_deref(), Some("label"));

        let on_entity = FormViolation::on_entity("entity is stale");
        assert!(on_entity.field.is_none());
    }

    #[test]
    fn violation_entries_carry_no_payload() {
        let list = ViolationList(vec![FormViolation::on_entity("bad")]);
        assert!(!list.has_payload());
    }
}
