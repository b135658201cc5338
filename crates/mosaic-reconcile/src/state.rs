//! Draft state machine
//!
//! Per entity+language key the engine is in exactly one of three states.
//! Transitions happen on `save` (collapse or upsert), on upstream merges
//! and discards, and when pending violations are recorded or cleared.

use serde::Serialize;

/// Reconciliation state of one draft key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftState {
    /// No draft and no pending violations
    NoDraft,

    /// A draft record exists
    DraftPresent,

    /// Pending form-validation errors are recorded alongside; they do not
    /// block persistence of otherwise-valid data, and they may outlive the
    /// draft record itself
    DraftPresentWithViolations,
}

impl DraftState {
    /// Whether any per-key state (draft or violations) exists
    #[inline]
    #[must_use]
    pub fn is_present(self) -> bool {
        !matches!(self, Self::NoDraft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence() {
        assert!(!DraftState::NoDraft.is_present());
        assert!(DraftState::DraftPresent.is_present());
        assert!(DraftState::DraftPresentWithViolations.is_present());
    }
}
