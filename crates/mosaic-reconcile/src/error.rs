//! Error types for reconciliation
//!
//! Only genuinely exceptional conditions surface here. A malformed stored
//! record is treated as an absent draft and logged; a missing published
//! entity on the upstream path is a no-op; validation violations are
//! recorded in the shadow store, not raised.

use mosaic_canonical::DigestError;

/// Reconciliation failures
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Canonical form failed to hash; programming error for well-typed input
    #[error("digest failed: {0}")]
    Digest(#[from] DigestError),

    /// A record failed to encode for storage
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A mutator left the candidate record structurally invalid
    #[error("invalid draft record: {0}")]
    InvalidRecord(String),
}
