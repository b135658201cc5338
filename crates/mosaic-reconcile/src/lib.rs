//! Draft reconciliation engine
//!
//! Editors build a page as a tree of nested, parameterized components and
//! keep in-progress edits as drafts without touching published content.
//! This crate is the orchestration layer: it hashes submitted state
//! against published state, writes or collapses draft records, merges safe
//! upstream changes into existing drafts (or discards them when their
//! basis has drifted), and tracks pending form violations in a shadow
//! store.
//!
//! # Core Concepts
//!
//! - [`DraftReconciler`]: the save / get / merge / discard state machine
//! - [`DraftRecord`] / [`DraftKey`]: the persisted draft and its identity
//! - [`DraftState`]: `NoDraft` / `DraftPresent` / `DraftPresentWithViolations`
//! - [`PublishedProvider`]: seam to the external published-entity storage
//! - [`DraftMutator`] / [`MutatorRegistry`]: ordered adjustments to a
//!   candidate draft before it persists
//! - [`ReconcilerSettings`]: TTL, eligibility, safe-merge and
//!   normalization configuration
//!
//! # Example
//!
//! ```rust
//! use mosaic_canonical::EntityData;
//! use mosaic_reconcile::{DraftKey, DraftReconciler, DraftState, PublishedProvider};
//! use serde_json::json;
//!
//! struct NothingPublished;
//! impl PublishedProvider for NothingPublished {
//!     fn load_published(&self, _key: &DraftKey) -> Option<EntityData> {
//!         None
//!     }
//! }
//!
//! let engine = DraftReconciler::with_defaults(NothingPublished);
//! let entity = EntityData::new("page", "1").with_field("label", json!("Hello"));
//! assert_eq!(
//!     engine.save(&entity, None, "editor-1").unwrap(),
//!     DraftState::DraftPresent
//! );
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod key;
mod mutators;
mod provider;
mod reconciler;
mod record;
mod settings;
mod state;
mod violations;

pub use error::ReconcileError;
pub use key::DraftKey;
pub use mutators::{DraftMutator, DraftRecordBuilder, MutatorRegistry};
pub use provider::PublishedProvider;
pub use reconciler::DraftReconciler;
pub use record::{DraftRecord, DraftSummary, StoredDraft};
pub use settings::ReconcilerSettings;
pub use state::DraftState;
pub use violations::{FormViolation, ViolationList};
