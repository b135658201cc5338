//! Draft mutator chain
//!
//! Deployments can adjust a candidate draft before it is persisted (stamp
//! provenance fields, rewrite labels, redact values). Instead of implicit
//! global dispatch, mutators form an explicit ordered list: each one
//! receives the mutable [`DraftRecordBuilder`], and the result is
//! validated once after the whole chain has run.

use std::sync::Arc;

use serde_json::Value;

use crate::error::ReconcileError;
use crate::record::DraftRecord;

/// Mutable candidate draft passed through the mutator chain
#[derive(Debug, Clone)]
pub struct DraftRecordBuilder {
    record: DraftRecord,
}

impl DraftRecordBuilder {
    /// Start from a fully formed candidate record
    #[inline]
    #[must_use]
    pub fn new(record: DraftRecord) -> Self {
        Self { record }
    }

    /// Read the candidate
    #[inline]
    #[must_use]
    pub fn record(&self) -> &DraftRecord {
        &self.record
    }

    /// Replace the label
    #[inline]
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.record.label = label.into();
    }

    /// Replace the client id
    #[inline]
    pub fn set_client_id(&mut self, client_id: Option<String>) {
        self.record.client_id = client_id;
    }

    /// Write one payload field
    #[inline]
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.record.data.insert(name.into(), value);
    }

    /// Validate the candidate after the chain has run
    ///
    /// # Errors
    /// Returns [`ReconcileError::InvalidRecord`] when a mutator broke a
    /// structural requirement.
    pub fn finish(self) -> Result<DraftRecord, ReconcileError> {
        if self.record.entity_type.is_empty() || self.record.entity_id.is_empty() {
            return Err(ReconcileError::InvalidRecord(
                "entity identity must not be empty".to_string(),
            ));
        }
        Ok(self.record)
    }
}

/// One registered draft mutator
pub trait DraftMutator: Send + Sync {
    /// Stable name, for logging and diagnostics
    fn name(&self) -> &str;

    /// Adjust the candidate draft
    fn mutate(&self, builder: &mut DraftRecordBuilder);
}

/// Ordered list of registered mutators
#[derive(Default, Clone)]
pub struct MutatorRegistry {
    mutators: Vec<Arc<dyn DraftMutator>>,
}

impl MutatorRegistry {
    /// Empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mutator; chain order is registration order
    pub fn register(&mut self, mutator: Arc<dyn DraftMutator>) {
        self.mutators.push(mutator);
    }

    /// Number of registered mutators
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.mutators.len()
    }

    /// Check if no mutators are registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutators.is_empty()
    }

    /// Run every mutator over the builder, in registration order
    pub fn run(&self, builder: &mut DraftRecordBuilder) {
        for mutator in &self.mutators {
            tracing::trace!(mutator = mutator.name(), "running draft mutator");
            mutator.mutate(builder);
        }
    }
}

impl std::fmt::Debug for MutatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutatorRegistry")
            .field("mutators", &self.mutators.iter().map(|m| m.name()).collect::<Vec<_>>())
            .finish()
    }
}
