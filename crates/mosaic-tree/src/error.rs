//! Error types for tree operations
//!
//! Every mutation failure is reported through [`TreeError`]; a failing
//! operation never leaves the tree partially mutated.

use uuid::Uuid;

/// Errors raised by tree queries, mutations, and wire decoding
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// Referenced node does not exist in the tree
    #[error("node not found: {0}")]
    NodeNotFound(Uuid),

    /// A path did not resolve to a node or insertion point
    #[error("path does not resolve: {0}")]
    PathUnresolvable(String),

    /// Path with no segments
    #[error("path must have at least one segment")]
    EmptyPath,

    /// Component id has no registered definition
    #[error("unknown component: {0}")]
    UnknownComponent(String),

    /// Slot is not declared by the parent's component definition
    #[error("component {component} does not declare slot {slot:?}")]
    UndeclaredSlot {
        /// Component id of the would-be parent
        component: String,
        /// Slot name that failed to resolve
        slot: String,
    },

    /// UUID already present in the tree
    #[error("duplicate uuid: {0}")]
    DuplicateUuid(Uuid),

    /// Sibling index outside the valid range
    #[error("index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Sibling count at the target location
        len: usize,
    },

    /// Move would place a node inside its own subtree
    #[error("move would create a cycle")]
    CycleDetected,

    /// An adapter appears again within its own input chain
    #[error("adapter {0:?} references its own output")]
    AdapterCycle(String),

    /// Prop-source nesting exceeds the supported depth
    #[error("prop source nesting exceeds depth limit of {max}")]
    SourceDepthExceeded {
        /// Maximum supported nesting depth
        max: usize,
    },

    /// Wire node references a parent that was not decoded before it
    #[error("node {uuid} references missing parent {parent}")]
    MissingParent {
        /// Node carrying the dangling reference
        uuid: Uuid,
        /// Parent uuid that did not resolve
        parent: Uuid,
    },

    /// Wire root without a region slot
    #[error("root node {0} carries no region slot")]
    MissingRegion(Uuid),

    /// Model map has no entry for a node present in the tree
    #[error("model entry missing for node {0}")]
    ModelEntryMissing(Uuid),

    /// Model map holds an entry for a node absent from the tree
    #[error("model entry orphaned for node {0}")]
    ModelEntryOrphaned(Uuid),
}
