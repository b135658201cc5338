//! Tree mutations
//!
//! High-level semantic operations on a [`ComponentTree`].
//!
//! Each mutation validates every structural constraint before touching the
//! tree, so a failing operation is a no-op that reports a [`TreeError`] and
//! never leaves the forest partially mutated.
//!
//! ## Mutation semantics
//!
//! ### Insert
//! - Every UUID in the inserted subtree is freshly generated
//! - The top-level node may be pinned to a caller-supplied UUID
//! - Fails if the target slot is not declared by the parent's definition
//!
//! ### Move
//! - Atomic relocation of a node with its subtree, UUIDs and inputs intact
//! - Fails if the destination lies inside the moved node's own subtree
//!
//! ### Duplicate
//! - Deep copy with a fresh UUID per copied node
//! - Prop-source references to copied UUIDs are remapped to the copies
//! - The duplicate lands immediately after the original sibling
//!
//! ### Delete
//! - Removes a node and all descendants
//! - Prunes every model entry of the removed subtree
//!
//! ### Reorder / Shift
//! - Reposition among current siblings only

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TreeError;
use crate::path::{ShiftDirection, TreePath};
use crate::registry::ComponentRegistry;
use crate::source::PropSource;
use crate::tree::{ComponentTree, ParentRef};

/// Blueprint for a subtree to insert
///
/// UUIDs are not part of the template; they are generated at insertion
/// time so that inserting the same template twice can never collide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTemplate {
    /// Component id of the node
    pub component_id: String,
    /// Component version of the node
    pub component_version: String,
    /// Prop-source inputs of the node
    pub inputs: IndexMap<String, PropSource>,
    /// Child templates per named slot
    pub slots: IndexMap<String, Vec<NodeTemplate>>,
}

impl NodeTemplate {
    /// Template with no inputs and no children
    #[inline]
    #[must_use]
    pub fn new(component_id: impl Into<String>, component_version: impl Into<String>) -> Self {
        Self {
            component_id: component_id.into(),
            component_version: component_version.into(),
            inputs: IndexMap::new(),
            slots: IndexMap::new(),
        }
    }

    /// Add an input
    #[inline]
    #[must_use]
    pub fn with_input(mut self, name: impl Into<String>, source: PropSource) -> Self {
        self.inputs.insert(name.into(), source);
        self
    }

    /// Append a child template under a slot
    #[inline]
    #[must_use]
    pub fn with_child(mut self, slot: impl Into<String>, child: NodeTemplate) -> Self {
        self.slots.entry(slot.into()).or_default().push(child);
        self
    }

    fn validate(&self, registry: &ComponentRegistry) -> Result<(), TreeError> {
        let definition = registry
            .get(&self.component_id)
            .ok_or_else(|| TreeError::UnknownComponent(self.component_id.clone()))?;
        for source in self.inputs.values() {
            source.assert_acyclic()?;
        }
        for (slot, children) in &self.slots {
            if !definition.declares_slot(slot) {
                return Err(TreeError::UndeclaredSlot {
                    component: self.component_id.clone(),
                    slot: slot.clone(),
                });
            }
            for child in children {
                child.validate(registry)?;
            }
        }
        Ok(())
    }
}

/// Semantic tree operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeMutation {
    /// Insert a subtree at a path
    Insert {
        /// Subtree blueprint
        template: NodeTemplate,
        /// Insertion point (final index may equal the sibling count)
        at: TreePath,
        /// Caller-supplied UUID for the top-level node
        pinned_uuid: Option<Uuid>,
    },

    /// Relocate a node (with its subtree) to a new position
    Move {
        /// Node to relocate
        uuid: Uuid,
        /// Destination insertion point
        to: TreePath,
    },

    /// Deep-copy a node and its subtree next to the original
    Duplicate {
        /// Node to copy
        uuid: Uuid,
    },

    /// Remove a node and all descendants
    Delete {
        /// Node to remove
        uuid: Uuid,
    },

    /// Reposition a node among its current siblings
    Reorder {
        /// Node to reposition
        uuid: Uuid,
        /// Target sibling index
        new_index: usize,
    },

    /// Swap a node with an adjacent sibling
    Shift {
        /// Node to shift
        uuid: Uuid,
        /// Swap direction
        direction: ShiftDirection,
    },
}

impl TreeMutation {
    /// Validate without applying
    ///
    /// # Errors
    /// Returns the constraint the operation would violate.
    pub fn validate(
        &self,
        tree: &ComponentTree,
        registry: &ComponentRegistry,
    ) -> Result<(), TreeError> {
        match self {
            Self::Insert {
                template,
                at,
                pinned_uuid,
            } => {
                let (parent, _) = tree.resolve_insertion(at)?;
                Self::check_slot_declared(tree, registry, &parent)?;
                if let Some(uuid) = pinned_uuid {
                    if tree.contains(*uuid) {
                        return Err(TreeError::DuplicateUuid(*uuid));
                    }
                }
                template.validate(registry)
            }

            Self::Move { uuid, to } => {
                let subtree = tree.descendants(*uuid)?;
                let (parent, _) = tree.resolve_insertion(to)?;
                Self::check_slot_declared(tree, registry, &parent)?;
                if let ParentRef::Slot(parent_uuid, _) = parent {
                    if subtree.contains(&parent_uuid) {
                        return Err(TreeError::CycleDetected);
                    }
                }
                Ok(())
            }

            Self::Duplicate { uuid } | Self::Delete { uuid } => {
                if tree.contains(*uuid) {
                    Ok(())
                } else {
                    Err(TreeError::NodeNotFound(*uuid))
                }
            }

            Self::Reorder { uuid, new_index } => {
                let (parent, _) = tree.position_of(*uuid)?;
                let len = tree.sibling_list(&parent).map_or(0, Vec::len);
                if *new_index >= len {
                    return Err(TreeError::IndexOutOfBounds {
                        index: *new_index,
                        len,
                    });
                }
                Ok(())
            }

            Self::Shift { uuid, direction } => {
                let (parent, index) = tree.position_of(*uuid)?;
                let len = tree.sibling_list(&parent).map_or(0, Vec::len);
                let blocked = match direction {
                    ShiftDirection::Earlier => index == 0,
                    ShiftDirection::Later => index + 1 >= len,
                };
                if blocked {
                    return Err(TreeError::IndexOutOfBounds { index, len });
                }
                Ok(())
            }
        }
    }

    /// Validate, then apply
    ///
    /// Returns the UUID of the newly created top-level node for
    /// [`TreeMutation::Insert`] and [`TreeMutation::Duplicate`], `None`
    /// otherwise.
    ///
    /// # Errors
    /// Returns the violated constraint; the tree is untouched on error.
    pub fn apply(
        &self,
        tree: &mut ComponentTree,
        registry: &ComponentRegistry,
    ) -> Result<Option<Uuid>, TreeError> {
        self.validate(tree, registry)?;

        match self {
            Self::Insert {
                template,
                at,
                pinned_uuid,
            } => {
                let (parent, index) = tree.resolve_insertion(at)?;
                let root = Self::apply_insert_template(tree, template, *pinned_uuid);
                tree.attach(root, &parent, index);
                Ok(Some(root))
            }

            Self::Move { uuid, to } => {
                let (parent, index) = tree.resolve_insertion(to)?;
                tree.detach(*uuid)?;
                tree.attach(*uuid, &parent, index);
                Ok(None)
            }

            Self::Duplicate { uuid } => Self::apply_duplicate(tree, *uuid).map(Some),

            Self::Delete { uuid } => {
                let subtree = tree.descendants(*uuid)?;
                tree.detach(*uuid)?;
                tree.remove_subtree_records(&subtree);
                Ok(None)
            }

            Self::Reorder { uuid, new_index } => {
                let (parent, index) = tree.position_of(*uuid)?;
                tree.reposition(&parent, index, *new_index);
                Ok(None)
            }

            Self::Shift { uuid, direction } => {
                let (parent, index) = tree.position_of(*uuid)?;
                let target = match direction {
                    ShiftDirection::Earlier => index - 1,
                    ShiftDirection::Later => index + 1,
                };
                tree.reposition(&parent, index, target);
                Ok(None)
            }
        }
    }

    fn check_slot_declared(
        tree: &ComponentTree,
        registry: &ComponentRegistry,
        parent: &ParentRef,
    ) -> Result<(), TreeError> {
        if let ParentRef::Slot(parent_uuid, slot) = parent {
            let node = tree
                .node(*parent_uuid)
                .ok_or(TreeError::NodeNotFound(*parent_uuid))?;
            let definition = registry
                .get(node.component_id())
                .ok_or_else(|| TreeError::UnknownComponent(node.component_id().to_string()))?;
            if !definition.declares_slot(slot) {
                return Err(TreeError::UndeclaredSlot {
                    component: node.component_id().to_string(),
                    slot: slot.clone(),
                });
            }
        }
        Ok(())
    }

    /// Create every node of a template with fresh UUIDs; only the returned
    /// top-level node is left detached for the caller to attach.
    fn apply_insert_template(
        tree: &mut ComponentTree,
        template: &NodeTemplate,
        pinned: Option<Uuid>,
    ) -> Uuid {
        let uuid = pinned.unwrap_or_else(Uuid::new_v4);
        tree.insert_detached(
            uuid,
            template.component_id.clone(),
            template.component_version.clone(),
            template.inputs.clone(),
        );
        for (slot, children) in &template.slots {
            for (position, child) in children.iter().enumerate() {
                let child_uuid = Self::apply_insert_template(tree, child, None);
                tree.attach(child_uuid, &ParentRef::Slot(uuid, slot.clone()), position);
            }
        }
        uuid
    }

    fn apply_duplicate(tree: &mut ComponentTree, uuid: Uuid) -> Result<Uuid, TreeError> {
        let subtree = tree.descendants(uuid)?;
        let mapping: HashMap<Uuid, Uuid> =
            subtree.iter().map(|&old| (old, Uuid::new_v4())).collect();

        // Snapshot structure and inputs before editing the maps.
        struct Copied {
            old: Uuid,
            component_id: String,
            component_version: String,
            slots: Vec<(String, Vec<Uuid>)>,
            inputs: IndexMap<String, PropSource>,
        }
        let mut copies = Vec::with_capacity(subtree.len());
        for &old in &subtree {
            let node = tree.node(old).ok_or(TreeError::NodeNotFound(old))?;
            let mut inputs = tree
                .inputs(old)
                .cloned()
                .ok_or(TreeError::ModelEntryMissing(old))?;
            for source in inputs.values_mut() {
                source.remap_uuids(&mapping);
            }
            copies.push(Copied {
                old,
                component_id: node.component_id().to_string(),
                component_version: node.component_version().to_string(),
                slots: node
                    .slots()
                    .map(|(slot, children)| (slot.to_string(), children.to_vec()))
                    .collect(),
                inputs,
            });
        }

        for copy in &copies {
            tree.insert_detached(
                mapping[&copy.old],
                copy.component_id.clone(),
                copy.component_version.clone(),
                copy.inputs.clone(),
            );
        }
        for copy in &copies {
            for (slot, children) in &copy.slots {
                for (position, child) in children.iter().enumerate() {
                    tree.attach(
                        mapping[child],
                        &ParentRef::Slot(mapping[&copy.old], slot.clone()),
                        position,
                    );
                }
            }
        }

        let (parent, index) = tree.position_of(uuid)?;
        let duplicate = mapping[&uuid];
        tree.attach(duplicate, &parent, index + 1);
        Ok(duplicate)
    }
}
