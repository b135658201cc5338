//! The component forest
//!
//! A [`ComponentTree`] is a forest of UUID-addressed component instances.
//! Roots live in named regions; every other node hangs off a parent's named
//! slot. Structure (parent/slot/child order) lives in the node map while
//! prop-source inputs live in a model map keyed by the same UUIDs.
//!
//! # Invariants
//! - UUIDs are unique across the whole forest
//! - Every `parent`/`slot` pair resolves to an existing node and a slot its
//!   component definition declares
//! - The model map's key set is exactly the set of UUIDs in the tree

use std::collections::HashMap;

use indexmap::IndexMap;
use uuid::Uuid;

use crate::error::TreeError;
use crate::path::TreePath;
use crate::registry::ComponentRegistry;
use crate::source::PropSource;

/// Structural data of one component instance
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    uuid: Uuid,
    component_id: String,
    component_version: String,
    parent: Option<(Uuid, String)>,
    children: IndexMap<String, Vec<Uuid>>,
}

impl TreeNode {
    /// Node uuid
    #[inline]
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Component id
    #[inline]
    #[must_use]
    pub fn component_id(&self) -> &str {
        &self.component_id
    }

    /// Component version
    #[inline]
    #[must_use]
    pub fn component_version(&self) -> &str {
        &self.component_version
    }

    /// Parent uuid and slot, `None` for region roots
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<(Uuid, &str)> {
        self.parent.as_ref().map(|(uuid, slot)| (*uuid, slot.as_str()))
    }

    /// Ordered child uuids of a slot
    #[inline]
    #[must_use]
    pub fn slot_children(&self, slot: &str) -> &[Uuid] {
        self.children.get(slot).map_or(&[], Vec::as_slice)
    }

    /// Populated slots in insertion order
    pub fn slots(&self) -> impl Iterator<Item = (&str, &[Uuid])> {
        self.children
            .iter()
            .map(|(slot, children)| (slot.as_str(), children.as_slice()))
    }
}

/// Where a node (or insertion point) is attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentRef {
    /// Attached at the top of a named region
    Region(String),
    /// Attached under a node's named slot
    Slot(Uuid, String),
}

/// A forest of component instances with a prop-source model map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentTree {
    regions: IndexMap<String, Vec<Uuid>>,
    nodes: HashMap<Uuid, TreeNode>,
    model: HashMap<Uuid, IndexMap<String, PropSource>>,
}

impl ComponentTree {
    /// Create an empty forest
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes across all regions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check whether the forest holds no nodes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check whether a uuid is present
    #[inline]
    #[must_use]
    pub fn contains(&self, uuid: Uuid) -> bool {
        self.nodes.contains_key(&uuid)
    }

    /// Structural data for a node
    #[inline]
    #[must_use]
    pub fn node(&self, uuid: Uuid) -> Option<&TreeNode> {
        self.nodes.get(&uuid)
    }

    /// Prop-source inputs for a node
    #[inline]
    #[must_use]
    pub fn inputs(&self, uuid: Uuid) -> Option<&IndexMap<String, PropSource>> {
        self.model.get(&uuid)
    }

    /// Populated regions in insertion order
    pub fn regions(&self) -> impl Iterator<Item = (&str, &[Uuid])> {
        self.regions
            .iter()
            .map(|(name, roots)| (name.as_str(), roots.as_slice()))
    }

    /// Root uuids of a region
    #[inline]
    #[must_use]
    pub fn region_roots(&self, region: &str) -> Option<&[Uuid]> {
        self.regions.get(region).map(Vec::as_slice)
    }

    /// All uuids in the forest, in no particular order
    pub fn uuids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.nodes.keys().copied()
    }

    /// Set (or replace) one prop-source input on a node
    ///
    /// # Errors
    /// Returns [`TreeError::NodeNotFound`] for an unknown uuid and
    /// propagates acyclicity failures from the source.
    pub fn set_input(
        &mut self,
        uuid: Uuid,
        name: impl Into<String>,
        source: PropSource,
    ) -> Result<(), TreeError> {
        source.assert_acyclic()?;
        let inputs = self
            .model
            .get_mut(&uuid)
            .ok_or(TreeError::NodeNotFound(uuid))?;
        inputs.insert(name.into(), source);
        Ok(())
    }

    /// Remove one prop-source input from a node
    ///
    /// # Errors
    /// Returns [`TreeError::NodeNotFound`] for an unknown uuid.
    pub fn remove_input(&mut self, uuid: Uuid, name: &str) -> Result<Option<PropSource>, TreeError> {
        let inputs = self
            .model
            .get_mut(&uuid)
            .ok_or(TreeError::NodeNotFound(uuid))?;
        Ok(inputs.shift_remove(name))
    }

    /// Resolve a path to the node it addresses
    ///
    /// # Errors
    /// Returns [`TreeError::PathUnresolvable`] when any segment fails to
    /// resolve to an existing node.
    pub fn locate(&self, path: &TreePath) -> Result<Uuid, TreeError> {
        let (parent, index) = self.resolve_parent(path)?;
        self.sibling_list(&parent)
            .and_then(|siblings| siblings.get(index).copied())
            .ok_or_else(|| TreeError::PathUnresolvable(path.to_string()))
    }

    /// Resolve a path to an insertion point
    ///
    /// Unlike [`Self::locate`], the final index may equal the sibling count
    /// (append position), and the addressed region need not exist yet when
    /// the path is a bare region path with index zero.
    ///
    /// # Errors
    /// Returns [`TreeError::PathUnresolvable`] or
    /// [`TreeError::IndexOutOfBounds`].
    pub fn resolve_insertion(&self, path: &TreePath) -> Result<(ParentRef, usize), TreeError> {
        let (parent, index) = self.resolve_parent(path)?;
        let len = self.sibling_list(&parent).map_or(0, Vec::len);
        if index > len {
            return Err(TreeError::IndexOutOfBounds { index, len });
        }
        Ok((parent, index))
    }

    /// Compute the path addressing an existing node
    ///
    /// # Errors
    /// Returns [`TreeError::NodeNotFound`] for an unknown uuid.
    pub fn path_of(&self, uuid: Uuid) -> Result<TreePath, TreeError> {
        let (parent, index) = self.position_of(uuid)?;
        match parent {
            ParentRef::Region(region) => Ok(TreePath::region(region, index)),
            ParentRef::Slot(parent_uuid, slot) => {
                Ok(self.path_of(parent_uuid)?.child(slot, index))
            }
        }
    }

    /// A node and every descendant, pre-order
    ///
    /// # Errors
    /// Returns [`TreeError::NodeNotFound`] for an unknown uuid.
    pub fn descendants(&self, uuid: Uuid) -> Result<Vec<Uuid>, TreeError> {
        let node = self.nodes.get(&uuid).ok_or(TreeError::NodeNotFound(uuid))?;
        let mut out = vec![uuid];
        for (_, children) in node.slots() {
            for &child in children {
                out.extend(self.descendants(child)?);
            }
        }
        Ok(out)
    }

    /// All uuids in document order: regions in insertion order, pre-order
    /// within each region
    #[must_use]
    pub fn document_order(&self) -> Vec<Uuid> {
        let mut out = Vec::with_capacity(self.nodes.len());
        for roots in self.regions.values() {
            for &root in roots {
                self.collect_pre_order(root, &mut out);
            }
        }
        out
    }

    fn collect_pre_order(&self, uuid: Uuid, out: &mut Vec<Uuid>) {
        out.push(uuid);
        if let Some(node) = self.nodes.get(&uuid) {
            for (_, children) in node.slots() {
                for &child in children {
                    self.collect_pre_order(child, out);
                }
            }
        }
    }

    /// Verify every structural invariant against a registry
    ///
    /// # Errors
    /// Returns the first violated invariant.
    pub fn validate(&self, registry: &ComponentRegistry) -> Result<(), TreeError> {
        for roots in self.regions.values() {
            for &root in roots {
                let node = self.nodes.get(&root).ok_or(TreeError::NodeNotFound(root))?;
                if let Some((parent, _)) = node.parent() {
                    return Err(TreeError::MissingParent { uuid: root, parent });
                }
            }
        }

        for (uuid, node) in &self.nodes {
            let definition = registry
                .get(&node.component_id)
                .ok_or_else(|| TreeError::UnknownComponent(node.component_id.clone()))?;
            for (slot, children) in &node.children {
                if !definition.declares_slot(slot) {
                    return Err(TreeError::UndeclaredSlot {
                        component: node.component_id.clone(),
                        slot: slot.clone(),
                    });
                }
                for &child in children {
                    let child_node =
                        self.nodes.get(&child).ok_or(TreeError::NodeNotFound(child))?;
                    if child_node.parent != Some((*uuid, slot.clone())) {
                        return Err(TreeError::MissingParent {
                            uuid: child,
                            parent: *uuid,
                        });
                    }
                }
            }
        }

        for uuid in self.nodes.keys() {
            if !self.model.contains_key(uuid) {
                return Err(TreeError::ModelEntryMissing(*uuid));
            }
        }
        for uuid in self.model.keys() {
            if !self.nodes.contains_key(uuid) {
                return Err(TreeError::ModelEntryOrphaned(*uuid));
            }
        }
        for inputs in self.model.values() {
            for source in inputs.values() {
                source.assert_acyclic()?;
            }
        }

        // Every node must be reachable from a region exactly once.
        if self.document_order().len() != self.nodes.len() {
            return Err(TreeError::PathUnresolvable(
                "unreachable nodes present".to_string(),
            ));
        }

        Ok(())
    }

    // ---- crate-internal structure editing -------------------------------

    /// Resolve all but the final index: the parent the addressed position
    /// attaches under.
    fn resolve_parent(&self, path: &TreePath) -> Result<(ParentRef, usize), TreeError> {
        let segments = path.segments();
        let mut parent = ParentRef::Region(segments[0].slot.clone());
        for window in segments.windows(2) {
            let node = self
                .sibling_list(&parent)
                .and_then(|siblings| siblings.get(window[0].index).copied())
                .ok_or_else(|| TreeError::PathUnresolvable(path.to_string()))?;
            parent = ParentRef::Slot(node, window[1].slot.clone());
        }
        Ok((parent, path.last().index))
    }

    pub(crate) fn sibling_list(&self, parent: &ParentRef) -> Option<&Vec<Uuid>> {
        match parent {
            ParentRef::Region(region) => self.regions.get(region),
            ParentRef::Slot(uuid, slot) => {
                self.nodes.get(uuid).and_then(|node| node.children.get(slot))
            }
        }
    }

    /// Reposition a node within its current sibling list without touching
    /// the containers, so region and slot ordering stay stable.
    pub(crate) fn reposition(&mut self, parent: &ParentRef, from: usize, to: usize) {
        let siblings = match parent {
            ParentRef::Region(region) => self.regions.get_mut(region),
            ParentRef::Slot(uuid, slot) => self
                .nodes
                .get_mut(uuid)
                .and_then(|node| node.children.get_mut(slot)),
        };
        if let Some(siblings) = siblings {
            if from < siblings.len() {
                let uuid = siblings.remove(from);
                let at = to.min(siblings.len());
                siblings.insert(at, uuid);
            }
        }
    }

    /// Current attachment of a node: its parent reference and sibling index.
    pub(crate) fn position_of(&self, uuid: Uuid) -> Result<(ParentRef, usize), TreeError> {
        let node = self.nodes.get(&uuid).ok_or(TreeError::NodeNotFound(uuid))?;
        let parent = match &node.parent {
            Some((parent_uuid, slot)) => ParentRef::Slot(*parent_uuid, slot.clone()),
            None => {
                let region = self
                    .regions
                    .iter()
                    .find(|(_, roots)| roots.contains(&uuid))
                    .map(|(name, _)| name.clone())
                    .ok_or(TreeError::NodeNotFound(uuid))?;
                ParentRef::Region(region)
            }
        };
        let index = self
            .sibling_list(&parent)
            .and_then(|siblings| siblings.iter().position(|&u| u == uuid))
            .ok_or(TreeError::NodeNotFound(uuid))?;
        Ok((parent, index))
    }

    /// Add a parentless node (and its model entry) without attaching it.
    pub(crate) fn insert_detached(
        &mut self,
        uuid: Uuid,
        component_id: String,
        component_version: String,
        inputs: IndexMap<String, PropSource>,
    ) {
        self.nodes.insert(
            uuid,
            TreeNode {
                uuid,
                component_id,
                component_version,
                parent: None,
                children: IndexMap::new(),
            },
        );
        self.model.insert(uuid, inputs);
    }

    /// Link an existing detached (or freshly detached) node under a parent.
    pub(crate) fn attach(&mut self, uuid: Uuid, parent: &ParentRef, index: usize) {
        match parent {
            ParentRef::Region(region) => {
                let roots = self.regions.entry(region.clone()).or_default();
                let at = index.min(roots.len());
                roots.insert(at, uuid);
                if let Some(node) = self.nodes.get_mut(&uuid) {
                    node.parent = None;
                }
            }
            ParentRef::Slot(parent_uuid, slot) => {
                if let Some(parent_node) = self.nodes.get_mut(parent_uuid) {
                    let children = parent_node.children.entry(slot.clone()).or_default();
                    let at = index.min(children.len());
                    children.insert(at, uuid);
                }
                if let Some(node) = self.nodes.get_mut(&uuid) {
                    node.parent = Some((*parent_uuid, slot.clone()));
                }
            }
        }
    }

    /// Unlink a node from its parent's child list, returning where it was.
    ///
    /// The node and its model entry stay in place; empty regions and slot
    /// lists are pruned so structural equality is order-insensitive to
    /// removals.
    pub(crate) fn detach(&mut self, uuid: Uuid) -> Result<(ParentRef, usize), TreeError> {
        let (parent, index) = self.position_of(uuid)?;
        match &parent {
            ParentRef::Region(region) => {
                if let Some(roots) = self.regions.get_mut(region) {
                    roots.remove(index);
                    if roots.is_empty() {
                        self.regions.shift_remove(region);
                    }
                }
            }
            ParentRef::Slot(parent_uuid, slot) => {
                if let Some(parent_node) = self.nodes.get_mut(parent_uuid) {
                    if let Some(children) = parent_node.children.get_mut(slot) {
                        children.remove(index);
                        if children.is_empty() {
                            parent_node.children.shift_remove(slot);
                        }
                    }
                }
            }
        }
        Ok((parent, index))
    }

    /// Drop a detached subtree from the node and model maps.
    pub(crate) fn remove_subtree_records(&mut self, uuids: &[Uuid]) {
        for uuid in uuids {
            self.nodes.remove(uuid);
            self.model.remove(uuid);
        }
    }
}
