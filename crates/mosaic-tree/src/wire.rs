//! Flat wire format
//!
//! The tree travels between client and server as an ordered array of nodes
//! in document order. Roots carry their region name in `slot` and no
//! `parent_uuid`; every other node carries both. [`ComponentTree`]'s serde
//! implementations go through this shape, so a tree field embeds naturally
//! in entity JSON.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::TreeError;
use crate::source::PropSource;
use crate::tree::{ComponentTree, ParentRef};

/// One node of the flat wire array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireNode {
    /// Node uuid
    pub uuid: Uuid,
    /// Component id
    pub component_id: String,
    /// Component version
    pub component_version: String,
    /// Parent uuid; absent for region roots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_uuid: Option<Uuid>,
    /// Parent slot name; for region roots, the region name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
    /// Prop-source inputs
    #[serde(default)]
    pub inputs: IndexMap<String, PropSource>,
}

impl ComponentTree {
    /// Flatten to the wire array in document order
    #[must_use]
    pub fn to_wire(&self) -> Vec<WireNode> {
        self.document_order()
            .into_iter()
            .filter_map(|uuid| {
                let node = self.node(uuid)?;
                let inputs = self.inputs(uuid).cloned().unwrap_or_default();
                let (parent_uuid, slot) = match node.parent() {
                    Some((parent, slot)) => (Some(parent), Some(slot.to_string())),
                    None => {
                        let region = self
                            .regions()
                            .find(|(_, roots)| roots.contains(&uuid))
                            .map(|(name, _)| name.to_string());
                        (None, region)
                    }
                };
                Some(WireNode {
                    uuid,
                    component_id: node.component_id().to_string(),
                    component_version: node.component_version().to_string(),
                    parent_uuid,
                    slot,
                    inputs,
                })
            })
            .collect()
    }

    /// Rebuild a tree from a wire array
    ///
    /// Structural invariants (uuid uniqueness, parent resolution, region
    /// presence on roots, acyclic sources) are enforced here; slot
    /// declarations need a registry and are checked by
    /// [`ComponentTree::validate`].
    ///
    /// # Errors
    /// Returns the first structural violation.
    pub fn from_wire(nodes: &[WireNode]) -> Result<Self, TreeError> {
        let mut tree = Self::new();

        for node in nodes {
            if tree.contains(node.uuid) {
                return Err(TreeError::DuplicateUuid(node.uuid));
            }
            for source in node.inputs.values() {
                source.assert_acyclic()?;
            }
            tree.insert_detached(
                node.uuid,
                node.component_id.clone(),
                node.component_version.clone(),
                node.inputs.clone(),
            );
        }

        // Attach in array order so sibling order follows the document.
        for node in nodes {
            let parent = match (node.parent_uuid, node.slot.as_deref()) {
                (Some(parent), Some(slot)) => {
                    if !tree.contains(parent) {
                        return Err(TreeError::MissingParent {
                            uuid: node.uuid,
                            parent,
                        });
                    }
                    ParentRef::Slot(parent, slot.to_string())
                }
                (Some(parent), None) => {
                    return Err(TreeError::MissingParent {
                        uuid: node.uuid,
                        parent,
                    })
                }
                (None, Some(region)) => ParentRef::Region(region.to_string()),
                (None, None) => return Err(TreeError::MissingRegion(node.uuid)),
            };
            let position = tree.sibling_list(&parent).map_or(0, Vec::len);
            tree.attach(node.uuid, &parent, position);
        }

        Ok(tree)
    }

    /// Canonical JSON representation used for hashing
    ///
    /// Document-order array of sorted-key node objects with canonicalized
    /// prop sources (resolution caches stripped, typed scalars cast,
    /// default-valued statics collapsed).
    #[must_use]
    pub fn canonical_value(&self) -> Value {
        let nodes = self
            .to_wire()
            .into_iter()
            .map(|node| {
                let mut map = Map::new();
                map.insert("uuid".to_string(), Value::String(node.uuid.to_string()));
                map.insert(
                    "component_id".to_string(),
                    Value::String(node.component_id),
                );
                map.insert(
                    "component_version".to_string(),
                    Value::String(node.component_version),
                );
                if let Some(parent) = node.parent_uuid {
                    map.insert(
                        "parent_uuid".to_string(),
                        Value::String(parent.to_string()),
                    );
                }
                if let Some(slot) = node.slot {
                    map.insert("slot".to_string(), Value::String(slot));
                }
                let mut inputs = Map::new();
                for (name, source) in &node.inputs {
                    inputs.insert(name.clone(), source.canonical_value());
                }
                map.insert("inputs".to_string(), Value::Object(inputs));
                Value::Object(map)
            })
            .collect();
        Value::Array(nodes)
    }
}

impl Serialize for ComponentTree {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ComponentTree {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nodes = Vec::<WireNode>::deserialize(deserializer)?;
        Self::from_wire(&nodes).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::{NodeTemplate, TreeMutation};
    use crate::path::TreePath;
    use crate::registry::{ComponentDefinition, ComponentRegistry};
    use serde_json::json;

    fn registry() -> ComponentRegistry {
        let mut registry = ComponentRegistry::new();
        registry.register(ComponentDefinition::new("hero", "1.0.0"));
        registry.register(ComponentDefinition::new("section", "1.0.0").with_slot("body"));
        registry
    }

    fn sample_tree(registry: &ComponentRegistry) -> ComponentTree {
        let mut tree = ComponentTree::new();
        TreeMutation::Insert {
            template: NodeTemplate::new("section", "1.0.0").with_child(
                "body",
                NodeTemplate::new("hero", "1.0.0").with_input(
                    "title",
                    PropSource::literal(json!("Hello"), "string", "℞string"),
                ),
            ),
            at: TreePath::region("content", 0),
            pinned_uuid: None,
        }
        .apply(&mut tree, registry)
        .unwrap();
        tree
    }

    #[test]
    fn wire_round_trip_preserves_tree() {
        let registry = registry();
        let tree = sample_tree(&registry);

        let wire = tree.to_wire();
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].slot.as_deref(), Some("content"));
        assert!(wire[0].parent_uuid.is_none());
        assert_eq!(wire[1].parent_uuid, Some(wire[0].uuid));
        assert_eq!(wire[1].slot.as_deref(), Some("body"));

        let rebuilt = ComponentTree::from_wire(&wire).unwrap();
        assert_eq!(rebuilt, tree);
        assert!(rebuilt.validate(&registry).is_ok());
    }

    #[test]
    fn serde_round_trip_through_json() {
        let registry = registry();
        let tree = sample_tree(&registry);

        let json = serde_json::to_value(&tree).unwrap();
        assert!(json.is_array());

        let decoded: ComponentTree = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, tree);
    }

    #[test]
    fn from_wire_rejects_duplicate_uuid() {
        let registry = registry();
        let mut wire = sample_tree(&registry).to_wire();
        wire[1].uuid = wire[0].uuid;

        assert!(matches!(
            ComponentTree::from_wire(&wire),
            Err(TreeError::DuplicateUuid(_))
        ));
    }

    #[test]
    fn from_wire_rejects_dangling_parent() {
        let registry = registry();
        let mut wire = sample_tree(&registry).to_wire();
        wire[1].parent_uuid = Some(Uuid::new_v4());

        assert!(matches!(
            ComponentTree::from_wire(&wire),
            Err(TreeError::MissingParent { .. })
        ));
    }

    #[test]
    fn from_wire_rejects_root_without_region() {
        let registry = registry();
        let mut wire = sample_tree(&registry).to_wire();
        wire[0].slot = None;

        assert!(matches!(
            ComponentTree::from_wire(&wire),
            Err(TreeError::MissingRegion(_))
        ));
    }

    #[test]
    fn canonical_value_ignores_resolution_cache() {
        let registry = registry();
        let mut tree = sample_tree(&registry);
        let hero = tree
            .document_order()
            .into_iter()
            .find(|&u| tree.node(u).unwrap().component_id() == "hero")
            .unwrap();

        let plain = tree.canonical_value();
        tree.set_input(
            hero,
            "title",
            PropSource::Static {
                value: json!("Hello"),
                field_type: "string".to_string(),
                expression: "℞string".to_string(),
                cached_resolution: Some(json!("Hello, resolved")),
            },
        )
        .unwrap();

        assert_eq!(tree.canonical_value(), plain);
    }
}
