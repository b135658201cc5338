//! Testing utilities for the mosaic workspace
//!
//! Shared fixtures: component registries, tree builders, sample entities,
//! and an in-memory published-entity provider.

#![allow(missing_docs)]

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::json;

use mosaic_canonical::EntityData;
use mosaic_reconcile::{DraftKey, PublishedProvider};
use mosaic_tree::{
    ComponentDefinition, ComponentRegistry, ComponentTree, NodeTemplate, PropSource, TreeMutation,
    TreePath,
};

/// Registry with the component definitions used across the test suites.
pub fn page_registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    registry.register(
        ComponentDefinition::new("two_column", "1.0.0")
            .with_slot("column_one")
            .with_slot("column_two"),
    );
    registry.register(ComponentDefinition::new("heading", "1.0.0"));
    registry.register(ComponentDefinition::new("image", "1.0.0"));
    registry
}

/// A two-column layout with a heading and an image in the first column.
pub fn sample_tree(registry: &ComponentRegistry) -> ComponentTree {
    let mut tree = ComponentTree::new();
    TreeMutation::Insert {
        template: NodeTemplate::new("two_column", "1.0.0")
            .with_child(
                "column_one",
                NodeTemplate::new("heading", "1.0.0").with_input(
                    "text",
                    PropSource::literal(json!("Welcome"), "string", "℞string"),
                ),
            )
            .with_child(
                "column_one",
                NodeTemplate::new("image", "1.0.0")
                    .with_input("src", PropSource::dynamic("entity:media:field_image")),
            ),
        at: TreePath::region("content", 0),
        pinned_uuid: None,
    }
    .apply(&mut tree, registry)
    .expect("fixture tree must build")
    .expect("insert returns the new root");
    tree
}

/// A published page entity carrying a component tree field.
pub fn published_page(entity_id: &str) -> EntityData {
    let registry = page_registry();
    let tree = sample_tree(&registry);
    EntityData::new("page", entity_id)
        .with_field("label", json!("Landing page"))
        .with_field("status", json!(true))
        .with_field(
            "component_tree",
            serde_json::to_value(&tree).expect("fixture tree serializes"),
        )
}

/// Mutable in-memory published-entity storage for integration tests.
#[derive(Default)]
pub struct InMemoryPublished {
    entities: RwLock<HashMap<String, EntityData>>,
}

impl InMemoryPublished {
    pub fn new(entities: impl IntoIterator<Item = EntityData>) -> Self {
        let store = Self::default();
        for entity in entities {
            store.publish(entity);
        }
        store
    }

    /// Insert or replace a published entity.
    pub fn publish(&self, entity: EntityData) {
        let key = DraftKey::for_entity(&entity).storage_key();
        self.entities.write().insert(key, entity);
    }

    /// Remove a published entity.
    pub fn unpublish(&self, key: &DraftKey) {
        self.entities.write().remove(&key.storage_key());
    }
}

impl PublishedProvider for InMemoryPublished {
    fn load_published(&self, key: &DraftKey) -> Option<EntityData> {
        self.entities.read().get(&key.storage_key()).cloned()
    }
}
