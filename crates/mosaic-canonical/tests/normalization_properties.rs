//! Property tests for normalization and hashing

use indexmap::IndexMap;
use mosaic_canonical::{Digest, EntityData, Normalizer, NormalizerConfig};
use proptest::prelude::*;
use serde_json::{json, Value};

fn scalar_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::Bool),
        "[a-z℞␟]{0,12}".prop_map(Value::String),
        Just(Value::Null),
    ]
}

fn field_entries() -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::btree_map("[a-z_]{1,8}", scalar_value(), 1..8)
        .prop_map(|map| map.into_iter().collect())
}

proptest! {
    /// Insertion order of composite values never changes the form.
    #[test]
    fn normalization_is_order_independent(entries in field_entries().prop_shuffle()) {
        let normalizer = Normalizer::new(NormalizerConfig::default());

        let forward: IndexMap<String, Value> = entries.iter().cloned().collect();
        let reversed: IndexMap<String, Value> = entries.iter().rev().cloned().collect();

        let a = EntityData {
            entity_type: "page".to_string(),
            entity_id: "1".to_string(),
            langcode: None,
            fields: forward,
        };
        let b = EntityData {
            entity_type: "page".to_string(),
            entity_id: "1".to_string(),
            langcode: None,
            fields: reversed,
        };

        prop_assert_eq!(normalizer.normalize(&a), normalizer.normalize(&b));
    }

    /// The digest is stable across repeated hashing and a text round trip.
    #[test]
    fn digest_is_deterministic(entries in field_entries()) {
        let normalizer = Normalizer::new(NormalizerConfig::default());
        let entity = EntityData {
            entity_type: "page".to_string(),
            entity_id: "1".to_string(),
            langcode: None,
            fields: entries.into_iter().collect(),
        };

        let form = normalizer.normalize(&entity);
        let first = Digest::of_canonical(&form).unwrap();
        let second = Digest::of_canonical(&form).unwrap();
        prop_assert_eq!(first, second);

        let text = serde_json::to_string(form.as_value()).unwrap();
        let back: Value = serde_json::from_str(&text).unwrap();
        prop_assert_eq!(Digest::compute(&serde_json::to_vec(&back).unwrap()), first);
    }
}

#[test]
fn nested_permutations_normalize_identically() {
    let normalizer = Normalizer::new(NormalizerConfig::default());

    let a = EntityData::new("page", "1").with_field(
        "settings",
        serde_json::from_str(r#"{"outer": {"a": 1, "b": [{"x": 1, "y": 2}]}}"#).unwrap(),
    );
    let b = EntityData::new("page", "1").with_field(
        "settings",
        serde_json::from_str(r#"{"outer": {"b": [{"y": 2, "x": 1}], "a": 1}}"#).unwrap(),
    );

    assert_eq!(normalizer.normalize(&a), normalizer.normalize(&b));
    assert_eq!(
        Digest::of_canonical(&normalizer.normalize(&a)).unwrap(),
        Digest::of_canonical(&normalizer.normalize(&b)).unwrap()
    );
}

#[test]
fn tree_fields_hash_through_optimize_inputs() {
    use mosaic_tree::{
        ComponentDefinition, ComponentRegistry, ComponentTree, NodeTemplate, PropSource,
        TreeMutation, TreePath,
    };

    let mut registry = ComponentRegistry::new();
    registry.register(ComponentDefinition::new("heading", "1.0.0"));

    let mut tree = ComponentTree::new();
    let uuid = TreeMutation::Insert {
        template: NodeTemplate::new("heading", "1.0.0").with_input(
            "text",
            PropSource::literal(json!("Hello"), "string", "℞string"),
        ),
        at: TreePath::region("content", 0),
        pinned_uuid: None,
    }
    .apply(&mut tree, &registry)
    .unwrap()
    .unwrap();

    let normalizer = Normalizer::new(NormalizerConfig::default());
    let plain = normalizer.normalize(
        &EntityData::new("page", "1")
            .with_field("component_tree", serde_json::to_value(&tree).unwrap()),
    );

    // The same tree with a populated resolution cache hashes identically.
    tree.set_input(
        uuid,
        "text",
        PropSource::Static {
            value: json!("Hello"),
            field_type: "string".to_string(),
            expression: "℞string".to_string(),
            cached_resolution: Some(json!("<h1>Hello</h1>")),
        },
    )
    .unwrap();
    let cached = normalizer.normalize(
        &EntityData::new("page", "1")
            .with_field("component_tree", serde_json::to_value(&tree).unwrap()),
    );

    assert_eq!(
        Digest::of_canonical(&plain).unwrap(),
        Digest::of_canonical(&cached).unwrap()
    );
}
