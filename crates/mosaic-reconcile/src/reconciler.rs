//! The reconciliation engine
//!
//! [`DraftReconciler`] decides, on every save and on every change to the
//! published entity, whether a draft must be written, updated, merged, or
//! discarded. Two views of the same key are maintained:
//!
//! - the persisted [`DraftRecord`] in the expiring draft store
//! - pending form violations in a shadow store with identical keying and
//!   TTL, so unsaved-but-invalid edits are not silently discarded
//!
//! Saves are last-write-wins: no concurrency token is checked, and two
//! concurrent writers to the same key overwrite each other. The upsert is
//! a pure compare-then-write against the store — it never re-enters
//! itself, so no re-entrancy guard exists.

use tracing::{debug, warn};

use mosaic_canonical::{Digest, EntityData, Normalizer};
use mosaic_store::{CacheStats, CachedStore, ExpiringStore, MemoryStore, TagInvalidatedCache};

use crate::error::ReconcileError;
use crate::key::DraftKey;
use crate::mutators::{DraftMutator, DraftRecordBuilder, MutatorRegistry};
use crate::provider::PublishedProvider;
use crate::record::{DraftRecord, DraftSummary, StoredDraft};
use crate::settings::ReconcilerSettings;
use crate::state::DraftState;
use crate::violations::{FormViolation, ViolationList};

/// Orchestrates draft persistence against published state
pub struct DraftReconciler<P: PublishedProvider> {
    provider: P,
    settings: ReconcilerSettings,
    normalizer: Normalizer,
    drafts: CachedStore<MemoryStore<StoredDraft>, StoredDraft>,
    violations: MemoryStore<ViolationList>,
    hydrations: TagInvalidatedCache<EntityData>,
    mutators: MutatorRegistry,
}

impl<P: PublishedProvider> DraftReconciler<P> {
    /// Engine over a published-entity provider and settings
    #[must_use]
    pub fn new(provider: P, settings: ReconcilerSettings) -> Self {
        let normalizer = Normalizer::new(settings.normalizer.clone());
        let drafts = CachedStore::new(MemoryStore::new(settings.ttl()), settings.cache_capacity);
        let violations = MemoryStore::new(settings.ttl());
        let hydrations = TagInvalidatedCache::new(settings.cache_capacity);
        Self {
            provider,
            settings,
            normalizer,
            drafts,
            violations,
            hydrations,
            mutators: MutatorRegistry::new(),
        }
    }

    /// Engine with default settings
    #[must_use]
    pub fn with_defaults(provider: P) -> Self {
        Self::new(provider, ReconcilerSettings::default())
    }

    /// Append a draft mutator to the ordered chain
    pub fn register_mutator(&mut self, mutator: std::sync::Arc<dyn DraftMutator>) {
        self.mutators.register(mutator);
    }

    /// Active settings
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ReconcilerSettings {
        &self.settings
    }

    /// Persist or collapse a draft for the submitted entity state
    ///
    /// Hashes the submitted state and the published state; equal hashes
    /// collapse any existing draft, differing hashes upsert one. The
    /// violation store is left untouched either way.
    ///
    /// # Errors
    /// Returns [`ReconcileError`] only for programming-error conditions
    /// (hashing or encoding a well-formed record failing).
    pub fn save(
        &self,
        entity: &EntityData,
        client_id: Option<&str>,
        owner_id: &str,
    ) -> Result<DraftState, ReconcileError> {
        let key = DraftKey::for_entity(entity);
        let storage_key = key.storage_key();

        let new_hash = Digest::of_canonical(&self.normalizer.normalize(entity))?;
        let published = self
            .provider
            .load_published(&key)
            .unwrap_or_else(|| Self::absent_published(&key));
        let published_hash = Digest::of_canonical(&self.normalizer.normalize(&published))?;

        let has_violations = self.has_pending_violations(&storage_key);

        if new_hash == published_hash {
            debug!(key = %key, "submitted state matches published, collapsing draft");
            self.drafts.delete(&storage_key);
            self.hydrations.purge(&storage_key);
            return Ok(if has_violations {
                DraftState::DraftPresentWithViolations
            } else {
                DraftState::NoDraft
            });
        }

        let candidate = DraftRecord {
            entity_type: entity.entity_type.clone(),
            entity_id: entity.entity_id.clone(),
            data: entity.fields.clone(),
            langcode: entity.langcode.clone(),
            label: entity
                .label()
                .unwrap_or(entity.entity_id.as_str())
                .to_string(),
            data_hash: new_hash,
            client_id: client_id.map(str::to_string),
            owner_id: owner_id.to_string(),
        };
        let mut builder = DraftRecordBuilder::new(candidate);
        self.mutators.run(&mut builder);
        let record = builder.finish()?;

        self.drafts.set(&storage_key, StoredDraft::encode(&record)?);
        self.hydrations.purge(&storage_key);
        debug!(key = %key, hash = %record.data_hash, "draft saved");

        Ok(if has_violations {
            DraftState::DraftPresentWithViolations
        } else {
            DraftState::DraftPresent
        })
    }

    /// Current draft for a key, served through the cache
    ///
    /// A stored blob that fails to parse is logged and reported as absent,
    /// never raised.
    #[must_use]
    pub fn get(&self, key: &DraftKey) -> Option<DraftRecord> {
        let entry = self.drafts.get(&key.storage_key())?;
        match entry.value.decode() {
            Ok(record) => Some(record),
            Err(error) => {
                warn!(key = %key, %error, "stored draft failed to parse, treating as absent");
                None
            }
        }
    }

    /// Current state of a key
    #[must_use]
    pub fn state(&self, key: &DraftKey) -> DraftState {
        let has_draft = self.get(key).is_some();
        let has_violations = self.has_pending_violations(&key.storage_key());
        match (has_draft, has_violations) {
            (_, true) => DraftState::DraftPresentWithViolations,
            (true, false) => DraftState::DraftPresent,
            (false, false) => DraftState::NoDraft,
        }
    }

    /// Materialize the draft payload over the published entity
    ///
    /// The result is cached tag-invalidated and rebuilt from the record
    /// whenever the key changes.
    #[must_use]
    pub fn hydrate(&self, key: &DraftKey) -> Option<EntityData> {
        let storage_key = key.storage_key();
        if let Some(cached) = self.hydrations.get(&storage_key) {
            return cached;
        }

        let hydrated = self.get(key).map(|record| {
            let mut entity = self
                .provider
                .load_published(key)
                .unwrap_or_else(|| Self::absent_published(key));
            for (name, value) in &record.data {
                entity.set_field(name.clone(), value.clone());
            }
            entity
        });
        self.hydrations.insert(&storage_key, hydrated.clone());
        hydrated
    }

    /// Delete a draft and its pending violations
    pub fn delete(&self, key: &DraftKey) -> bool {
        let storage_key = key.storage_key();
        let existed = self.drafts.delete(&storage_key);
        self.violations.delete(&storage_key);
        self.hydrations.purge(&storage_key);
        existed
    }

    /// Delete every draft and every pending violation
    pub fn delete_all(&self) {
        self.drafts.delete_all();
        self.violations.delete_all();
        self.hydrations.purge_all();
    }

    /// Summaries of all live drafts, key-ordered
    #[must_use]
    pub fn list(&self, with_payloads_only: bool) -> Vec<DraftSummary> {
        self.drafts
            .list(with_payloads_only)
            .into_iter()
            .filter_map(|(key, entry)| match entry.value.decode() {
                Ok(record) => Some(DraftSummary {
                    key,
                    label: record.label,
                    owner_id: record.owner_id,
                    client_id: record.client_id,
                    updated_at: entry.updated_at,
                }),
                Err(error) => {
                    warn!(key, %error, "stored draft failed to parse, omitting from list");
                    None
                }
            })
            .collect()
    }

    /// Reconcile an existing draft with a save of the published entity
    ///
    /// Non-eligible entity types and missing published entities are
    /// no-ops. When every changed field is safely mergeable the fields are
    /// patched into the draft payload and the draft is re-saved with a
    /// recomputed hash; any other changed field means the draft's basis
    /// has drifted and the draft is discarded.
    ///
    /// # Errors
    /// Returns [`ReconcileError`] only for programming-error conditions.
    pub fn on_upstream_change(
        &self,
        entity: &EntityData,
        changed_fields: &[&str],
    ) -> Result<(), ReconcileError> {
        if !self.settings.is_eligible(&entity.entity_type) {
            return Ok(());
        }
        let key = DraftKey::for_entity(entity);

        let Some(published) = self.provider.load_published(&key) else {
            debug!(key = %key, "published entity missing, nothing to reconcile");
            return Ok(());
        };
        let Some(mut record) = self.get(&key) else {
            return Ok(());
        };

        if !self.settings.all_safely_mergeable(changed_fields.iter().copied()) {
            debug!(key = %key, ?changed_fields, "upstream drift not mergeable, discarding draft");
            self.delete(&key);
            return Ok(());
        }

        for field in changed_fields {
            match published.field(field) {
                Some(value) => {
                    record.data.insert((*field).to_string(), value.clone());
                }
                None => {
                    record.data.shift_remove(*field);
                }
            }
        }
        if changed_fields.contains(&"label") {
            if let Some(label) = published.label() {
                record.label = label.to_string();
            }
        }
        record.data_hash =
            Digest::of_canonical(&self.normalizer.normalize(&record.to_entity()))?;

        let storage_key = key.storage_key();
        self.drafts.set(&storage_key, StoredDraft::encode(&record)?);
        self.hydrations.purge(&storage_key);
        debug!(key = %key, ?changed_fields, "merged upstream fields into draft");
        Ok(())
    }

    /// Record (or clear) pending form violations for an entity
    ///
    /// `None` or an empty set clears the key's violations.
    pub fn record_form_violations(
        &self,
        entity: &EntityData,
        violations: Option<Vec<FormViolation>>,
    ) {
        let key = DraftKey::for_entity(entity).storage_key();
        match violations {
            Some(list) if !list.is_empty() => {
                self.violations.set(&key, ViolationList(list));
            }
            _ => {
                self.violations.delete(&key);
            }
        }
    }

    /// Pending violations for a key, if any
    #[must_use]
    pub fn pending_violations(&self, key: &DraftKey) -> Option<Vec<FormViolation>> {
        self.violations
            .get(&key.storage_key())
            .map(|entry| entry.value.0)
    }

    /// Read-through cache counters for the draft store
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.drafts.stats()
    }

    fn has_pending_violations(&self, storage_key: &str) -> bool {
        self.violations
            .get(storage_key)
            .map_or(false, |entry| !entry.value.is_empty())
    }

    /// Stand-in for a published entity that does not exist: same identity,
    /// empty field payload, so any drafted fields always differ.
    fn absent_published(key: &DraftKey) -> EntityData {
        let mut entity = EntityData::new(key.entity_type.clone(), key.entity_id.clone());
        if let Some(language) = &key.language {
            entity = entity.with_langcode(language.clone());
        }
        entity
    }
}

impl<P: PublishedProvider> std::fmt::Debug for DraftReconciler<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftReconciler")
            .field("settings", &self.settings)
            .field("mutators", &self.mutators)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockPublishedProvider;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Canned provider over a fixed set of published entities.
    struct FixedProvider {
        published: HashMap<String, EntityData>,
    }

    impl FixedProvider {
        fn new(entities: impl IntoIterator<Item = EntityData>) -> Self {
            Self {
                published: entities
                    .into_iter()
                    .map(|entity| (DraftKey::for_entity(&entity).storage_key(), entity))
                    .collect(),
            }
        }

        fn empty() -> Self {
            Self {
                published: HashMap::new(),
            }
        }
    }

    impl PublishedProvider for FixedProvider {
        fn load_published(&self, key: &DraftKey) -> Option<EntityData> {
            self.published.get(&key.storage_key()).cloned()
        }
    }

    fn published_page() -> EntityData {
        EntityData::new("page", "1")
            .with_field("label", json!("Hello"))
            .with_field("status", json!(true))
            .with_field("body", json!("published body"))
    }

    #[test]
    fn noop_save_collapses_draft() {
        let published = published_page();
        let engine = DraftReconciler::with_defaults(FixedProvider::new([published.clone()]));
        let key = DraftKey::for_entity(&published);

        // A real edit creates a draft.
        let edited = published.clone().with_field("body", json!("draft body"));
        assert_eq!(
            engine.save(&edited, Some("client-a"), "editor-1").unwrap(),
            DraftState::DraftPresent
        );
        assert!(engine.get(&key).is_some());

        // Reverting to the published state collapses it.
        assert_eq!(
            engine.save(&published, Some("client-a"), "editor-1").unwrap(),
            DraftState::NoDraft
        );
        assert!(engine.get(&key).is_none());
    }

    #[test]
    fn save_round_trip_hash() {
        let published = published_page();
        let engine = DraftReconciler::with_defaults(FixedProvider::new([published.clone()]));

        let edited = published.with_field("body", json!("draft body"));
        engine.save(&edited, None, "editor-1").unwrap();

        let record = engine.get(&DraftKey::for_entity(&edited)).unwrap();
        let normalizer = Normalizer::new(engine.settings().normalizer.clone());
        assert_eq!(
            record.data_hash,
            Digest::of_canonical(&normalizer.normalize(&edited)).unwrap()
        );
    }

    #[test]
    fn hash_sequence_scenario() {
        let published = EntityData::new("page", "1").with_field("title", json!("Hello"));
        let engine = DraftReconciler::with_defaults(FixedProvider::new([published.clone()]));
        let key = DraftKey::for_entity(&published);

        assert_eq!(engine.state(&key), DraftState::NoDraft);

        let world = published.clone().with_field("title", json!("World"));
        engine.save(&world, None, "editor-1").unwrap();
        let h1 = engine.get(&key).unwrap().data_hash;
        assert_eq!(engine.state(&key), DraftState::DraftPresent);

        let other = published.clone().with_field("title", json!("Elsewhere"));
        engine.save(&other, None, "editor-1").unwrap();
        let h2 = engine.get(&key).unwrap().data_hash;
        assert_ne!(h1, h2);

        engine.save(&published, None, "editor-1").unwrap();
        assert_eq!(engine.state(&key), DraftState::NoDraft);
    }

    #[test]
    fn volatile_field_changes_do_not_create_drafts() {
        let published = published_page();
        let engine = DraftReconciler::with_defaults(FixedProvider::new([published.clone()]));

        let touched = published.with_field("changed", json!(1_722_000_000));
        assert_eq!(
            engine.save(&touched, None, "editor-1").unwrap(),
            DraftState::NoDraft
        );
    }

    #[test]
    fn safe_field_merge_updates_draft() {
        let original = published_page();
        let mut renamed = original.clone();
        renamed.set_field("label", json!("Renamed"));

        // The provider already sees the renamed published entity.
        let engine = DraftReconciler::with_defaults(FixedProvider::new([renamed.clone()]));
        let key = DraftKey::for_entity(&original);

        // Draft based on the original state plus a body edit.
        let edited = original.clone().with_field("body", json!("draft body"));
        engine.save(&edited, None, "editor-1").unwrap();

        engine.on_upstream_change(&renamed, &["label"]).unwrap();

        let record = engine.get(&key).unwrap();
        assert_eq!(record.data.get("label"), Some(&json!("Renamed")));
        assert_eq!(record.label, "Renamed");
        assert_eq!(engine.state(&key), DraftState::DraftPresent);
    }

    #[test]
    fn unsafe_field_change_discards_draft() {
        let published = published_page();
        let engine = DraftReconciler::with_defaults(FixedProvider::new([published.clone()]));
        let key = DraftKey::for_entity(&published);

        let edited = published.clone().with_field("body", json!("draft body"));
        engine.save(&edited, None, "editor-1").unwrap();

        engine
            .on_upstream_change(&published, &["label", "body"])
            .unwrap();

        assert_eq!(engine.state(&key), DraftState::NoDraft);
    }

    #[test]
    fn upstream_change_for_ineligible_type_is_noop() {
        let mut provider = MockPublishedProvider::new();
        provider.expect_load_published().never();

        let engine = DraftReconciler::with_defaults(provider);
        let entity = EntityData::new("menu", "main").with_field("label", json!("Main"));
        engine.on_upstream_change(&entity, &["label"]).unwrap();
    }

    #[test]
    fn missing_published_entity_is_noop() {
        let mut provider = MockPublishedProvider::new();
        provider.expect_load_published().returning(|_| None);

        let engine = DraftReconciler::with_defaults(provider);
        let entity = published_page();
        engine.on_upstream_change(&entity, &["body"]).unwrap();
        assert_eq!(engine.state(&DraftKey::for_entity(&entity)), DraftState::NoDraft);
    }

    #[test]
    fn malformed_stored_record_reads_as_absent() {
        let published = published_page();
        let engine = DraftReconciler::with_defaults(FixedProvider::new([published.clone()]));
        let key = DraftKey::for_entity(&published);

        let edited = published.with_field("body", json!("draft body"));
        engine.save(&edited, None, "editor-1").unwrap();

        // Corrupt the stored blob underneath the engine.
        engine.drafts.set(
            &key.storage_key(),
            StoredDraft(json!({"entity_type": "page", "data": 17})),
        );

        assert!(engine.get(&key).is_none());
        assert_eq!(engine.state(&key), DraftState::NoDraft);
        assert!(engine.list(false).is_empty());
    }

    #[test]
    fn violations_shadow_the_draft_lifecycle() {
        let published = published_page();
        let engine = DraftReconciler::with_defaults(FixedProvider::new([published.clone()]));
        let key = DraftKey::for_entity(&published);

        engine.record_form_violations(
            &published,
            Some(vec![FormViolation::on_field("label", "may not be empty")]),
        );
        assert_eq!(engine.state(&key), DraftState::DraftPresentWithViolations);

        // Collapse keeps violations in place.
        engine.save(&published, None, "editor-1").unwrap();
        assert_eq!(engine.state(&key), DraftState::DraftPresentWithViolations);

        // Clearing them returns to what the draft store dictates.
        engine.record_form_violations(&published, None);
        assert_eq!(engine.state(&key), DraftState::NoDraft);
    }

    #[test]
    fn delete_clears_violations_too() {
        let published = published_page();
        let engine = DraftReconciler::with_defaults(FixedProvider::new([published.clone()]));
        let key = DraftKey::for_entity(&published);

        let edited = published.clone().with_field("body", json!("draft body"));
        engine.save(&edited, None, "editor-1").unwrap();
        engine.record_form_violations(
            &published,
            Some(vec![FormViolation::on_entity("incomplete")]),
        );

        assert!(engine.delete(&key));
        assert_eq!(engine.state(&key), DraftState::NoDraft);
        assert!(engine.pending_violations(&key).is_none());
    }

    #[test]
    fn hydrate_overlays_draft_on_published() {
        let published = published_page();
        let engine = DraftReconciler::with_defaults(FixedProvider::new([published.clone()]));
        let key = DraftKey::for_entity(&published);

        let edited = published.clone().with_field("body", json!("draft body"));
        engine.save(&edited, None, "editor-1").unwrap();

        let hydrated = engine.hydrate(&key).unwrap();
        assert_eq!(hydrated.field("body"), Some(&json!("draft body")));
        assert_eq!(hydrated.field("status"), Some(&json!(true)));

        // A later save rebuilds the hydration.
        let further = published.clone().with_field("body", json!("newer body"));
        engine.save(&further, None, "editor-1").unwrap();
        assert_eq!(
            engine.hydrate(&key).unwrap().field("body"),
            Some(&json!("newer body"))
        );

        engine.delete(&key);
        assert!(engine.hydrate(&key).is_none());
    }

    #[test]
    fn mutators_shape_the_persisted_record() {
        struct StampClient;
        impl DraftMutator for StampClient {
            fn name(&self) -> &str {
                "stamp_client"
            }
            fn mutate(&self, builder: &mut DraftRecordBuilder) {
                builder.set_client_id(Some("stamped".to_string()));
            }
        }

        let published = published_page();
        let mut engine = DraftReconciler::with_defaults(FixedProvider::new([published.clone()]));
        engine.register_mutator(Arc::new(StampClient));

        let edited = published.clone().with_field("body", json!("draft body"));
        engine.save(&edited, None, "editor-1").unwrap();

        let record = engine.get(&DraftKey::for_entity(&published)).unwrap();
        assert_eq!(record.client_id.as_deref(), Some("stamped"));
    }

    #[test]
    fn first_save_of_new_entity_is_always_a_draft() {
        let engine = DraftReconciler::with_defaults(FixedProvider::empty());
        let entity = EntityData::new("page", "99").with_field("label", json!("Fresh"));

        assert_eq!(
            engine.save(&entity, None, "editor-1").unwrap(),
            DraftState::DraftPresent
        );
    }

    #[test]
    fn list_surfaces_owner_and_timestamp() {
        let one = published_page();
        let two = EntityData::new("page", "2").with_field("label", json!("Second"));
        let engine =
            DraftReconciler::with_defaults(FixedProvider::new([one.clone(), two.clone()]));

        engine
            .save(&one.clone().with_field("body", json!("x")), None, "editor-1")
            .unwrap();
        engine
            .save(&two.clone().with_field("body", json!("y")), None, "editor-2")
            .unwrap();

        let listed = engine.list(true);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].key, "page:1");
        assert_eq!(listed[0].owner_id, "editor-1");
        assert_eq!(listed[1].key, "page:2");
        assert_eq!(listed[1].owner_id, "editor-2");
    }
}
