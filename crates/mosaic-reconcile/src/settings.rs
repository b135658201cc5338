//! Reconciler configuration

use chrono::Duration;
use serde::Deserialize;

use mosaic_canonical::NormalizerConfig;

/// Behavior knobs for the reconciliation engine
///
/// Deserializable so deployments can load it from configuration; the
/// defaults match the documented engine behavior (30-day TTL, `label` and
/// `status` safely mergeable).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReconcilerSettings {
    /// Days a draft survives after its last write
    pub ttl_days: i64,
    /// Entity types that participate in drafting
    pub eligible_entity_types: Vec<String>,
    /// Upstream fields that merge into an existing draft instead of
    /// invalidating it
    pub safe_merge_fields: Vec<String>,
    /// Per-key entries the read-through cache may hold
    pub cache_capacity: u64,
    /// Normalization rules used for hashing
    pub normalizer: NormalizerConfig,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            ttl_days: 30,
            eligible_entity_types: vec!["page".to_string(), "pattern".to_string()],
            safe_merge_fields: vec!["label".to_string(), "status".to_string()],
            cache_capacity: 10_000,
            normalizer: NormalizerConfig::default(),
        }
    }
}

impl ReconcilerSettings {
    /// Draft TTL as a duration
    #[inline]
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::days(self.ttl_days)
    }

    /// Whether an entity type participates in drafting
    #[inline]
    #[must_use]
    pub fn is_eligible(&self, entity_type: &str) -> bool {
        self.eligible_entity_types.iter().any(|t| t == entity_type)
    }

    /// Whether every changed field is safely mergeable
    #[must_use]
    pub fn all_safely_mergeable<'a>(
        &self,
        changed_fields: impl IntoIterator<Item = &'a str>,
    ) -> bool {
        changed_fields
            .into_iter()
            .all(|field| self.safe_merge_fields.iter().any(|f| f == field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = ReconcilerSettings::default();
        assert_eq!(settings.ttl(), Duration::days(30));
        assert!(settings.is_eligible("page"));
        assert!(!settings.is_eligible("menu"));
    }

    #[test]
    fn safe_merge_set() {
        let settings = ReconcilerSettings::default();
        assert!(settings.all_safely_mergeable(["label"]));
        assert!(settings.all_safely_mergeable(["label", "status"]));
        assert!(!settings.all_safely_mergeable(["label", "body"]));
    }

    #[test]
    fn deserializes_partial_config() {
        let settings: ReconcilerSettings =
            serde_json::from_str(r#"{"ttl_days": 7, "eligible_entity_types": ["page"]}"#).unwrap();
        assert_eq!(settings.ttl_days, 7);
        assert_eq!(settings.safe_merge_fields.len(), 2);
    }
}
