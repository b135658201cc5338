//! Draft records
//!
//! [`DraftRecord`] is the persisted shape of one draft, serialized exactly
//! as external callers see it: `{entity_type, entity_id, data, langcode,
//! label, data_hash, client_id, owner_id}`. Records are stored as raw JSON
//! ([`StoredDraft`]) and parsed on read, so a blob that fails to parse is
//! handled as an absent draft instead of an error.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use mosaic_canonical::{Digest, EntityData};
use mosaic_store::StoredValue;

use crate::key::DraftKey;

/// One persisted draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRecord {
    /// Entity type id
    pub entity_type: String,
    /// Entity id within its type; numeric ids on the wire are accepted
    /// and carried as their decimal string
    #[serde(deserialize_with = "string_or_int")]
    pub entity_id: String,
    /// Full field payload of the drafted entity state
    pub data: IndexMap<String, Value>,
    /// Language code, `None` for language-neutral entities
    #[serde(default)]
    pub langcode: Option<String>,
    /// Human-facing label shown in draft listings
    pub label: String,
    /// Digest of the drafted state's canonical form
    pub data_hash: Digest,
    /// Editing client instance that produced the draft
    #[serde(default)]
    pub client_id: Option<String>,
    /// User the draft belongs to
    pub owner_id: String,
}

impl DraftRecord {
    /// The draft's key
    #[inline]
    #[must_use]
    pub fn key(&self) -> DraftKey {
        DraftKey {
            entity_type: self.entity_type.clone(),
            entity_id: self.entity_id.clone(),
            language: self.langcode.clone(),
        }
    }

    /// Rebuild the drafted entity state from the payload
    #[must_use]
    pub fn to_entity(&self) -> EntityData {
        EntityData {
            entity_type: self.entity_type.clone(),
            entity_id: self.entity_id.clone(),
            langcode: self.langcode.clone(),
            fields: self.data.clone(),
        }
    }
}

fn string_or_int<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "entity_id must be a string or integer, got {other}"
        ))),
    }
}

/// Raw stored form of a draft record
///
/// Kept as JSON so a malformed blob surfaces at parse time on read rather
/// than poisoning the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDraft(pub Value);

impl StoredDraft {
    /// Encode a record for storage
    ///
    /// # Errors
    /// Returns the serialization error, which for a well-formed record is
    /// a programming error.
    pub fn encode(record: &DraftRecord) -> Result<Self, serde_json::Error> {
        Ok(Self(serde_json::to_value(record)?))
    }

    /// Parse the stored blob back into a record
    ///
    /// # Errors
    /// Returns the parse error; callers treat it as an absent draft.
    pub fn decode(&self) -> Result<DraftRecord, serde_json::Error> {
        serde_json::from_value(self.0.clone())
    }
}

impl StoredValue for StoredDraft {
    fn has_payload(&self) -> bool {
        self.0.get("data").map_or(false, Value::is_object)
    }
}

/// Listing row for draft overviews
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftSummary {
    /// Storage key
    pub key: String,
    /// Human-facing label
    pub label: String,
    /// User the draft belongs to
    pub owner_id: String,
    /// Editing client instance, when known
    pub client_id: Option<String>,
    /// Last write time
    pub updated_at: DateTime<Utc>,
}
