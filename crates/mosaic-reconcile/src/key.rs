//! Draft keys
//!
//! One draft is retained per entity+language; the storage key is
//! `{entity_type}:{entity_id}` with `:{language}` appended for translated
//! entities.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use mosaic_canonical::EntityData;

/// Identity of a draft: entity type, id, and optional language
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DraftKey {
    /// Entity type id
    pub entity_type: String,
    /// Entity id within its type
    pub entity_id: String,
    /// Language code, `None` for language-neutral entities
    pub language: Option<String>,
}

impl DraftKey {
    /// Key for a language-neutral entity
    #[inline]
    #[must_use]
    pub fn new(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            language: None,
        }
    }

    /// Narrow the key to one language
    #[inline]
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Key of the draft belonging to an entity
    #[inline]
    #[must_use]
    pub fn for_entity(entity: &EntityData) -> Self {
        Self {
            entity_type: entity.entity_type.clone(),
            entity_id: entity.entity_id.clone(),
            language: entity.langcode.clone(),
        }
    }

    /// The storage key string
    #[must_use]
    pub fn storage_key(&self) -> String {
        match &self.language {
            Some(language) => format!("{}:{}:{language}", self.entity_type, self.entity_id),
            None => format!("{}:{}", self.entity_type, self.entity_id),
        }
    }
}

impl Display for DraftKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}
