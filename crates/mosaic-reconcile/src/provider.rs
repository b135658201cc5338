//! Published-entity seam
//!
//! Persistence of the published entity itself is an external collaborator;
//! the engine only ever asks for the current published state of a key.

use mosaic_canonical::EntityData;

use crate::key::DraftKey;

/// Loads the current published state of an entity
///
/// Returning `None` means the published entity does not (or no longer)
/// exists; reconciliation treats that as nothing to reconcile.
#[cfg_attr(test, mockall::automock)]
pub trait PublishedProvider: Send + Sync {
    /// Current published state for a key, if any
    fn load_published(&self, key: &DraftKey) -> Option<EntityData>;
}

impl<P: PublishedProvider> PublishedProvider for std::sync::Arc<P> {
    fn load_published(&self, key: &DraftKey) -> Option<EntityData> {
        self.as_ref().load_published(key)
    }
}
