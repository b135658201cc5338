//! Tag-invalidated cache
//!
//! A concurrent per-key cache with one shared invalidation tag. Purging a
//! key drops that key's entry *and* bumps the tag generation, so cached
//! aggregates built across keys (list views) notice per-key changes
//! without per-aggregate bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::sync::Cache;
use parking_lot::Mutex;

/// Cached presence of a key: a hit may be a known absence
pub type CachedLookup<V> = Option<V>;

/// Per-key cache plus a shared invalidation generation
#[derive(Debug)]
pub struct TagInvalidatedCache<V: Clone + Send + Sync + 'static> {
    entries: Cache<String, CachedLookup<V>>,
    generation: Arc<AtomicU64>,
    list_snapshot: Mutex<Option<ListSnapshot<V>>>,
}

#[derive(Debug, Clone)]
struct ListSnapshot<V> {
    generation: u64,
    entries: Vec<(String, V)>,
}

impl<V: Clone + Send + Sync + 'static> TagInvalidatedCache<V> {
    /// Cache bounded to `max_capacity` per-key entries
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            entries: Cache::new(max_capacity),
            generation: Arc::new(AtomicU64::new(0)),
            list_snapshot: Mutex::new(None),
        }
    }

    /// Cached lookup result for a key
    ///
    /// `None` means the key has not been cached; `Some(None)` is a cached
    /// absence.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<CachedLookup<V>> {
        self.entries.get(key)
    }

    /// Record a lookup result (present or absent) for a key
    #[inline]
    pub fn insert(&self, key: &str, lookup: CachedLookup<V>) {
        self.entries.insert(key.to_string(), lookup);
    }

    /// Drop a key's entry and invalidate the shared tag
    pub fn purge(&self, key: &str) {
        self.entries.invalidate(key);
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Drop everything and invalidate the shared tag
    pub fn purge_all(&self) {
        self.entries.invalidate_all();
        *self.list_snapshot.lock() = None;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Current tag generation
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Cached aggregate listing, if still tagged with the current generation
    #[must_use]
    pub fn cached_list(&self) -> Option<Vec<(String, V)>> {
        let snapshot = self.list_snapshot.lock();
        snapshot
            .as_ref()
            .filter(|s| s.generation == self.generation())
            .map(|s| s.entries.clone())
    }

    /// Store an aggregate listing tagged with the current generation
    pub fn store_list(&self, entries: Vec<(String, V)>) {
        *self.list_snapshot.lock() = Some(ListSnapshot {
            generation: self.generation(),
            entries,
        });
    }

    /// Approximate number of per-key entries
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit() {
        let cache: TagInvalidatedCache<String> = TagInvalidatedCache::new(100);
        assert!(cache.get("page:1").is_none());

        cache.insert("page:1", Some("draft".to_string()));
        assert_eq!(cache.get("page:1"), Some(Some("draft".to_string())));
    }

    #[test]
    fn cached_absence_is_a_hit() {
        let cache: TagInvalidatedCache<String> = TagInvalidatedCache::new(100);
        cache.insert("page:1", None);
        assert_eq!(cache.get("page:1"), Some(None));
    }

    #[test]
    fn purge_drops_key_and_bumps_generation() {
        let cache: TagInvalidatedCache<String> = TagInvalidatedCache::new(100);
        cache.insert("page:1", Some("draft".to_string()));
        let before = cache.generation();

        cache.purge("page:1");
        assert!(cache.get("page:1").is_none());
        assert_eq!(cache.generation(), before + 1);
    }

    #[test]
    fn list_snapshot_invalidated_by_any_purge() {
        let cache: TagInvalidatedCache<String> = TagInvalidatedCache::new(100);
        cache.store_list(vec![("page:1".to_string(), "draft".to_string())]);
        assert!(cache.cached_list().is_some());

        // A purge of a different key still invalidates the aggregate.
        cache.purge("page:2");
        assert!(cache.cached_list().is_none());
    }

    #[test]
    fn purge_all_clears_everything() {
        let cache: TagInvalidatedCache<String> = TagInvalidatedCache::new(100);
        cache.insert("page:1", Some("draft".to_string()));
        cache.store_list(vec![]);

        cache.purge_all();
        assert!(cache.get("page:1").is_none());
        assert!(cache.cached_list().is_none());
    }
}
