//! Read-through composition of store and cache
//!
//! [`CachedStore`] fronts an [`ExpiringStore`] with a
//! [`TagInvalidatedCache`]: reads hydrate the cache on miss, writes go to
//! the store first and then purge the key (write-then-invalidate), so a
//! write's effects are visible to the next read without readers blocking.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use crate::cache::TagInvalidatedCache;
use crate::expiring::{ExpiringStore, StoreEntry, StoredValue};

/// Cache performance counters
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Reads answered from the cache
    pub hits: u64,
    /// Reads that had to hydrate from the store
    pub misses: u64,
    /// Approximate per-key entries currently cached
    pub entry_count: u64,
}

/// An [`ExpiringStore`] with a read-through, tag-invalidated cache in front
#[derive(Debug)]
pub struct CachedStore<S, V>
where
    S: ExpiringStore<V>,
    V: StoredValue + Send + Sync + 'static,
{
    store: S,
    cache: TagInvalidatedCache<StoreEntry<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<S, V> CachedStore<S, V>
where
    S: ExpiringStore<V>,
    V: StoredValue + Send + Sync + 'static,
{
    /// Wrap a store with a cache of the given capacity
    #[must_use]
    pub fn new(store: S, cache_capacity: u64) -> Self {
        Self {
            store,
            cache: TagInvalidatedCache::new(cache_capacity),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// The wrapped store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read through the cache
    ///
    /// A cached entry older than the store's TTL counts as a miss; the
    /// store's own passive expiry then reports it gone.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<StoreEntry<V>> {
        if let Some(lookup) = self.cache.get(key) {
            let still_live = lookup
                .as_ref()
                .map_or(true, |entry| Utc::now() - entry.updated_at <= self.store.ttl());
            if still_live {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(key, "cache hit");
                return lookup;
            }
            self.cache.purge(key);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(key, "cache miss");
        let entry = self.store.get(key);
        self.cache.insert(key, entry.clone());
        entry
    }

    /// Write to the store, then invalidate the key's cache entry
    pub fn set(&self, key: &str, value: V) {
        self.store.set(key, value);
        self.cache.purge(key);
    }

    /// Delete from the store, then invalidate the key's cache entry
    pub fn delete(&self, key: &str) -> bool {
        let existed = self.store.delete(key);
        self.cache.purge(key);
        existed
    }

    /// Delete everything and drop the whole cache
    pub fn delete_all(&self) {
        self.store.delete_all();
        self.cache.purge_all();
    }

    /// All live entries; the unfiltered aggregate is cached against the
    /// shared tag
    #[must_use]
    pub fn list(&self, with_payloads_only: bool) -> Vec<(String, StoreEntry<V>)> {
        let entries = if let Some(cached) = self.cache.cached_list() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            cached
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            let fresh = self.store.list(false);
            self.cache.store_list(fresh.clone());
            fresh
        };

        if with_payloads_only {
            entries
                .into_iter()
                .filter(|(_, entry)| entry.value.has_payload())
                .collect()
        } else {
            entries
        }
    }

    /// Cache performance counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.cache.entry_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expiring::MemoryStore;
    use chrono::Duration;

    #[derive(Debug, Clone, PartialEq)]
    struct TestValue(String);

    impl StoredValue for TestValue {}

    fn cached_store() -> CachedStore<MemoryStore<TestValue>, TestValue> {
        CachedStore::new(MemoryStore::with_default_ttl(), 100)
    }

    #[test]
    fn read_through_populates_cache() {
        let store = cached_store();
        store.store().set("page:1", TestValue("draft".to_string()));

        let first = store.get("page:1").unwrap();
        assert_eq!(first.value, TestValue("draft".to_string()));
        assert_eq!(store.stats().misses, 1);

        let second = store.get("page:1").unwrap();
        assert_eq!(second.value, first.value);
        assert_eq!(store.stats().hits, 1);
    }

    #[test]
    fn absence_is_cached_too() {
        let store = cached_store();
        assert!(store.get("page:1").is_none());
        assert!(store.get("page:1").is_none());

        let stats = store.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn write_then_invalidate_makes_write_visible() {
        let store = cached_store();
        store.set("page:1", TestValue("first".to_string()));
        assert_eq!(store.get("page:1").unwrap().value, TestValue("first".to_string()));

        store.set("page:1", TestValue("second".to_string()));
        assert_eq!(store.get("page:1").unwrap().value, TestValue("second".to_string()));
    }

    #[test]
    fn delete_purges_cached_presence() {
        let store = cached_store();
        store.set("page:1", TestValue("draft".to_string()));
        assert!(store.get("page:1").is_some());

        assert!(store.delete("page:1"));
        assert!(store.get("page:1").is_none());
    }

    #[test]
    fn list_aggregate_observes_per_key_writes() {
        let store = cached_store();
        store.set("page:1", TestValue("a".to_string()));
        assert_eq!(store.list(false).len(), 1);

        // The cached aggregate must notice a write to a different key.
        store.set("page:2", TestValue("b".to_string()));
        assert_eq!(store.list(false).len(), 2);
    }

    #[test]
    fn stale_cache_entry_expires_with_store_ttl() {
        let store = CachedStore::new(MemoryStore::new(Duration::milliseconds(1)), 100);
        store.set("page:1", TestValue("draft".to_string()));
        let _ = store.get("page:1");

        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(store.get("page:1").is_none());
    }

    #[test]
    fn delete_all_resets_everything() {
        let store = cached_store();
        store.set("page:1", TestValue("a".to_string()));
        store.set("page:2", TestValue("b".to_string()));
        let _ = store.list(false);

        store.delete_all();
        assert!(store.list(false).is_empty());
        assert!(store.get("page:1").is_none());
    }
}
