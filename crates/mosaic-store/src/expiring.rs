//! Expiring key-value storage
//!
//! [`ExpiringStore`] is the persistence seam for draft payloads: every
//! entry carries its last-write timestamp and expires a fixed TTL after
//! that write. Expiry is passive — stale entries are dropped when a read
//! touches them, never by a timer.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Default entry lifetime: 30 days from last write
#[must_use]
pub fn default_ttl() -> Duration {
    Duration::days(30)
}

/// A value that knows whether it carries a draft payload
///
/// Listings can be narrowed to payload-carrying entries; values that only
/// shadow other state (pending validation errors, for instance) report
/// `false`.
pub trait StoredValue: Clone {
    /// Whether this value carries a draft payload
    fn has_payload(&self) -> bool {
        true
    }
}

/// A stored value plus its last-write timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct StoreEntry<V> {
    /// The stored value
    pub value: V,
    /// Time of the last write to this key
    pub updated_at: DateTime<Utc>,
}

/// Key-value store whose entries expire a fixed TTL after their last write
pub trait ExpiringStore<V: StoredValue>: Send + Sync {
    /// Read a live entry
    fn get(&self, key: &str) -> Option<StoreEntry<V>>;

    /// Write a value, resetting the key's TTL
    fn set(&self, key: &str, value: V);

    /// Remove a key; returns whether a live entry existed
    fn delete(&self, key: &str) -> bool;

    /// Remove every entry
    fn delete_all(&self);

    /// All live entries, optionally narrowed to payload-carrying values
    fn list(&self, with_payloads_only: bool) -> Vec<(String, StoreEntry<V>)>;

    /// The TTL applied from each entry's last write
    fn ttl(&self) -> Duration;
}

/// In-memory [`ExpiringStore`] over a concurrent map
#[derive(Debug)]
pub struct MemoryStore<V> {
    entries: DashMap<String, StoreEntry<V>>,
    ttl: Duration,
}

impl<V: StoredValue> MemoryStore<V> {
    /// Store with an explicit TTL
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Store with the default 30-day TTL
    #[must_use]
    pub fn with_default_ttl() -> Self {
        Self::new(default_ttl())
    }

    /// Number of entries, counting not-yet-collected expired ones
    #[must_use]
    pub fn raw_len(&self) -> usize {
        self.entries.len()
    }

    fn is_live(&self, entry: &StoreEntry<V>) -> bool {
        Utc::now() - entry.updated_at <= self.ttl
    }
}

impl<V: StoredValue + Send + Sync> ExpiringStore<V> for MemoryStore<V> {
    fn get(&self, key: &str) -> Option<StoreEntry<V>> {
        {
            let entry = self.entries.get(key)?;
            if self.is_live(&entry) {
                return Some(entry.clone());
            }
        }
        tracing::trace!(key, "dropping expired entry");
        self.entries.remove(key);
        None
    }

    fn set(&self, key: &str, value: V) {
        self.entries.insert(
            key.to_string(),
            StoreEntry {
                value,
                updated_at: Utc::now(),
            },
        );
    }

    fn delete(&self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some((_, entry)) => self.is_live(&entry),
            None => false,
        }
    }

    fn delete_all(&self) {
        self.entries.clear();
    }

    fn list(&self, with_payloads_only: bool) -> Vec<(String, StoreEntry<V>)> {
        let mut live = Vec::new();
        let mut expired = Vec::new();
        for item in &self.entries {
            if self.is_live(item.value()) {
                if !with_payloads_only || item.value().value.has_payload() {
                    live.push((item.key().clone(), item.value().clone()));
                }
            } else {
                expired.push(item.key().clone());
            }
        }
        for key in expired {
            tracing::trace!(key, "dropping expired entry");
            self.entries.remove(&key);
        }
        live.sort_by(|(a, _), (b, _)| a.cmp(b));
        live
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}
