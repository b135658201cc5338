//! Expiring draft storage
//!
//! Two explicit collaborating interfaces, composed once instead of ad hoc
//! cache-then-fallback code at each call site:
//!
//! - [`ExpiringStore`]: key-value persistence where every entry expires a
//!   fixed TTL (30 days by default) after its last write, passively
//! - [`TagInvalidatedCache`]: per-key cache with one shared invalidation
//!   tag so aggregated list views observe per-key changes
//! - [`CachedStore`]: read-through `get`, write-then-invalidate
//!   `set`/`delete`, cached list aggregates, hit/miss statistics
//!
//! # Example
//!
//! ```rust
//! use mosaic_store::{CachedStore, MemoryStore, StoredValue};
//!
//! #[derive(Debug, Clone)]
//! struct Payload(String);
//! impl StoredValue for Payload {}
//!
//! let store = CachedStore::new(MemoryStore::with_default_ttl(), 1_000);
//! store.set("page:42:en", Payload("draft".to_string()));
//! assert!(store.get("page:42:en").is_some());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod cache;
mod cached;
mod expiring;

pub use cache::{CachedLookup, TagInvalidatedCache};
pub use cached::{CacheStats, CachedStore};
pub use expiring::{default_ttl, ExpiringStore, MemoryStore, StoreEntry, StoredValue};
