//! HashMap-backed strong store.
//!
//! ## Architecture
//! - Keys map to values in a `HashMap<K, V, S>`; values are cloned out on `get`.
//! - No capacity and no eviction: entries live until `delete` or `flush_all`.
//!
//! ## When to Use
//! - Default value store of a [`NormalizingCache`](crate::engine::NormalizingCache).
//! - As a key store when the raw-key index must never drop slots on its own
//!   (stale slots are then cleaned up lazily by the engine).
//!
//! ## Example Usage
//! ```rust
//! use keyfold::store::hashmap::HashMapStore;
//! use keyfold::traits::BackingStore;
//!
//! let mut store: HashMapStore<u64, String> = HashMapStore::new();
//! store.set(1, "a".to_string());
//! assert_eq!(store.get(&1), Some("a".to_string()));
//! assert!(store.delete(&1));
//! assert!(!store.delete(&1));
//! ```
//!
//! ## Type Constraints
//! - `K: Eq + Hash` for key lookup.
//! - `V: Clone`; engine values are `Arc` handles so clones are cheap.
//! - `S: BuildHasher` for custom hashers (defaults to `RandomState`).
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

use crate::store::traits::{StoreCounters, StoreMetrics};
use crate::traits::BackingStore;

/// Unbounded HashMap-backed store with strong retention.
#[derive(Debug)]
pub struct HashMapStore<K, V, S = RandomState> {
    map: HashMap<K, V, S>,
    metrics: StoreCounters,
}

impl<K, V> HashMapStore<K, V, RandomState>
where
    K: Eq + Hash,
{
    /// Create an empty store with the default hasher.
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    /// Create an empty store with room for `capacity` entries before
    /// reallocating. This is not a bound.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
            metrics: StoreCounters::default(),
        }
    }
}

impl<K, V> Default for HashMapStore<K, V, RandomState>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> HashMapStore<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Create an empty store with a custom hasher.
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            map: HashMap::with_hasher(hasher),
            metrics: StoreCounters::default(),
        }
    }

    /// Fetch a value by reference without touching counters.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    /// Check whether a key exists.
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }
}

impl<K, V, S> BackingStore<K, V> for HashMapStore<K, V, S>
where
    K: Eq + Hash,
    V: Clone,
    S: BuildHasher,
{
    fn get(&mut self, key: &K) -> Option<V> {
        let value = self.map.get(key).cloned();
        self.metrics.record_lookup(value.is_some());
        value
    }

    fn set(&mut self, key: K, value: V) {
        let previous = self.map.insert(key, value);
        self.metrics.record_write(previous.is_some());
    }

    fn delete(&mut self, key: &K) -> bool {
        let removed = self.map.remove(key).is_some();
        if removed {
            self.metrics.inc_remove();
        }
        removed
    }

    fn flush_all(&mut self) {
        self.map.clear();
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn metrics(&self) -> StoreMetrics {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn hashmap_store_basic_ops() {
        let mut store = HashMapStore::new();
        let value = Arc::new("v1".to_string());
        store.set("k1", value.clone());
        assert_eq!(store.get(&"k1"), Some(value.clone()));
        assert!(store.contains(&"k1"));
        assert_eq!(store.len(), 1);
        assert!(store.delete(&"k1"));
        assert!(!store.contains(&"k1"));
        assert!(store.is_empty());
    }

    #[test]
    fn hashmap_store_set_overwrites() {
        let mut store = HashMapStore::new();
        store.set(1u32, "a");
        store.set(1u32, "b");
        assert_eq!(store.peek(&1), Some(&"b"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn hashmap_store_never_evicts() {
        let mut store = HashMapStore::with_capacity(2);
        for i in 0..1_000u32 {
            store.set(i, i * 2);
        }
        assert_eq!(store.len(), 1_000);
        assert_eq!(store.get(&0), Some(0));
        assert_eq!(store.get(&999), Some(1_998));
    }

    #[test]
    fn hashmap_store_flush_all_clears() {
        let mut store = HashMapStore::new();
        store.set("a", 1);
        store.set("b", 2);
        store.flush_all();
        assert!(store.is_empty());
        assert_eq!(store.get(&"a"), None);
    }

    #[test]
    fn hashmap_store_metrics_counts() {
        let mut store = HashMapStore::new();

        assert_eq!(store.metrics(), StoreMetrics::default());
        assert_eq!(store.get(&"missing"), None);
        store.set("k1", 1);
        store.set("k1", 2);
        assert_eq!(store.get(&"k1"), Some(2));
        assert!(store.delete(&"k1"));
        assert!(!store.delete(&"k1"));

        let metrics = store.metrics();
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.inserts, 1);
        assert_eq!(metrics.updates, 1);
        assert_eq!(metrics.removes, 1);
        assert_eq!(metrics.evictions, 0);
    }
}
