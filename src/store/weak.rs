//! Weak-value store.
//!
//! ## Architecture
//! - Keys map to `Weak<T>` handles; `get` upgrades to `Arc<T>`.
//! - A slot whose target has been dropped everywhere else is dead: it reads
//!   as a miss and is pruned on the spot.
//! - The store never keeps a value alive on its own. For the raw-key index
//!   this means an `Entry` disappears from the index once the value store
//!   (and every caller) lets go of it.
//!
//! ```text
//!   WeakValueStore                       value store
//!   ┌────────────┬──────────┐            ┌──────────┬──────────┐
//!   │ "10.0.0.1" │ Weak ────┼──┐         │ 10.0.0.1 │ Arc ─────┼──┐
//!   │ "010.0.0.1"│ Weak ────┼──┼──────►  Entry ◄────────────────┼──┘
//!   │ 10.0.0.1   │ Weak ────┼──┘         └──────────┴──────────┘
//!   └────────────┴──────────┘
//!   value store drops its Arc → every Weak above dies → slots read as misses
//! ```
//!
//! Dead slots that are never read again stay in the map until
//! [`purge`](WeakValueStore::purge) or `flush_all`. They hold no value memory,
//! only the key and the `Weak` allocation header.
//!
//! ## Example Usage
//! ```rust
//! use std::sync::Arc;
//!
//! use keyfold::store::weak::WeakValueStore;
//! use keyfold::traits::BackingStore;
//!
//! let mut store: WeakValueStore<&str, String> = WeakValueStore::new();
//! let owner = Arc::new("value".to_string());
//! store.set("k", Arc::clone(&owner));
//! assert_eq!(store.get(&"k").as_deref(), Some(&"value".to_string()));
//!
//! drop(owner);
//! assert_eq!(store.get(&"k"), None);
//! ```
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::sync::{Arc, Weak};

use crate::store::traits::{StoreCounters, StoreMetrics};
use crate::traits::BackingStore;

/// Unbounded store that holds its values weakly.
#[derive(Debug)]
pub struct WeakValueStore<K, T, S = RandomState> {
    map: HashMap<K, Weak<T>, S>,
    metrics: StoreCounters,
}

impl<K, T> WeakValueStore<K, T, RandomState>
where
    K: Eq + Hash,
{
    /// Create an empty store with the default hasher.
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }
}

impl<K, T> Default for WeakValueStore<K, T, RandomState>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T, S> WeakValueStore<K, T, S>
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

    /// Number of slots whose target is still alive.
    pub fn live_len(&self) -> usize {
        self.map.values().filter(|w| w.strong_count() > 0).count()
    }

    /// Drop every dead slot. Returns how many were removed.
    pub fn purge(&mut self) -> usize {
        let before = self.map.len();
        self.map.retain(|_, w| w.strong_count() > 0);
        let purged = before - self.map.len();
        for _ in 0..purged {
            self.metrics.inc_eviction();
        }
        purged
    }
}

impl<K, T, S> BackingStore<K, Arc<T>> for WeakValueStore<K, T, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn get(&mut self, key: &K) -> Option<Arc<T>> {
        let upgraded = match self.map.get(key) {
            Some(weak) => match weak.upgrade() {
                Some(strong) => Some(strong),
                None => {
                    self.map.remove(key);
                    self.metrics.inc_eviction();
                    None
                },
            },
            None => None,
        };
        self.metrics.record_lookup(upgraded.is_some());
        upgraded
    }

    fn set(&mut self, key: K, value: Arc<T>) {
        let previous = self.map.insert(key, Arc::downgrade(&value));
        self.metrics.record_write(previous.is_some());
    }

    fn delete(&mut self, key: &K) -> bool {
        let removed = self.map.remove(key).is_some();
        if removed {
            self.metrics.inc_remove();
        }
        removed
    }

    /// Replaces the map with a fresh one, releasing its allocation.
    fn flush_all(&mut self) {
        self.map = HashMap::with_hasher(S::default());
    }

    /// Includes dead slots not yet pruned.
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

    #[test]
    fn weak_store_returns_live_values() {
        let mut store = WeakValueStore::new();
        let value = Arc::new(7u32);
        store.set("a", Arc::clone(&value));
        store.set("b", Arc::clone(&value));

        let a = store.get(&"a").unwrap();
        let b = store.get(&"b").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &value));
    }

    #[test]
    fn weak_store_does_not_keep_values_alive() {
        let mut store = WeakValueStore::new();
        let value = Arc::new("v".to_string());
        store.set(1u8, Arc::clone(&value));
        assert_eq!(Arc::strong_count(&value), 1);

        drop(value);
        assert_eq!(store.len(), 1);
        assert_eq!(store.live_len(), 0);
        assert_eq!(store.get(&1), None);
        // Dead slot was pruned by the lookup.
        assert_eq!(store.len(), 0);
        assert_eq!(store.metrics().evictions, 1);
    }

    #[test]
    fn weak_store_purge_drops_only_dead_slots() {
        let mut store = WeakValueStore::new();
        let keep = Arc::new(1u32);
        let gone = Arc::new(2u32);
        store.set("keep", Arc::clone(&keep));
        store.set("gone-1", Arc::clone(&gone));
        store.set("gone-2", Arc::clone(&gone));
        drop(gone);

        assert_eq!(store.purge(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&"keep"), Some(keep));
    }

    #[test]
    fn weak_store_delete_and_flush() {
        let mut store = WeakValueStore::new();
        let value = Arc::new(0i32);
        store.set("x", Arc::clone(&value));
        store.set("y", Arc::clone(&value));

        assert!(store.delete(&"x"));
        assert!(!store.delete(&"x"));
        assert_eq!(store.get(&"x"), None);

        store.flush_all();
        assert!(store.is_empty());
        assert_eq!(store.get(&"y"), None);

        // Still weak after a flush.
        store.set("z", Arc::clone(&value));
        drop(value);
        assert_eq!(store.get(&"z"), None);
    }

    #[test]
    fn weak_store_metrics_counts() {
        let mut store = WeakValueStore::new();
        let value = Arc::new(());
        assert_eq!(store.get(&0u8), None);
        store.set(0u8, Arc::clone(&value));
        store.set(0u8, Arc::clone(&value));
        assert!(store.get(&0u8).is_some());
        assert!(store.delete(&0u8));

        let metrics = store.metrics();
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.inserts, 1);
        assert_eq!(metrics.updates, 1);
        assert_eq!(metrics.removes, 1);
    }
}
