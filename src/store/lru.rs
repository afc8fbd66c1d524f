//! Bounded LRU store.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │                         LruStore<K, V>                           │
//!   │                                                                  │
//!   │   FxHashMap<K, SlotId> ──────┐                                   │
//!   │                              ▼                                   │
//!   │   slots: Vec<Option<Node>>   head ──► [A] ◄──► [B] ◄──► [C] ◄── tail
//!   │   free: Vec<SlotId>                  (MRU)              (LRU)    │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - Nodes live in a slot arena and link to each other by index, so the
//!   list needs no raw pointers.
//! - `get` and `set` move the slot to the MRU end; `peek` does not.
//! - Inserting a new key into a full store evicts the LRU slot first.
//!
//! Used as a value store, evictions happen without telling the engine.
//! The engine detects them on the next read of any raw spelling that still
//! points at the evicted entry.
//!
//! ## Example Usage
//! ```rust
//! use keyfold::store::lru::LruStore;
//! use keyfold::traits::BackingStore;
//!
//! let mut store = LruStore::new(2);
//! store.set(1, "one");
//! store.set(2, "two");
//! store.get(&1); // 2 is now LRU
//! store.set(3, "three");
//! assert_eq!(store.peek(&2), None);
//! assert_eq!(store.peek(&1), Some(&"one"));
//! ```
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::error::{ConfigError, InvariantError};
use crate::store::traits::{StoreCounters, StoreMetrics};
use crate::traits::BackingStore;

/// Stable index of a node inside the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SlotId(usize);

#[derive(Debug)]
struct Node<K, V> {
    prev: Option<SlotId>,
    next: Option<SlotId>,
    key: K,
    value: V,
}

/// Capacity-bounded store with least-recently-used eviction.
#[derive(Debug)]
pub struct LruStore<K, V> {
    index: FxHashMap<K, SlotId>,
    slots: Vec<Option<Node<K, V>>>,
    free: Vec<SlotId>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
    capacity: usize,
    metrics: StoreCounters,
}

impl<K, V> LruStore<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a store holding at most `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Use [`try_new`](Self::try_new) for
    /// user-supplied values.
    pub fn new(capacity: usize) -> Self {
        match Self::try_new(capacity) {
            Ok(store) => store,
            Err(err) => panic!("{err}"),
        }
    }

    /// Fallible constructor; rejects a zero capacity.
    pub fn try_new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::new("capacity must be > 0"));
        }
        Ok(Self {
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            capacity,
            metrics: StoreCounters::default(),
        })
    }

    /// Returns the maximum number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` if the key is present. Does not update recency.
    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Reads a value without updating recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        let id = *self.index.get(key)?;
        self.node(id).map(|node| &node.value)
    }

    /// Marks a key as most recently used. Returns `false` if absent.
    pub fn touch(&mut self, key: &K) -> bool {
        match self.index.get(key) {
            Some(&id) => {
                self.move_to_front(id);
                true
            },
            None => false,
        }
    }

    /// Removes and returns the least recently used slot.
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let id = self.tail?;
        self.detach(id);
        let node = self.release(id)?;
        self.index.remove(&node.key);
        Some((node.key, node.value))
    }

    /// Keys from most to least recently used.
    pub fn keys_mru(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.index.len());
        let mut cursor = self.head;
        while let Some(id) = cursor {
            match self.node(id) {
                Some(node) => {
                    keys.push(node.key.clone());
                    cursor = node.next;
                },
                None => break,
            }
        }
        keys
    }

    /// Verifies that the recency list and the index agree.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.index.len() > self.capacity {
            return Err(InvariantError::new(format!(
                "len {} exceeds capacity {}",
                self.index.len(),
                self.capacity
            )));
        }

        let mut walked = 0usize;
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let node = self
                .node(id)
                .ok_or_else(|| InvariantError::new(format!("list links free slot {}", id.0)))?;
            if node.prev != prev {
                return Err(InvariantError::new(format!("broken prev link at slot {}", id.0)));
            }
            if self.index.get(&node.key) != Some(&id) {
                return Err(InvariantError::new(format!(
                    "index does not point at slot {}",
                    id.0
                )));
            }
            walked += 1;
            if walked > self.index.len() {
                return Err(InvariantError::new("recency list has a cycle"));
            }
            prev = Some(id);
            cursor = node.next;
        }

        if prev != self.tail {
            return Err(InvariantError::new("tail does not end the recency list"));
        }
        if walked != self.index.len() {
            return Err(InvariantError::new(format!(
                "list length {} != index length {}",
                walked,
                self.index.len()
            )));
        }
        Ok(())
    }

    fn node(&self, id: SlotId) -> Option<&Node<K, V>> {
        self.slots.get(id.0).and_then(|slot| slot.as_ref())
    }

    fn node_mut(&mut self, id: SlotId) -> Option<&mut Node<K, V>> {
        self.slots.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    fn allocate(&mut self, node: Node<K, V>) -> SlotId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id.0] = Some(node);
                id
            },
            None => {
                self.slots.push(Some(node));
                SlotId(self.slots.len() - 1)
            },
        }
    }

    fn release(&mut self, id: SlotId) -> Option<Node<K, V>> {
        let node = self.slots.get_mut(id.0)?.take()?;
        self.free.push(id);
        Some(node)
    }

    fn detach(&mut self, id: SlotId) {
        let (prev, next) = match self.node(id) {
            Some(node) => (node.prev, node.next),
            None => return,
        };
        match prev {
            Some(p) => {
                if let Some(node) = self.node_mut(p) {
                    node.next = next;
                }
            },
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.node_mut(n) {
                    node.prev = prev;
                }
            },
            None => self.tail = prev,
        }
        if let Some(node) = self.node_mut(id) {
            node.prev = None;
            node.next = None;
        }
    }

    fn attach_front(&mut self, id: SlotId) {
        let old_head = self.head;
        if let Some(node) = self.node_mut(id) {
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => {
                if let Some(node) = self.node_mut(h) {
                    node.prev = Some(id);
                }
            },
            None => self.tail = Some(id),
        }
        self.head = Some(id);
    }

    fn move_to_front(&mut self, id: SlotId) {
        if self.head != Some(id) {
            self.detach(id);
            self.attach_front(id);
        }
    }
}

impl<K, V> BackingStore<K, V> for LruStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn get(&mut self, key: &K) -> Option<V> {
        let Some(&id) = self.index.get(key) else {
            self.metrics.inc_miss();
            return None;
        };
        self.metrics.inc_hit();
        self.move_to_front(id);
        self.node(id).map(|node| node.value.clone())
    }

    fn set(&mut self, key: K, value: V) {
        if let Some(&id) = self.index.get(&key) {
            if let Some(node) = self.node_mut(id) {
                node.value = value;
            }
            self.move_to_front(id);
            self.metrics.inc_update();
            return;
        }

        if self.index.len() >= self.capacity && self.pop_lru().is_some() {
            self.metrics.inc_eviction();
        }

        let id = self.allocate(Node {
            prev: None,
            next: None,
            key: key.clone(),
            value,
        });
        self.index.insert(key, id);
        self.attach_front(id);
        self.metrics.inc_insert();
    }

    fn delete(&mut self, key: &K) -> bool {
        let Some(id) = self.index.remove(key) else {
            return false;
        };
        self.detach(id);
        self.release(id);
        self.metrics.inc_remove();
        true
    }

    fn flush_all(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn metrics(&self) -> StoreMetrics {
        self.metrics.snapshot()
    }
}
