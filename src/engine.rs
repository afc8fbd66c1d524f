//! # Normalization Cache Engine
//!
//! Maps many raw spellings of a key to one canonical [`Entry`], running the
//! (expensive, pure) normalizer only the first time each raw spelling is seen.
//!
//! ## Architecture
//!
//! ```text
//!   raw key ──► key store (raw + canonical → EntryRef)
//!                  │ hit                        │ miss
//!                  ▼                            ▼
//!          validate the entry            normalizer(raw) ──► canonical
//!          ├─ Invalid: drop slot, retry         │
//!          ├─ value store disagrees:            ├─ key store has canonical: link raw
//!          │   invalidate, drop slot, retry     ├─ value store has canonical: relink
//!          └─ ok ─────────────┐                 └─ neither: new Empty entry in both
//!                             ▼                             │
//!                      (canonical, EntryRef) ◄──────────────┘
//! ```
//!
//! The two stores are independent and either may drop slots without telling
//! the other. Divergence is repaired lazily on the read path:
//!
//! - A raw slot pointing at an `Invalid` entry is a leftover of `delete`; it
//!   is removed and the raw key re-normalized.
//! - When the value store may evict (`value_store_evicts`), every index hit
//!   is re-checked against the value store by identity. A mismatch means
//!   the entry was evicted there; it is invalidated (so every other raw
//!   spelling notices too) and the raw key re-normalized. The extra `get`
//!   also refreshes recency in an LRU value store, which index hits alone
//!   would never do.
//!
//! Each retry first removes the slot that caused it, so the loop runs at most
//! twice before reaching the miss path, and the miss path never retries.
//!
//! ## Operations
//!
//! | Method         | Normalizes | Errors                           |
//! |----------------|------------|----------------------------------|
//! | `get(&k)`      | yes        | `Normalize`, `NotFound`          |
//! | `set(&k, v)`   | yes        | `Normalize`                      |
//! | `delete(&k)`   | yes        | `Normalize`                      |
//! | `raw_set(&k,v)`| no         | none                             |
//! | `flush_all()`  | no         | none                             |
//!
//! `delete` normalizes like the others, so deleting a key that was never set
//! runs the normalizer and briefly creates an entry before invalidating it.
//!
//! ## Thread Safety
//!
//! All operations take `&mut self`. The engine does no locking of its own;
//! wrap it in a `Mutex` to share it. The multi-step normalize protocol is not
//! atomic with respect to stores shared with other engines.
//!
//! ## Example Usage
//!
//! ```
//! use keyfold::engine::NormalizingCache;
//! use keyfold::error::CacheError;
//!
//! let mut cache = NormalizingCache::new(|raw: &String| {
//!     raw.trim()
//!         .parse::<std::net::Ipv4Addr>()
//!         .map(|ip| ip.to_string())
//!         .map_err(|e| e.to_string())
//! });
//!
//! cache.set(&"10.0.0.1".to_string(), "router").unwrap();
//! assert_eq!(cache.get(&" 10.0.0.1 ".to_string()), Ok("router"));
//! assert_eq!(cache.get(&"10.0.0.2".to_string()), Err(CacheError::NotFound));
//! assert!(cache.get(&"ten".to_string()).is_err());
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::builder::NormalizingCacheBuilder;
use crate::entry::{Entry, EntryRef};
use crate::error::CacheError;
use crate::metrics::NormalizationMetrics;
use crate::traits::{BackingStore, Normalizer};

/// Boxed backing store holding entry handles; the type of both cache levels.
pub type EntryStore<K, V> = Box<dyn BackingStore<K, EntryRef<K, V>>>;

/// Many-to-one normalization cache.
pub struct NormalizingCache<K, V, N> {
    normalizer: N,
    key_store: EntryStore<K, V>,
    value_store: EntryStore<K, V>,
    value_store_evicts: bool,
    metrics: NormalizationMetrics,
}

impl<K, V, N> NormalizingCache<K, V, N>
where
    K: Eq + Hash + Clone + 'static,
    V: 'static,
    N: Normalizer<K>,
{
    /// Creates a cache with the default stores: a weak-value key index and
    /// an unbounded value store, with eviction checks enabled.
    pub fn new(normalizer: N) -> Self {
        NormalizingCacheBuilder::new(normalizer).build()
    }

    /// Starts a builder for custom stores and eviction settings.
    pub fn builder(normalizer: N) -> NormalizingCacheBuilder<K, V, N> {
        NormalizingCacheBuilder::new(normalizer)
    }
}

impl<K, V, N> NormalizingCache<K, V, N>
where
    K: Eq + Hash + Clone,
    N: Normalizer<K>,
{
    pub(crate) fn from_parts(
        normalizer: N,
        key_store: EntryStore<K, V>,
        value_store: EntryStore<K, V>,
        value_store_evicts: bool,
    ) -> Self {
        Self {
            normalizer,
            key_store,
            value_store,
            value_store_evicts,
            metrics: NormalizationMetrics::default(),
        }
    }

    /// Stores `value` under the canonical form of `raw`.
    ///
    /// Any value is accepted, including "empty" ones such as `None` or `()`;
    /// those read back successfully and are distinct from a missing key.
    pub fn set(&mut self, raw: &K, value: V) -> Result<(), CacheError> {
        let (_, entry) = self.normalize(raw)?;
        let stored = entry.store(value);
        debug_assert!(stored, "normalize returned an invalid entry");
        Ok(())
    }

    /// Returns the value stored under the canonical form of `raw`.
    ///
    /// Fails with [`CacheError::NotFound`] when the canonical key is known but
    /// holds no value, and with [`CacheError::Normalize`] when the normalizer
    /// rejects `raw`.
    pub fn get(&mut self, raw: &K) -> Result<V, CacheError>
    where
        V: Clone,
    {
        let (_, entry) = self.normalize(raw)?;
        entry.value().ok_or(CacheError::NotFound)
    }

    /// Resolves `raw` to its canonical key through the cache.
    pub fn canonical_key(&mut self, raw: &K) -> Result<K, CacheError> {
        self.normalize(raw).map(|(canonical, _)| canonical)
    }

    /// Removes the value and invalidates the canonical entry of `raw`.
    ///
    /// `raw` and the canonical key are dropped from both stores at once.
    /// Other raw spellings still pointing at the entry are cleaned up the
    /// next time each of them is looked up (or as soon as the key store
    /// releases them on its own).
    pub fn delete(&mut self, raw: &K) -> Result<(), CacheError> {
        let (canonical, entry) = self.normalize(raw)?;
        entry.invalidate();
        self.key_store.delete(raw);
        self.unindex_canonical(&canonical, &entry);
        self.value_store.delete(&canonical);
        self.metrics.deletes += 1;
        debug!("deleted entry and its direct index slots");
        Ok(())
    }

    /// Stores `value` under `key` taken as already canonical. Never runs the
    /// normalizer.
    ///
    /// Used to pre-seed canonical entries before any lookups happen.
    pub fn raw_set(&mut self, key: &K, value: V) {
        self.metrics.raw_sets += 1;
        if let Some(entry) = self.value_store.get(key) {
            if entry.is_valid() {
                entry.store(value);
                return;
            }
        }

        let entry = Entry::with_value(key.clone(), value);
        self.index_canonical(key, &entry);
        self.value_store.set(key.clone(), entry);
        self.metrics.entries_created += 1;
    }

    /// Empties both stores.
    pub fn flush_all(&mut self) {
        self.key_store.flush_all();
        self.value_store.flush_all();
        self.metrics.flushes += 1;
        debug!("flushed key and value stores");
    }

    /// Snapshot of engine counters and store sizes.
    pub fn metrics(&self) -> NormalizationMetrics {
        NormalizationMetrics {
            key_store_len: self.key_store.len(),
            value_store_len: self.value_store.len(),
            ..self.metrics
        }
    }

    /// Whether index hits are re-checked against the value store.
    pub fn value_store_evicts(&self) -> bool {
        self.value_store_evicts
    }

    /// The raw/canonical key index.
    pub fn key_store(&self) -> &dyn BackingStore<K, EntryRef<K, V>> {
        self.key_store.as_ref()
    }

    /// Mutable access to the key index, e.g. to drop slots out of band.
    pub fn key_store_mut(&mut self) -> &mut dyn BackingStore<K, EntryRef<K, V>> {
        self.key_store.as_mut()
    }

    /// The canonical value store.
    pub fn value_store(&self) -> &dyn BackingStore<K, EntryRef<K, V>> {
        self.value_store.as_ref()
    }

    /// Mutable access to the value store, e.g. to evict entries out of band.
    pub fn value_store_mut(&mut self) -> &mut dyn BackingStore<K, EntryRef<K, V>> {
        self.value_store.as_mut()
    }

    fn normalize(&mut self, raw: &K) -> Result<(K, EntryRef<K, V>), CacheError> {
        loop {
            let Some(entry) = self.key_store.get(raw) else {
                self.metrics.index_misses += 1;
                return self.resolve_miss(raw);
            };

            let Some(canonical) = entry.canonical_key() else {
                self.key_store.delete(raw);
                self.metrics.stale_slots_repaired += 1;
                debug!("dropped raw-key slot of a deleted entry");
                continue;
            };

            if !self.is_live(&canonical, &entry) {
                entry.invalidate();
                self.key_store.delete(raw);
                self.metrics.evictions_detected += 1;
                debug!("entry was evicted from the value store; re-normalizing");
                continue;
            }

            self.metrics.index_hits += 1;
            trace!("key index hit");
            return Ok((canonical, entry));
        }
    }

    fn resolve_miss(&mut self, raw: &K) -> Result<(K, EntryRef<K, V>), CacheError> {
        self.metrics.normalizer_calls += 1;
        let canonical = match self.normalizer.normalize(raw) {
            Ok(canonical) => canonical,
            Err(err) => {
                self.metrics.normalize_failures += 1;
                debug!(error = %err, "normalizer rejected raw key");
                return Err(CacheError::normalize(err));
            },
        };

        if let Some(entry) = self.known_entry(&canonical) {
            self.key_store.set(raw.clone(), Arc::clone(&entry));
            self.metrics.variants_linked += 1;
            trace!("linked raw key to existing canonical entry");
            return Ok((canonical, entry));
        }

        let entry = Entry::empty(canonical.clone());
        self.key_store.set(raw.clone(), Arc::clone(&entry));
        self.index_canonical(&canonical, &entry);
        self.value_store.set(canonical.clone(), Arc::clone(&entry));
        self.metrics.entries_created += 1;
        trace!("created canonical entry");
        Ok((canonical, entry))
    }

    /// Finds a trustworthy entry for an already-normalized key, first via
    /// the key index, then via the value store (relinking the index).
    fn known_entry(&mut self, canonical: &K) -> Option<EntryRef<K, V>> {
        if let Some(entry) = self.key_store.get(canonical) {
            if entry.canonical_key().as_ref() == Some(canonical) {
                if self.is_live(canonical, &entry) {
                    return Some(entry);
                }
                entry.invalidate();
                self.metrics.evictions_detected += 1;
                debug!("canonical index slot outlived its value store entry");
            }
        }

        let entry = self.value_store.get(canonical)?;
        if entry.canonical_key().as_ref() != Some(canonical) {
            return None;
        }
        self.index_canonical(canonical, &entry);
        Some(entry)
    }

    /// Points the index slot of `canonical` at `entry`, unless that slot is
    /// the raw-key slot of a different, still valid canonical entry. Such a
    /// slot stays put; the value store finds `entry` by its canonical key.
    fn index_canonical(&mut self, canonical: &K, entry: &EntryRef<K, V>) {
        if let Some(current) = self.key_store.get(canonical) {
            if Arc::ptr_eq(&current, entry) {
                return;
            }
            if current.canonical_key().is_some_and(|owner| owner != *canonical) {
                trace!("canonical index slot is owned by another raw key; left in place");
                return;
            }
        }
        self.key_store.set(canonical.clone(), Arc::clone(entry));
        trace!("indexed canonical key");
    }

    /// Drops the index slot of `canonical` if it still points at `entry`.
    fn unindex_canonical(&mut self, canonical: &K, entry: &EntryRef<K, V>) {
        if let Some(current) = self.key_store.get(canonical) {
            if Arc::ptr_eq(&current, entry) {
                self.key_store.delete(canonical);
            }
        }
    }

    fn is_live(&mut self, canonical: &K, entry: &EntryRef<K, V>) -> bool {
        if !self.value_store_evicts {
            return true;
        }
        self.value_store
            .get(canonical)
            .is_some_and(|current| Arc::ptr_eq(&current, entry))
    }
}

impl<K, V, N> fmt::Debug for NormalizingCache<K, V, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizingCache")
            .field("value_store_evicts", &self.value_store_evicts)
            .field("key_store_len", &self.key_store.len())
            .field("value_store_len", &self.value_store.len())
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}
