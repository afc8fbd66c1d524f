//! Store-level bookkeeping shared by every backing store.
//!
//! Stores focus on key/value ownership and lookup semantics, while the
//! engine manages the raw-key index and entry validity. This keeps engine
//! logic independent of how entries are retained (strong map, weak map,
//! bounded LRU).

/// Snapshot of store-level metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreMetrics {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub updates: u64,
    pub removes: u64,
    pub evictions: u64,
}

/// Plain counters behind [`StoreMetrics`].
///
/// Stores are driven through `&mut self`, so no atomics are needed.
#[derive(Debug, Default, Clone)]
pub(crate) struct StoreCounters {
    metrics: StoreMetrics,
}

impl StoreCounters {
    pub(crate) fn snapshot(&self) -> StoreMetrics {
        self.metrics
    }

    #[inline]
    pub(crate) fn inc_hit(&mut self) {
        self.metrics.hits += 1;
    }

    #[inline]
    pub(crate) fn inc_miss(&mut self) {
        self.metrics.misses += 1;
    }

    #[inline]
    pub(crate) fn inc_insert(&mut self) {
        self.metrics.inserts += 1;
    }

    #[inline]
    pub(crate) fn inc_update(&mut self) {
        self.metrics.updates += 1;
    }

    #[inline]
    pub(crate) fn inc_remove(&mut self) {
        self.metrics.removes += 1;
    }

    #[inline]
    pub(crate) fn inc_eviction(&mut self) {
        self.metrics.evictions += 1;
    }

    /// Record the outcome of a lookup.
    #[inline]
    pub(crate) fn record_lookup(&mut self, hit: bool) {
        if hit {
            self.inc_hit();
        } else {
            self.inc_miss();
        }
    }

    /// Record the outcome of a write (`replaced` = key already present).
    #[inline]
    pub(crate) fn record_write(&mut self, replaced: bool) {
        if replaced {
            self.inc_update();
        } else {
            self.inc_insert();
        }
    }
}
