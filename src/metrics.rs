//! Engine-level counters.
//!
//! Counters are monotonic for the lifetime of a cache; `flush_all` does not
//! reset them. Gauges are captured when the snapshot is taken.

/// Snapshot of [`NormalizingCache`](crate::engine::NormalizingCache) activity.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NormalizationMetrics {
    pub normalizer_calls: u64,
    pub normalize_failures: u64,

    pub index_hits: u64,
    pub index_misses: u64,
    pub variants_linked: u64,
    pub entries_created: u64,

    pub stale_slots_repaired: u64, // raw slots pointing at a deleted entry
    pub evictions_detected: u64,   // entries dropped by the value store on its own

    pub raw_sets: u64,
    pub deletes: u64,
    pub flushes: u64,

    // gauges captured at snapshot time
    pub key_store_len: usize,
    pub value_store_len: usize,
}

impl NormalizationMetrics {
    /// Fraction of index lookups that avoided the normalizer.
    pub fn index_hit_ratio(&self) -> f64 {
        let total = self.index_hits + self.index_misses;
        if total == 0 {
            0.0
        } else {
            self.index_hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_ratio_handles_zero_lookups() {
        assert_eq!(NormalizationMetrics::default().index_hit_ratio(), 0.0);
    }

    #[test]
    fn hit_ratio_counts_hits_over_lookups() {
        let metrics = NormalizationMetrics {
            index_hits: 3,
            index_misses: 1,
            ..Default::default()
        };
        assert!((metrics.index_hit_ratio() - 0.75).abs() < f64::EPSILON);
    }
}
