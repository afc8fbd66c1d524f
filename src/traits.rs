//! # Normalization Cache Traits
//!
//! The engine consumes two capabilities and implements neither of them:
//!
//! ```text
//!   ┌──────────────────────────────┐        ┌──────────────────────────────────┐
//!   │       Normalizer<K>          │        │        BackingStore<K, V>        │
//!   │                              │        │                                  │
//!   │  normalize(&K) → Result<K,E> │        │  get(&mut, &K) → Option<V>       │
//!   │                              │        │  set(&mut, K, V)                 │
//!   │  pure, deterministic         │        │  delete(&mut, &K) → bool         │
//!   │  many raw keys → one key     │        │  flush_all(&mut)                 │
//!   └──────────────┬───────────────┘        └────────────────┬─────────────────┘
//!                  │                                         │ ×2 (key store,
//!                  ▼                                         ▼     value store)
//!                ┌───────────────────────────────────────────────┐
//!                │           NormalizingCache<K, V, N>           │
//!                └───────────────────────────────────────────────┘
//! ```
//!
//! ## Normalizer
//!
//! Any `Fn(&K) -> Result<K, E>` with `E: Display` is a normalizer. Named types
//! can implement the trait directly when they carry configuration.
//!
//! Normalizers must be deterministic: equal raw keys always produce equal
//! canonical keys, and every spelling of the same logical key produces the
//! same canonical key. The engine invokes it only when a raw key is not in
//! the key index, so a non-deterministic normalizer yields arbitrary (but
//! memory-safe) results.
//!
//! ## BackingStore
//!
//! | Operation   | Contract                                                 |
//! |-------------|----------------------------------------------------------|
//! | `get`       | No side effect except optional recency bookkeeping       |
//! | `set`       | Overwrites unconditionally                               |
//! | `delete`    | No-op if absent; returns whether something was removed   |
//! | `flush_all` | Clears every entry                                       |
//!
//! A store may drop entries at any time on its own (bounded/LRU) or never
//! (unbounded map). `get` takes `&mut self` so LRU stores can refresh
//! recency on read.

use std::fmt;

use crate::store::traits::StoreMetrics;

/// Pure function mapping a raw key spelling to its canonical key.
///
/// # Example
///
/// ```
/// use keyfold::traits::Normalizer;
///
/// struct Lowercase;
///
/// impl Normalizer<String> for Lowercase {
///     type Error = &'static str;
///
///     fn normalize(&self, raw: &String) -> Result<String, Self::Error> {
///         if raw.is_empty() {
///             return Err("empty key");
///         }
///         Ok(raw.to_ascii_lowercase())
///     }
/// }
///
/// assert_eq!(Lowercase.normalize(&"HeLLo".to_string()), Ok("hello".to_string()));
/// assert!(Lowercase.normalize(&String::new()).is_err());
/// ```
pub trait Normalizer<K> {
    /// Rejection detail; rendered verbatim after `failed to normalize key: `.
    type Error: fmt::Display;

    /// Returns the canonical key for `raw`, or why it has none.
    fn normalize(&self, raw: &K) -> Result<K, Self::Error>;
}

impl<K, E, F> Normalizer<K> for F
where
    F: Fn(&K) -> Result<K, E>,
    E: fmt::Display,
{
    type Error = E;

    #[inline]
    fn normalize(&self, raw: &K) -> Result<K, E> {
        self(raw)
    }
}

/// Minimal key/value store contract used for both cache levels.
pub trait BackingStore<K, V> {
    /// Fetch a value by key. May update recency.
    fn get(&mut self, key: &K) -> Option<V>;

    /// Insert or overwrite a value.
    fn set(&mut self, key: K, value: V);

    /// Remove a value by key. Returns `true` if an entry was removed.
    fn delete(&mut self, key: &K) -> bool;

    /// Remove all entries.
    fn flush_all(&mut self);

    /// Number of slots currently held. Stores that cannot tell cheaply may
    /// report an upper bound.
    fn len(&self) -> usize;

    /// Check if the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot the store's current metrics.
    fn metrics(&self) -> StoreMetrics {
        StoreMetrics::default()
    }
}

impl<K, V, S> BackingStore<K, V> for Box<S>
where
    S: BackingStore<K, V> + ?Sized,
{
    #[inline]
    fn get(&mut self, key: &K) -> Option<V> {
        (**self).get(key)
    }

    #[inline]
    fn set(&mut self, key: K, value: V) {
        (**self).set(key, value)
    }

    #[inline]
    fn delete(&mut self, key: &K) -> bool {
        (**self).delete(key)
    }

    #[inline]
    fn flush_all(&mut self) {
        (**self).flush_all()
    }

    #[inline]
    fn len(&self) -> usize {
        (**self).len()
    }

    #[inline]
    fn metrics(&self) -> StoreMetrics {
        (**self).metrics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::hashmap::HashMapStore;

    #[derive(Debug, PartialEq)]
    struct NotANumber(String);

    impl fmt::Display for NotANumber {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "not a number: {}", self.0)
        }
    }

    fn run<N: Normalizer<String>>(n: &N, raw: &str) -> Result<String, String> {
        n.normalize(&raw.to_string()).map_err(|e| e.to_string())
    }

    #[test]
    fn closures_are_normalizers() {
        let parse = |raw: &String| {
            raw.trim()
                .parse::<i64>()
                .map(|n| n.to_string())
                .map_err(|_| NotANumber(raw.clone()))
        };

        assert_eq!(run(&parse, " 005 "), Ok("5".to_string()));
        assert_eq!(run(&parse, "five"), Err("not a number: five".to_string()));
    }

    #[test]
    fn boxed_store_forwards_to_inner() {
        let mut store: Box<dyn BackingStore<u32, &str>> = Box::new(HashMapStore::<u32, &str>::new());
        assert!(store.is_empty());
        store.set(1, "one");
        assert_eq!(store.get(&1), Some("one"));
        assert_eq!(store.len(), 1);
        assert!(store.delete(&1));
        assert!(!store.delete(&1));
        store.set(2, "two");
        store.flush_all();
        assert_eq!(store.get(&2), None);
        assert_eq!(store.metrics().inserts, 2);
    }
}
