//! Builder for [`NormalizingCache`].
//!
//! Chooses the backing store of each cache level and whether the value store
//! may evict on its own. Anything left unset falls back to the defaults:
//!
//! | Setting              | Default                                   |
//! |----------------------|-------------------------------------------|
//! | key store            | [`WeakValueStore`] (weak, unbounded)      |
//! | value store          | [`HashMapStore`] (strong, unbounded)      |
//! | `value_store_evicts` | `true` (re-validate every index hit)      |
//!
//! ## Example
//!
//! ```rust
//! use keyfold::builder::NormalizingCacheBuilder;
//!
//! let normalizer = |raw: &String| -> Result<String, String> { Ok(raw.to_lowercase()) };
//! let mut cache = NormalizingCacheBuilder::new(normalizer)
//!     .value_store_capacity(1024)
//!     .try_build()
//!     .unwrap();
//!
//! cache.set(&"Example.COM".to_string(), 443u16).unwrap();
//! assert_eq!(cache.get(&"example.com".to_string()), Ok(443));
//! ```

use std::hash::Hash;

use crate::engine::{EntryStore, NormalizingCache};
use crate::entry::{Entry, EntryRef};
use crate::error::ConfigError;
use crate::store::hashmap::HashMapStore;
use crate::store::lru::LruStore;
use crate::store::weak::WeakValueStore;
use crate::traits::{BackingStore, Normalizer};

/// How one cache level gets its store.
enum StoreChoice<K, V> {
    Default,
    Custom(EntryStore<K, V>),
    Bounded(usize),
    Conflict,
}

impl<K, V> StoreChoice<K, V> {
    fn with_custom(self, store: EntryStore<K, V>) -> Self {
        match self {
            Self::Default | Self::Custom(_) => Self::Custom(store),
            Self::Bounded(_) | Self::Conflict => Self::Conflict,
        }
    }

    fn with_capacity(self, capacity: usize) -> Self {
        match self {
            Self::Default | Self::Bounded(_) => Self::Bounded(capacity),
            Self::Custom(_) | Self::Conflict => Self::Conflict,
        }
    }
}

/// Configures and creates a [`NormalizingCache`].
pub struct NormalizingCacheBuilder<K, V, N> {
    normalizer: N,
    key_store: StoreChoice<K, V>,
    value_store: StoreChoice<K, V>,
    value_store_evicts: bool,
}

impl<K, V, N> NormalizingCacheBuilder<K, V, N>
where
    K: Eq + Hash + Clone + 'static,
    V: 'static,
    N: Normalizer<K>,
{
    /// Starts a builder around `normalizer`.
    pub fn new(normalizer: N) -> Self {
        Self {
            normalizer,
            key_store: StoreChoice::Default,
            value_store: StoreChoice::Default,
            value_store_evicts: true,
        }
    }

    /// Uses `store` as the raw/canonical key index.
    pub fn key_store<S>(mut self, store: S) -> Self
    where
        S: BackingStore<K, EntryRef<K, V>> + 'static,
    {
        self.key_store = self.key_store.with_custom(Box::new(store));
        self
    }

    /// Uses an unbounded [`HashMapStore`] as the key index, so raw-key slots
    /// are only ever dropped by the engine itself or by `flush_all`.
    pub fn strong_key_store(self) -> Self {
        self.key_store(HashMapStore::<K, EntryRef<K, V>>::new())
    }

    /// Uses `store` as the canonical value store.
    pub fn value_store<S>(mut self, store: S) -> Self
    where
        S: BackingStore<K, EntryRef<K, V>> + 'static,
    {
        self.value_store = self.value_store.with_custom(Box::new(store));
        self
    }

    /// Uses a bounded [`LruStore`] of `capacity` slots as the key index.
    pub fn key_store_capacity(mut self, capacity: usize) -> Self {
        self.key_store = self.key_store.with_capacity(capacity);
        self
    }

    /// Uses a bounded [`LruStore`] of `capacity` slots as the value store.
    pub fn value_store_capacity(mut self, capacity: usize) -> Self {
        self.value_store = self.value_store.with_capacity(capacity);
        self
    }

    /// Declares that the value store never drops entries on its own, which
    /// skips re-validating index hits against it.
    pub fn value_store_non_evicting(mut self) -> Self {
        self.value_store_evicts = false;
        self
    }

    /// Builds the cache, rejecting invalid store settings.
    pub fn try_build(self) -> Result<NormalizingCache<K, V, N>, ConfigError> {
        if !self.value_store_evicts && matches!(self.value_store, StoreChoice::Bounded(_)) {
            return Err(ConfigError::new(
                "value store: a bounded store cannot be declared non-evicting",
            ));
        }

        let key_store = resolve(self.key_store, "key store", || {
            Box::new(WeakValueStore::<K, Entry<K, V>>::new()) as EntryStore<K, V>
        })?;
        let value_store = resolve(self.value_store, "value store", || {
            Box::new(HashMapStore::<K, EntryRef<K, V>>::new()) as EntryStore<K, V>
        })?;

        tracing::debug!(
            value_store_evicts = self.value_store_evicts,
            "built normalizing cache"
        );
        Ok(NormalizingCache::from_parts(
            self.normalizer,
            key_store,
            value_store,
            self.value_store_evicts,
        ))
    }

    /// Builds the cache.
    ///
    /// # Panics
    ///
    /// Panics on the configuration errors reported by
    /// [`try_build`](Self::try_build).
    pub fn build(self) -> NormalizingCache<K, V, N> {
        match self.try_build() {
            Ok(cache) => cache,
            Err(err) => panic!("invalid normalizing cache configuration: {err}"),
        }
    }
}

fn resolve<K, V>(
    choice: StoreChoice<K, V>,
    level: &str,
    default: impl FnOnce() -> EntryStore<K, V>,
) -> Result<EntryStore<K, V>, ConfigError>
where
    K: Eq + Hash + Clone + 'static,
    V: 'static,
{
    match choice {
        StoreChoice::Default => Ok(default()),
        StoreChoice::Custom(store) => Ok(store),
        StoreChoice::Bounded(capacity) => LruStore::<K, EntryRef<K, V>>::try_new(capacity)
            .map(|store| Box::new(store) as EntryStore<K, V>)
            .map_err(|err| ConfigError::new(format!("{level}: {err}"))),
        StoreChoice::Conflict => Err(ConfigError::new(format!(
            "{level}: a capacity and a custom store are mutually exclusive"
        ))),
    }
}
