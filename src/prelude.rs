pub use crate::builder::NormalizingCacheBuilder;
pub use crate::engine::{EntryStore, NormalizingCache};
pub use crate::entry::EntryRef;
pub use crate::error::{CacheError, ConfigError};
pub use crate::store::hashmap::HashMapStore;
pub use crate::store::lru::LruStore;
pub use crate::store::traits::StoreMetrics;
pub use crate::store::weak::WeakValueStore;
pub use crate::traits::{BackingStore, Normalizer};
