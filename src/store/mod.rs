//! Backing stores for the two cache levels.
//!
//! - [`hashmap::HashMapStore`]: unbounded, strong retention. Default value store.
//! - [`weak::WeakValueStore`]: unbounded, weak retention. Default key store.
//! - [`lru::LruStore`]: bounded, evicts the least recently used slot.

pub mod hashmap;
pub mod lru;
pub mod traits;
pub mod weak;
