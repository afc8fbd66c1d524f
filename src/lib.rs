//! keyfold: a many-to-one normalization cache.
//!
//! Many raw spellings of a key (`"10.0.0.1"`, `"010.000.000.001"`, ...) share
//! one canonical entry. The normalizer runs once per distinct raw spelling;
//! every later lookup of that spelling is a pair of store reads.
//!
//! Start with [`NormalizingCache::new`] or [`NormalizingCache::builder`].

pub mod builder;
pub mod engine;
pub mod entry;
pub mod error;
pub mod metrics;
pub mod prelude;
pub mod store;
pub mod traits;

pub use crate::engine::NormalizingCache;
pub use crate::error::CacheError;
