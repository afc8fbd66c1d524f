//! Error types for the keyfold library.
//!
//! ## Key Components
//!
//! - [`CacheError`]: Returned by [`NormalizingCache`](crate::engine::NormalizingCache)
//!   lookups and writes. Either the normalizer rejected the raw key, or the
//!   canonical key is known but holds no value.
//! - [`ConfigError`]: Returned when builder or store parameters are invalid
//!   (e.g. zero capacity, conflicting store choices).
//! - [`InvariantError`]: Returned when internal data-structure invariants are
//!   violated (`check_invariants` methods).
//!
//! ## Example Usage
//!
//! ```
//! use keyfold::error::CacheError;
//! use keyfold::engine::NormalizingCache;
//!
//! let mut cache: NormalizingCache<String, u32, _> = NormalizingCache::new(|raw: &String| {
//!     raw.trim().parse::<u32>().map(|n| n.to_string())
//! });
//!
//! let err = cache.get(&"  7 ".to_string()).unwrap_err();
//! assert_eq!(err, CacheError::NotFound);
//!
//! let err = cache.get(&"seven".to_string()).unwrap_err();
//! assert!(err.to_string().starts_with("failed to normalize key: "));
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// CacheError
// ---------------------------------------------------------------------------

/// Error returned by normalization cache operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The normalizer rejected the raw key. Carries the normalizer's own
    /// error detail, verbatim.
    Normalize(String),
    /// The canonical key is valid but has no value (never set, or deleted).
    NotFound,
}

impl CacheError {
    /// Wraps a normalizer failure.
    #[inline]
    pub fn normalize(detail: impl fmt::Display) -> Self {
        Self::Normalize(detail.to_string())
    }

    /// Returns `true` for the not-found variant.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normalize(detail) => write!(f, "failed to normalize key: {detail}"),
            Self::NotFound => f.write_str("key not found"),
        }
    }
}

impl std::error::Error for CacheError {}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal store invariants are violated.
///
/// Produced by `check_invariants` methods such as
/// [`LruStore::check_invariants`](crate::store::lru::LruStore::check_invariants).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
///
/// Produced by [`LruStore::try_new`](crate::store::lru::LruStore::try_new) and
/// [`NormalizingCacheBuilder::try_build`](crate::builder::NormalizingCacheBuilder::try_build).
///
/// # Example
///
/// ```
/// use keyfold::store::lru::LruStore;
///
/// let err = LruStore::<u64, u64>::try_new(0).unwrap_err();
/// assert!(err.to_string().contains("capacity"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
