//! The record shared by both cache levels.
//!
//! One [`Entry`] exists per live canonical key. The value store holds it
//! under the canonical key; the key index holds it under the canonical key
//! and under every raw spelling seen so far. Both hold the same
//! [`EntryRef`] (`Arc<Entry>`), so identity (`Arc::ptr_eq`) tells whether
//! the two levels still agree.
//!
//! ```text
//!   normalize                set / raw_set
//!   ────────► Empty(k) ─────────────────────► Present(k, v) ◄──┐ set
//!                │                                 │  └────────┘
//!                └───────────────┬─────────────────┘
//!                                ▼  delete / detected eviction
//!                             Invalid
//! ```
//!
//! `Invalid` is terminal. An invalid entry is never handed to callers; the
//! engine drops the slot that led to it and builds a fresh one.
//!
//! The state sits behind a `parking_lot::Mutex` so that `EntryRef` is
//! `Send + Sync` whenever `K` and `V` are `Send`, so a custom store shared
//! between threads (or between several caches) can hold the same entries.
//! Inside one `NormalizingCache` the lock is never contended; each operation
//! takes it once or twice at the cost of an uncontended atomic swap.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Shared handle to an [`Entry`]; the value type stored in both backing stores.
pub type EntryRef<K, V> = Arc<Entry<K, V>>;

/// Current state of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState<K, V> {
    /// Valid canonical key, known to hold no value (negative cache).
    Empty(K),
    /// Valid canonical key holding a value.
    Present(K, V),
    /// Deleted or detached from the value store; must not be trusted.
    Invalid,
}

impl<K, V> EntryState<K, V> {
    /// Canonical key, unless the state is `Invalid`.
    pub fn canonical_key(&self) -> Option<&K> {
        match self {
            Self::Empty(key) | Self::Present(key, _) => Some(key),
            Self::Invalid => None,
        }
    }
}

/// A canonical key and its cached value, aliased from both cache levels.
pub struct Entry<K, V> {
    state: Mutex<EntryState<K, V>>,
}

impl<K, V> Entry<K, V> {
    /// Creates a valid entry with no value.
    pub(crate) fn empty(canonical: K) -> EntryRef<K, V> {
        Arc::new(Self {
            state: Mutex::new(EntryState::Empty(canonical)),
        })
    }

    /// Creates a valid entry already holding `value`.
    pub(crate) fn with_value(canonical: K, value: V) -> EntryRef<K, V> {
        Arc::new(Self {
            state: Mutex::new(EntryState::Present(canonical, value)),
        })
    }

    /// Returns `false` once the entry has been invalidated.
    pub fn is_valid(&self) -> bool {
        !matches!(*self.state.lock(), EntryState::Invalid)
    }

    /// Returns `true` when the entry is valid and holds a value.
    pub fn has_value(&self) -> bool {
        matches!(*self.state.lock(), EntryState::Present(..))
    }

    /// Canonical key, or `None` when invalid.
    pub fn canonical_key(&self) -> Option<K>
    where
        K: Clone,
    {
        self.state.lock().canonical_key().cloned()
    }

    /// Current value, or `None` when empty or invalid.
    pub fn value(&self) -> Option<V>
    where
        V: Clone,
    {
        match &*self.state.lock() {
            EntryState::Present(_, value) => Some(value.clone()),
            EntryState::Empty(_) | EntryState::Invalid => None,
        }
    }

    /// Copy of the full state.
    pub fn state(&self) -> EntryState<K, V>
    where
        K: Clone,
        V: Clone,
    {
        self.state.lock().clone()
    }

    /// Overwrites the value. Returns `false` (and changes nothing) if the
    /// entry is invalid.
    pub(crate) fn store(&self, value: V) -> bool {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, EntryState::Invalid) {
            EntryState::Empty(key) | EntryState::Present(key, _) => {
                *state = EntryState::Present(key, value);
                true
            },
            EntryState::Invalid => false,
        }
    }

    /// Marks the entry invalid and drops its value. Returns the canonical
    /// key it had, if it was still valid.
    pub(crate) fn invalidate(&self) -> Option<K> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, EntryState::Invalid) {
            EntryState::Empty(key) | EntryState::Present(key, _) => Some(key),
            EntryState::Invalid => None,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Entry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("state", &*self.state.lock())
            .finish()
    }
}
