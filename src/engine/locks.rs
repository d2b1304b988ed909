//! Per-key mutual exclusion

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;

/// Lock table serializing work per key while leaving distinct keys parallel
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    /// Create an empty lock table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`
    ///
    /// The table shard is released before `f` runs, so a long critical
    /// section on one key never blocks lookups for other keys.
    pub fn with_lock<R>(&self, key: &str, f: impl FnOnce() -> R) -> R {
        let lock = Arc::clone(&self.locks.entry(key.to_string()).or_default());
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Drop lock entries nobody holds
    pub fn prune_unused(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before.saturating_sub(self.locks.len())
    }

    /// Number of lock entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
