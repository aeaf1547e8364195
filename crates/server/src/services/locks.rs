//! Per-key async mutual exclusion.
//!
//! Serializes work on one key (a ledger entry) while letting different keys
//! proceed in parallel. Lock slots are reference counted and dropped from the
//! table once nobody holds or waits on them.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Prune dead slots once the table grows past this many keys.
const PRUNE_THRESHOLD: usize = 1024;

/// A table of async mutexes keyed by `K`.
pub struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Weak<AsyncMutex<()>>>>,
}

/// Held while the key is locked.
pub type KeyGuard = OwnedMutexGuard<()>;

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `key` is free and lock it.
    pub async fn lock(&self, key: K) -> KeyGuard {
        self.slot(key).lock_owned().await
    }

    /// Number of keys currently tracked, live or not yet pruned.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn slot(&self, key: K) -> Arc<AsyncMutex<()>> {
        // The std mutex is only held for map bookkeeping, never across an await
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = slots.get(&key).and_then(Weak::upgrade) {
            return existing;
        }

        if slots.len() >= PRUNE_THRESHOLD {
            slots.retain(|_, slot| slot.strong_count() > 0);
        }

        let slot = Arc::new(AsyncMutex::new(()));
        slots.insert(key, Arc::downgrade(&slot));
        slot
    }
}
