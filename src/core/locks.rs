//! Per-user serialization of ledger mutations.
//!
//! A recomputation walk reads the user's ordered history and writes balances
//! back. Two such walks interleaving on the same user would each write from a
//! stale read, so every mutating ledger operation holds the user's lock from
//! its first read until its commit. Different users never contend.
//!
//! A user's registry entry lives only while someone holds or waits on its
//! lock; the last guard to be released removes it.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

type Registry = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Held for the duration of one mutation of one user's ledger.
#[derive(Debug)]
pub struct LedgerGuard {
    guard: Option<OwnedMutexGuard<()>>,
    registry: Registry,
    user_id: String,
}

impl Drop for LedgerGuard {
    fn drop(&mut self) {
        // Release the mutex first so its Arc no longer counts as a holder
        drop(self.guard.take());
        let mut locks = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the registry's own reference left: nobody holds or waits
        if locks
            .get(&self.user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.user_id);
            trace!(user_id = %self.user_id, "ledger lock released and forgotten");
        }
    }
}

/// Registry of one async mutex per user id.
#[derive(Clone, Debug, Default)]
pub struct LedgerLocks {
    inner: Registry,
}

impl LedgerLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other mutation of `user_id` is in flight.
    pub async fn acquire(&self, user_id: &str) -> LedgerGuard {
        let lock = {
            // Registry bookkeeping cannot leave the map inconsistent, so a
            // poisoned mutex is still usable.
            let mut locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(user_id.to_string()).or_default())
        };
        trace!(user_id, "waiting for ledger lock");
        LedgerGuard {
            guard: Some(lock.lock_owned().await),
            registry: Arc::clone(&self.inner),
            user_id: user_id.to_string(),
        }
    }

    /// Drops registry entries nobody is holding or waiting on. Guards already
    /// do this on release; this sweeps entries left by cancelled waiters.
    pub fn prune(&self) {
        let mut locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Number of users currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True when no user is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
