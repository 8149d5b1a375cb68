//! Per-event mutual exclusion.
//!
//! Every read-modify-write on an event record runs while holding that
//! event's guard, so a redraw and a decline-triggered replacement for the
//! same event can never interleave. Different events proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use waitlist_lottery_core::EventId;

/// Registry size above which idle entries are pruned on the next lock.
const PRUNE_THRESHOLD: usize = 256;

/// Registry of async mutexes keyed by event id.
#[derive(Debug, Default)]
pub struct EventLocks {
    locks: Mutex<HashMap<EventId, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of one event mutation.
pub type EventGuard = OwnedMutexGuard<()>;

impl EventLocks {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `event_id`.
    ///
    /// Waiters are served in FIFO order.
    pub async fn lock(&self, event_id: EventId) -> EventGuard {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            if locks.len() > PRUNE_THRESHOLD {
                // Only the registry holds an idle entry's Arc
                locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
            }
            Arc::clone(locks.entry(event_id).or_default())
        };
        mutex.lock_owned().await
    }

    /// Number of events currently tracked
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no event is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
