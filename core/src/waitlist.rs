//! The pool of entrants awaiting a decision for one event.

use crate::error::{LotteryError, Result};
use crate::types::EntrantId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Unordered collection of entrant references, optionally size-limited.
///
/// Backed by a `BTreeSet` so that iteration order (and therefore a seeded
/// draw) is reproducible.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Waitlist {
    entrants: BTreeSet<EntrantId>,
    max_size: Option<u32>,
}

impl Waitlist {
    /// Creates an empty, unbounded waitlist
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entrants: BTreeSet::new(),
            max_size: None,
        }
    }

    /// Creates an empty waitlist holding at most `max_size` entrants
    #[must_use]
    pub const fn with_max_size(max_size: u32) -> Self {
        Self {
            entrants: BTreeSet::new(),
            max_size: Some(max_size),
        }
    }

    /// Maximum number of entrants, if limited
    #[must_use]
    pub const fn max_size(&self) -> Option<u32> {
        self.max_size
    }

    /// Changes the size limit. Existing entrants are kept even if over the new limit.
    pub fn set_max_size(&mut self, max_size: Option<u32>) {
        self.max_size = max_size;
    }

    /// Adds an entrant.
    ///
    /// # Errors
    ///
    /// - [`LotteryError::AlreadyRegistered`] if the entrant is already waiting
    /// - [`LotteryError::WaitlistFull`] if the limit has been reached
    pub fn add(&mut self, id: EntrantId) -> Result<()> {
        if self.entrants.contains(&id) {
            return Err(LotteryError::AlreadyRegistered(id));
        }
        if let Some(max) = self.max_size {
            if self.entrants.len() >= max as usize {
                return Err(LotteryError::WaitlistFull { max_size: max });
            }
        }
        self.entrants.insert(id);
        Ok(())
    }

    /// Puts back an entrant that was taken off by a draw. Ignores the size limit.
    pub(crate) fn restore(&mut self, id: EntrantId) {
        self.entrants.insert(id);
    }

    /// Removes an entrant, returning whether it was present
    pub fn remove(&mut self, id: &EntrantId) -> bool {
        self.entrants.remove(id)
    }

    /// Whether the entrant is waiting
    #[must_use]
    pub fn contains(&self, id: &EntrantId) -> bool {
        self.entrants.contains(id)
    }

    /// Number of waiting entrants
    #[must_use]
    pub fn len(&self) -> usize {
        self.entrants.len()
    }

    /// Whether nobody is waiting
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entrants.is_empty()
    }

    /// Iterates the waiting entrants in id order
    pub fn iter(&self) -> impl Iterator<Item = &EntrantId> {
        self.entrants.iter()
    }

    /// Snapshot of the waiting entrants, used as a draw pool
    #[must_use]
    pub fn to_vec(&self) -> Vec<EntrantId> {
        self.entrants.iter().cloned().collect()
    }
}

impl FromIterator<EntrantId> for Waitlist {
    fn from_iter<I: IntoIterator<Item = EntrantId>>(iter: I) -> Self {
        Self {
            entrants: iter.into_iter().collect(),
            max_size: None,
        }
    }
}
