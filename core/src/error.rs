//! Error types for the lottery engine and its collaborators.

use crate::types::{EntrantId, EventId, SelectionStatus, Version};
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, LotteryError>;

/// Errors surfaced by lottery operations.
///
/// Validation failures are raised before any state is touched. Per-entrant
/// directory failures and delivery failures are never errors here: they are
/// reported inside the operation's outcome.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LotteryError {
    // ═══════════════════════════════════════════════════════════
    // Validation
    // ═══════════════════════════════════════════════════════════
    /// The event record does not exist.
    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    /// A manual redraw asked for zero entrants or more than are waiting.
    #[error("Invalid redraw size: requested {requested}, waitlist holds {available}")]
    InvalidRedrawSize {
        /// Entrants requested
        requested: usize,
        /// Entrants on the waitlist
        available: usize,
    },

    /// A strict draw asked for more entrants than the pool holds.
    #[error("Insufficient pool: requested {requested}, pool holds {available}")]
    InsufficientPool {
        /// Entrants requested
        requested: usize,
        /// Entrants in the pool
        available: usize,
    },

    /// Capacity value cannot be used.
    #[error("Invalid capacity: {0}")]
    InvalidCapacity(i64),

    // ═══════════════════════════════════════════════════════════
    // Membership
    // ═══════════════════════════════════════════════════════════
    /// The entrant already appears in one of the event's collections.
    #[error("Entrant {0} is already registered for this event")]
    AlreadyRegistered(EntrantId),

    /// The waitlist has reached its size limit.
    #[error("Waitlist is full (max {max_size})")]
    WaitlistFull {
        /// Configured limit
        max_size: u32,
    },

    /// The entrant is not on the waitlist.
    #[error("Entrant {0} is not on the waitlist")]
    NotOnWaitlist(EntrantId),

    /// The entrant is not in the selected set.
    #[error("Entrant {0} is not selected")]
    NotSelected(EntrantId),

    /// The selection sub-status does not allow the requested change.
    #[error("Invalid transition for {entrant}: {from} -> {to}")]
    InvalidTransition {
        /// Entrant concerned
        entrant: EntrantId,
        /// Current sub-status
        from: SelectionStatus,
        /// Requested sub-status
        to: SelectionStatus,
    },

    // ═══════════════════════════════════════════════════════════
    // Persistence
    // ═══════════════════════════════════════════════════════════
    /// Another writer updated the event record first; nothing was committed.
    #[error("Event {event_id} was modified concurrently")]
    ConcurrentModification {
        /// Event concerned
        event_id: EventId,
    },

    /// The event record store failed.
    #[error("Event store error: {0}")]
    Store(#[from] StoreError),

    /// The entrant directory refused a single-entrant update.
    #[error("Entrant directory error: {0}")]
    Directory(#[from] DirectoryError),
}

/// Errors from the event record store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Optimistic concurrency conflict: the stored record has a newer version.
    #[error("Concurrency conflict on {event_id}: expected {expected}, found {actual}")]
    ConcurrencyConflict {
        /// Event concerned
        event_id: EventId,
        /// Version the update was computed from
        expected: Version,
        /// Version currently stored
        actual: Version,
    },

    /// The record to update does not exist.
    #[error("Event record not found: {0}")]
    NotFound(EventId),

    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the entrant directory.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// No record for this entrant.
    #[error("Entrant not found: {0}")]
    NotFound(EntrantId),

    /// The directory could not be reached.
    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the push delivery channel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The channel rejected the delivery token.
    #[error("Delivery token rejected")]
    InvalidToken,

    /// The channel refused or failed the request.
    #[error("Delivery failed: {0}")]
    Rejected(String),
}
