//! Domain types for the waitlist lottery.
//!
//! Identifiers, entrants, event records and the selection sub-status that
//! together describe one event's engagement partition.

use crate::error::LotteryError;
use crate::waitlist::Waitlist;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque identifier for an entrant (device or account id).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntrantId(String);

impl EntrantId {
    /// Creates an `EntrantId` from any string-like value
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner id
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntrantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a notification audit record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(Uuid);

impl NotificationId {
    /// Creates a new random `NotificationId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Version of an event record, bumped by the store on every committed update.
///
/// Used for optimistic concurrency: an update carries the version it was
/// computed from and is rejected if the stored record has moved on.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// The version of a record that has never been updated.
    pub const INITIAL: Self = Self(0);

    /// Create a new `Version` with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the version number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Get the next version (current + 1).
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

// ============================================================================
// Value objects
// ============================================================================

/// Maximum number of winners an event accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capacity {
    /// No limit: a lottery selects the whole waitlist
    #[default]
    Unbounded,
    /// At most this many winners
    Limited(u32),
}

impl Capacity {
    /// Builds a limited capacity from an untrusted signed value.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::InvalidCapacity`] for negative values or values
    /// that do not fit in `u32`.
    pub fn limited(value: i64) -> Result<Self, LotteryError> {
        u32::try_from(value)
            .map(Self::Limited)
            .map_err(|_| LotteryError::InvalidCapacity(value))
    }

    /// Number of winners a lottery should draw from a pool of `pool_len` entrants.
    #[must_use]
    pub fn limit_for(self, pool_len: usize) -> usize {
        match self {
            Self::Unbounded => pool_len,
            Self::Limited(limit) => pool_len.min(limit as usize),
        }
    }

    /// Whether `selected` entrants fit within this capacity.
    #[must_use]
    pub fn admits(self, selected: usize) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Limited(limit) => selected <= limit as usize,
        }
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => f.write_str("unbounded"),
            Self::Limited(limit) => write!(f, "{limit}"),
        }
    }
}

/// Sub-status of an entrant in an event's selected set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionStatus {
    /// Drawn and told so; awaiting a reply
    Notified,
    /// Accepted the invitation
    Accepted,
    /// Declined the invitation (never stored in `selected`, the decline removes the entry)
    Declined,
}

impl fmt::Display for SelectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Notified => f.write_str("Notified"),
            Self::Accepted => f.write_str("Accepted"),
            Self::Declined => f.write_str("Declined"),
        }
    }
}

/// An entrant's standing for one event, as mirrored in the entrant directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationStatus {
    /// On the waitlist
    Waitlisted,
    /// Selected and notified
    Notified,
    /// Accepted a selection
    Accepted,
    /// Declined a selection
    Declined,
    /// Withdrawn by the organizer after selection
    Cancelled,
}

impl From<SelectionStatus> for RegistrationStatus {
    fn from(status: SelectionStatus) -> Self {
        match status {
            SelectionStatus::Notified => Self::Notified,
            SelectionStatus::Accepted => Self::Accepted,
            SelectionStatus::Declined => Self::Declined,
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A person who may join an event's waitlist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrant {
    /// Entrant identifier
    pub id: EntrantId,
    /// Display name
    pub name: String,
    /// Contact (email) address
    pub contact: String,
    /// Phone number, if provided
    pub phone: Option<String>,
    /// Whether the entrant wants notifications at all
    pub notifications_enabled: bool,
    /// Push delivery token; absent means not notifiable
    pub delivery_token: Option<String>,
    /// Standing per event
    pub registrations: BTreeMap<EventId, RegistrationStatus>,
}

impl Entrant {
    /// Creates an entrant with notifications enabled and no delivery token.
    #[must_use]
    pub fn new(id: EntrantId, name: impl Into<String>, contact: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            contact: contact.into(),
            phone: None,
            notifications_enabled: true,
            delivery_token: None,
            registrations: BTreeMap::new(),
        }
    }

    /// Sets the push delivery token
    #[must_use]
    pub fn with_delivery_token(mut self, token: impl Into<String>) -> Self {
        self.delivery_token = Some(token.into());
        self
    }

    /// Sets the notification opt-in
    #[must_use]
    pub const fn with_notifications(mut self, enabled: bool) -> Self {
        self.notifications_enabled = enabled;
        self
    }

    /// Returns the delivery token if this entrant can receive a push right now.
    #[must_use]
    pub fn notifiable_token(&self) -> Option<&str> {
        if !self.notifications_enabled {
            return None;
        }
        self.delivery_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }

    /// Opted in and holding a non-empty delivery token.
    #[must_use]
    pub fn is_notifiable(&self) -> bool {
        self.notifiable_token().is_some()
    }

    /// Standing for an event, if registered
    #[must_use]
    pub fn registration(&self, event_id: &EventId) -> Option<RegistrationStatus> {
        self.registrations.get(event_id).copied()
    }
}

/// Organizer on whose behalf an operation runs.
///
/// Passed explicitly into every entry point that sends notifications, it is
/// the sender recorded on each audit entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizerContext {
    /// Organizer identifier
    pub organizer_id: String,
    /// Organizer display name
    pub organizer_name: String,
}

impl OrganizerContext {
    /// Creates a new context
    #[must_use]
    pub fn new(organizer_id: impl Into<String>, organizer_name: impl Into<String>) -> Self {
        Self {
            organizer_id: organizer_id.into(),
            organizer_name: organizer_name.into(),
        }
    }
}

/// One event's lottery document: the waitlist, selected and cancelled sets.
///
/// An entrant id appears in at most one of the three collections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event identifier
    pub id: EventId,
    /// Event name (used in notification text)
    pub name: String,
    /// Organizer who owns the event
    pub organizer_id: String,
    /// Maximum number of winners
    pub capacity: Capacity,
    /// Entrants awaiting a decision
    pub waitlist: Waitlist,
    /// Entrants chosen by a draw, with their sub-status
    pub selected: BTreeMap<EntrantId, SelectionStatus>,
    /// Entrants withdrawn after selection
    pub cancelled: BTreeSet<EntrantId>,
    /// Store version this copy was read at
    pub version: Version,
}

impl EventRecord {
    /// Creates an empty record
    #[must_use]
    pub fn new(id: EventId, name: impl Into<String>, organizer_id: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            organizer_id: organizer_id.into(),
            capacity: Capacity::Unbounded,
            waitlist: Waitlist::new(),
            selected: BTreeMap::new(),
            cancelled: BTreeSet::new(),
            version: Version::INITIAL,
        }
    }

    /// Sets the capacity
    #[must_use]
    pub const fn with_capacity(mut self, capacity: Capacity) -> Self {
        self.capacity = capacity;
        self
    }

    /// Replaces the waitlist
    #[must_use]
    pub fn with_waitlist(mut self, waitlist: Waitlist) -> Self {
        self.waitlist = waitlist;
        self
    }

    /// Selected entrants in a given sub-status
    #[must_use]
    pub fn selected_with(&self, status: SelectionStatus) -> Vec<EntrantId> {
        self.selected
            .iter()
            .filter(|(_, s)| **s == status)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Whether the id appears in any of the three collections
    #[must_use]
    pub fn is_engaged(&self, id: &EntrantId) -> bool {
        self.waitlist.contains(id) || self.selected.contains_key(id) || self.cancelled.contains(id)
    }

    /// Checks that no entrant appears in more than one collection.
    ///
    /// Returns the first offending id, if any.
    #[must_use]
    pub fn partition_violation(&self) -> Option<EntrantId> {
        self.waitlist
            .iter()
            .find(|id| self.selected.contains_key(*id) || self.cancelled.contains(*id))
            .or_else(|| self.cancelled.iter().find(|id| self.selected.contains_key(*id)))
            .cloned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_limit() {
        assert_eq!(Capacity::Unbounded.limit_for(7), 7);
        assert_eq!(Capacity::Limited(2).limit_for(5), 2);
        assert_eq!(Capacity::Limited(9).limit_for(5), 5);
        assert_eq!(Capacity::Limited(0).limit_for(5), 0);
        assert!(Capacity::Limited(2).admits(2));
        assert!(!Capacity::Limited(2).admits(3));
    }

    #[test]
    fn test_negative_capacity_rejected() {
        assert_eq!(Capacity::limited(3).unwrap(), Capacity::Limited(3));
        assert_eq!(
            Capacity::limited(-1).unwrap_err(),
            LotteryError::InvalidCapacity(-1)
        );
    }

    #[test]
    fn test_entrant_notifiable() {
        let entrant = Entrant::new(EntrantId::new("a"), "Ada", "ada@example.com");
        assert!(!entrant.is_notifiable());

        let entrant = entrant.with_delivery_token("tok-a");
        assert!(entrant.is_notifiable());

        let blank = entrant.clone().with_delivery_token("  ");
        assert!(!blank.is_notifiable());

        let opted_out = entrant.with_notifications(false);
        assert!(!opted_out.is_notifiable());
    }

    #[test]
    fn test_partition_violation_detected() {
        let mut record = EventRecord::new(EventId::new(), "Swim Lessons", "org-1");
        record.waitlist.add(EntrantId::new("a")).unwrap();
        record.waitlist.add(EntrantId::new("b")).unwrap();
        assert_eq!(record.partition_violation(), None);

        record
            .selected
            .insert(EntrantId::new("b"), SelectionStatus::Notified);
        assert_eq!(record.partition_violation(), Some(EntrantId::new("b")));
    }

    #[test]
    fn test_version_next() {
        assert_eq!(Version::INITIAL.next(), Version::new(1));
        assert_eq!(Version::new(4).to_string(), "v4");
    }
}
