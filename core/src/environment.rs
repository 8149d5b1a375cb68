//! Collaborator traits injected into the engine.
//!
//! The engine never talks to a concrete database or push service. It is
//! handed implementations of these traits, which keeps every operation
//! testable against in-memory doubles.
//!
//! # Dyn Compatibility
//!
//! The async traits return `Pin<Box<dyn Future>>` instead of using `async fn`
//! so they can be held as `Arc<dyn EntrantDirectory>` and friends.

use crate::error::{DeliveryError, DirectoryError, StoreError};
use crate::notification::NotificationRecord;
use crate::types::{Entrant, EntrantId, EventId, EventRecord, RegistrationStatus, Version};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// Clock trait - abstracts time operations for testability
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Field change the engine asks the directory to apply to one entrant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrantUpdate {
    /// Set the entrant's standing for an event
    Registration {
        /// Event concerned
        event_id: EventId,
        /// New standing
        status: RegistrationStatus,
    },
    /// Forget the entrant's standing for an event (left the waitlist)
    ClearRegistration {
        /// Event concerned
        event_id: EventId,
    },
}

/// Keyed store of entrant records.
///
/// The engine reads names, contact details, opt-in and delivery token, and
/// writes only per-event registration status.
pub trait EntrantDirectory: Send + Sync {
    /// Look up an entrant. A missing entrant is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Unavailable`] if the directory cannot be reached.
    fn get(
        &self,
        id: &EntrantId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Entrant>, DirectoryError>> + Send + '_>>;

    /// Apply a field update to an entrant.
    ///
    /// # Errors
    ///
    /// - [`DirectoryError::NotFound`] if there is no such entrant
    /// - [`DirectoryError::Unavailable`] if the directory cannot be reached
    fn update(
        &self,
        id: &EntrantId,
        update: EntrantUpdate,
    ) -> Pin<Box<dyn Future<Output = Result<(), DirectoryError>> + Send + '_>>;
}

/// Keyed store of event records with optimistic concurrency.
pub trait EventRecordStore: Send + Sync {
    /// Load an event record. A missing event is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the store cannot be reached.
    fn get(
        &self,
        event_id: &EventId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<EventRecord>, StoreError>> + Send + '_>>;

    /// Replace the record's collections if the stored version equals `expected`.
    ///
    /// Returns the new version on success.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ConcurrencyConflict`] if the stored version differs
    /// - [`StoreError::NotFound`] if the record does not exist
    /// - [`StoreError::Unavailable`] if the store cannot be reached
    fn update(
        &self,
        record: EventRecord,
        expected: Version,
    ) -> Pin<Box<dyn Future<Output = Result<Version, StoreError>> + Send + '_>>;
}

/// Best-effort, fire-and-forget push channel.
pub trait PushDelivery: Send + Sync {
    /// Submit one push to the device behind `token`.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] if the channel refuses the push.
    fn send(
        &self,
        token: &str,
        title: &str,
        body: &str,
        data: HashMap<String, String>,
    ) -> Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + '_>>;
}

/// Append-only audit log of delivered notifications.
pub trait NotificationLog: Send + Sync {
    /// Append one record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the log cannot be written.
    fn append(
        &self,
        record: NotificationRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>>;

    /// Records for one event, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the log cannot be read.
    fn list_for_event(
        &self,
        event_id: &EventId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<NotificationRecord>, StoreError>> + Send + '_>>;

    /// Records received by one entrant, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the log cannot be read.
    fn list_for_recipient(
        &self,
        recipient: &EntrantId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<NotificationRecord>, StoreError>> + Send + '_>>;
}
