//! In-memory collaborators for fast, deterministic engine tests.
//!
//! - [`InMemoryEntrantDirectory`]: `HashMap`-backed directory with injectable update failures
//! - [`InMemoryEventStore`]: versioned record store with injectable conflicts
//! - [`RecordingPushDelivery`]: captures every push attempt, can refuse chosen tokens
//! - [`InMemoryNotificationLog`]: append-only audit log
//!
//! All of them are cheap to clone; clones share state, so a test can hand one
//! clone to the engine and inspect another.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Only panics on a poisoned lock

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use waitlist_lottery_core::environment::{
    EntrantDirectory, EntrantUpdate, EventRecordStore, NotificationLog, PushDelivery,
};
use waitlist_lottery_core::error::{DeliveryError, DirectoryError, StoreError};
use waitlist_lottery_core::notification::NotificationRecord;
use waitlist_lottery_core::{Entrant, EntrantId, EventId, EventRecord, Version};

// ═══════════════════════════════════════════════════════════
// Entrant directory
// ═══════════════════════════════════════════════════════════

/// In-memory entrant directory.
///
/// # Example
///
/// ```
/// use waitlist_lottery_testing::InMemoryEntrantDirectory;
/// use waitlist_lottery_testing::fixtures::entrant;
///
/// let directory = InMemoryEntrantDirectory::with_entrants([entrant("a"), entrant("b")]);
/// directory.fail_updates_for(&"b".into());
/// assert_eq!(directory.len(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryEntrantDirectory {
    entrants: Arc<RwLock<HashMap<EntrantId, Entrant>>>,
    failing: Arc<RwLock<HashSet<EntrantId>>>,
    updates: Arc<RwLock<Vec<(EntrantId, EntrantUpdate)>>>,
}

impl InMemoryEntrantDirectory {
    /// Create an empty directory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory pre-populated with entrants
    #[must_use]
    pub fn with_entrants(entrants: impl IntoIterator<Item = Entrant>) -> Self {
        let directory = Self::new();
        for entrant in entrants {
            directory.insert(entrant);
        }
        directory
    }

    /// Insert or replace an entrant
    pub fn insert(&self, entrant: Entrant) {
        self.entrants
            .write()
            .unwrap()
            .insert(entrant.id.clone(), entrant);
    }

    /// Delete an entrant, so later lookups and updates find nothing
    pub fn remove(&self, id: &EntrantId) -> Option<Entrant> {
        self.entrants.write().unwrap().remove(id)
    }

    /// Make every update for this entrant fail with [`DirectoryError::Unavailable`]
    pub fn fail_updates_for(&self, id: &EntrantId) {
        self.failing.write().unwrap().insert(id.clone());
    }

    /// Stop failing updates for this entrant
    pub fn heal(&self, id: &EntrantId) {
        self.failing.write().unwrap().remove(id);
    }

    /// Current copy of an entrant
    #[must_use]
    pub fn entrant(&self, id: &EntrantId) -> Option<Entrant> {
        self.entrants.read().unwrap().get(id).cloned()
    }

    /// Every update applied so far, in order
    #[must_use]
    pub fn updates(&self) -> Vec<(EntrantId, EntrantUpdate)> {
        self.updates.read().unwrap().clone()
    }

    /// Number of entrants
    #[must_use]
    pub fn len(&self) -> usize {
        self.entrants.read().unwrap().len()
    }

    /// Whether the directory is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entrants.read().unwrap().is_empty()
    }

    fn apply(&self, id: &EntrantId, update: EntrantUpdate) -> Result<(), DirectoryError> {
        if self.failing.read().unwrap().contains(id) {
            return Err(DirectoryError::Unavailable(format!(
                "injected failure for {id}"
            )));
        }
        let mut entrants = self.entrants.write().unwrap();
        let entrant = entrants
            .get_mut(id)
            .ok_or_else(|| DirectoryError::NotFound(id.clone()))?;
        match &update {
            EntrantUpdate::Registration { event_id, status } => {
                entrant.registrations.insert(*event_id, *status);
            }
            EntrantUpdate::ClearRegistration { event_id } => {
                entrant.registrations.remove(event_id);
            }
        }
        self.updates.write().unwrap().push((id.clone(), update));
        Ok(())
    }
}

impl EntrantDirectory for InMemoryEntrantDirectory {
    fn get(
        &self,
        id: &EntrantId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Entrant>, DirectoryError>> + Send + '_>> {
        let id = id.clone();
        Box::pin(async move { Ok(self.entrant(&id)) })
    }

    fn update(
        &self,
        id: &EntrantId,
        update: EntrantUpdate,
    ) -> Pin<Box<dyn Future<Output = Result<(), DirectoryError>> + Send + '_>> {
        let id = id.clone();
        Box::pin(async move { self.apply(&id, update) })
    }
}

// ═══════════════════════════════════════════════════════════
// Event record store
// ═══════════════════════════════════════════════════════════

/// In-memory event record store with compare-and-swap on [`Version`].
#[derive(Clone, Debug, Default)]
pub struct InMemoryEventStore {
    records: Arc<RwLock<HashMap<EventId, EventRecord>>>,
    forced_conflicts: Arc<AtomicUsize>,
    commits: Arc<AtomicUsize>,
}

impl InMemoryEventStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record as-is, replacing any previous copy
    pub fn insert(&self, record: EventRecord) {
        self.records.write().unwrap().insert(record.id, record);
    }

    /// Current copy of a record
    #[must_use]
    pub fn record(&self, event_id: &EventId) -> Option<EventRecord> {
        self.records.read().unwrap().get(event_id).cloned()
    }

    /// Reject the next `count` updates with a concurrency conflict, as if
    /// another writer had committed first
    pub fn force_conflicts(&self, count: usize) {
        self.forced_conflicts.store(count, Ordering::SeqCst);
    }

    /// Number of successful updates
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    fn compare_and_swap(
        &self,
        mut record: EventRecord,
        expected: Version,
    ) -> Result<Version, StoreError> {
        let event_id = record.id;
        let injected = self
            .forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::ConcurrencyConflict {
                event_id,
                expected,
                actual: expected.next(),
            });
        }

        let mut records = self.records.write().unwrap();
        let stored = records
            .get(&event_id)
            .ok_or(StoreError::NotFound(event_id))?;
        if stored.version != expected {
            return Err(StoreError::ConcurrencyConflict {
                event_id,
                expected,
                actual: stored.version,
            });
        }

        let version = expected.next();
        record.version = version;
        records.insert(event_id, record);
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(version)
    }
}

impl EventRecordStore for InMemoryEventStore {
    fn get(
        &self,
        event_id: &EventId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<EventRecord>, StoreError>> + Send + '_>> {
        let event_id = *event_id;
        Box::pin(async move { Ok(self.record(&event_id)) })
    }

    fn update(
        &self,
        record: EventRecord,
        expected: Version,
    ) -> Pin<Box<dyn Future<Output = Result<Version, StoreError>> + Send + '_>> {
        Box::pin(async move { self.compare_and_swap(record, expected) })
    }
}

// ═══════════════════════════════════════════════════════════
// Push delivery
// ═══════════════════════════════════════════════════════════

/// One push the engine tried to send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushAttempt {
    /// Delivery token
    pub token: String,
    /// Title
    pub title: String,
    /// Body
    pub body: String,
    /// Data map
    pub data: HashMap<String, String>,
    /// Whether the channel accepted it
    pub accepted: bool,
}

impl PushAttempt {
    /// The `type` entry of the data map
    #[must_use]
    pub fn category_tag(&self) -> Option<&str> {
        self.data.get("type").map(String::as_str)
    }
}

/// Push channel that records every attempt instead of delivering it.
#[derive(Clone, Debug, Default)]
pub struct RecordingPushDelivery {
    attempts: Arc<RwLock<Vec<PushAttempt>>>,
    failing_tokens: Arc<RwLock<HashSet<String>>>,
}

impl RecordingPushDelivery {
    /// Create a channel that accepts everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every push to this token
    pub fn fail_token(&self, token: impl Into<String>) {
        self.failing_tokens.write().unwrap().insert(token.into());
    }

    /// Every attempt so far, in submission order
    #[must_use]
    pub fn attempts(&self) -> Vec<PushAttempt> {
        self.attempts.read().unwrap().clone()
    }

    /// Attempts the channel accepted
    #[must_use]
    pub fn delivered(&self) -> Vec<PushAttempt> {
        self.attempts
            .read()
            .unwrap()
            .iter()
            .filter(|attempt| attempt.accepted)
            .cloned()
            .collect()
    }

    /// Number of attempts carrying the given category tag
    #[must_use]
    pub fn count_tagged(&self, tag: &str) -> usize {
        self.attempts
            .read()
            .unwrap()
            .iter()
            .filter(|attempt| attempt.category_tag() == Some(tag))
            .count()
    }

    /// Forget all recorded attempts
    pub fn clear(&self) {
        self.attempts.write().unwrap().clear();
    }

    fn record(
        &self,
        token: String,
        title: String,
        body: String,
        data: HashMap<String, String>,
    ) -> Result<(), DeliveryError> {
        let accepted = !self.failing_tokens.read().unwrap().contains(&token);
        self.attempts.write().unwrap().push(PushAttempt {
            token,
            title,
            body,
            data,
            accepted,
        });
        if accepted {
            Ok(())
        } else {
            Err(DeliveryError::InvalidToken)
        }
    }
}

impl PushDelivery for RecordingPushDelivery {
    fn send(
        &self,
        token: &str,
        title: &str,
        body: &str,
        data: HashMap<String, String>,
    ) -> Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + '_>> {
        let (token, title, body) = (token.to_string(), title.to_string(), body.to_string());
        Box::pin(async move { self.record(token, title, body, data) })
    }
}

// ═══════════════════════════════════════════════════════════
// Notification log
// ═══════════════════════════════════════════════════════════

/// Append-only in-memory audit log.
#[derive(Clone, Debug, Default)]
pub struct InMemoryNotificationLog {
    records: Arc<RwLock<Vec<NotificationRecord>>>,
}

impl InMemoryNotificationLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All records in append order
    #[must_use]
    pub fn records(&self) -> Vec<NotificationRecord> {
        self.records.read().unwrap().clone()
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// Whether nothing has been logged
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().unwrap().is_empty()
    }

    fn newest_first(&self, keep: impl Fn(&NotificationRecord) -> bool) -> Vec<NotificationRecord> {
        let mut matching: Vec<NotificationRecord> = self
            .records
            .read()
            .unwrap()
            .iter()
            .rev()
            .filter(|record| keep(record))
            .cloned()
            .collect();
        // Stable: equal timestamps stay latest-appended first
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matching
    }
}

impl NotificationLog for InMemoryNotificationLog {
    fn append(
        &self,
        record: NotificationRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        Box::pin(async move {
            self.records.write().unwrap().push(record);
            Ok(())
        })
    }

    fn list_for_event(
        &self,
        event_id: &EventId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<NotificationRecord>, StoreError>> + Send + '_>>
    {
        let event_id = *event_id;
        Box::pin(async move { Ok(self.newest_first(|record| record.event_id == event_id)) })
    }

    fn list_for_recipient(
        &self,
        recipient: &EntrantId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<NotificationRecord>, StoreError>> + Send + '_>>
    {
        let recipient = recipient.clone();
        Box::pin(async move { Ok(self.newest_first(|record| record.recipient_id == recipient)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{entrant, event_with_waitlist};
    use chrono::{Duration, TimeZone, Utc};
    use waitlist_lottery_core::RegistrationStatus;
    use waitlist_lottery_core::notification::NotificationCategory;
    use waitlist_lottery_core::types::NotificationId;

    #[tokio::test]
    async fn test_directory_applies_and_records_updates() {
        let directory = InMemoryEntrantDirectory::with_entrants([entrant("a")]);
        let event_id = EventId::new();
        let id = EntrantId::new("a");

        directory
            .update(
                &id,
                EntrantUpdate::Registration {
                    event_id,
                    status: RegistrationStatus::Notified,
                },
            )
            .await
            .unwrap();

        let stored = directory.entrant(&id).unwrap();
        assert_eq!(stored.registration(&event_id), Some(RegistrationStatus::Notified));
        assert_eq!(directory.updates().len(), 1);

        directory
            .update(&id, EntrantUpdate::ClearRegistration { event_id })
            .await
            .unwrap();
        assert_eq!(directory.entrant(&id).unwrap().registration(&event_id), None);
    }

    #[tokio::test]
    async fn test_directory_failure_injection() {
        let directory = InMemoryEntrantDirectory::with_entrants([entrant("a")]);
        let id = EntrantId::new("a");
        let update = EntrantUpdate::ClearRegistration {
            event_id: EventId::new(),
        };

        directory.fail_updates_for(&id);
        let err = directory.update(&id, update.clone()).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Unavailable(_)));

        directory.heal(&id);
        assert!(directory.update(&id, update.clone()).await.is_ok());

        let missing = directory
            .update(&EntrantId::new("ghost"), update)
            .await
            .unwrap_err();
        assert_eq!(missing, DirectoryError::NotFound(EntrantId::new("ghost")));
    }

    #[tokio::test]
    async fn test_store_compare_and_swap() {
        let store = InMemoryEventStore::new();
        let record = event_with_waitlist("Gala", &["a", "b"]);
        let event_id = record.id;
        store.insert(record.clone());

        let version = store.update(record.clone(), Version::INITIAL).await.unwrap();
        assert_eq!(version, Version::new(1));
        assert_eq!(store.record(&event_id).unwrap().version, Version::new(1));

        let err = store.update(record, Version::INITIAL).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::ConcurrencyConflict { actual, .. } if actual == Version::new(1)
        ));
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn test_store_forced_conflicts_are_consumed() {
        let store = InMemoryEventStore::new();
        let record = event_with_waitlist("Gala", &["a"]);
        store.insert(record.clone());
        store.force_conflicts(1);

        assert!(store.update(record.clone(), Version::INITIAL).await.is_err());
        assert!(store.update(record, Version::INITIAL).await.is_ok());
    }

    #[tokio::test]
    async fn test_push_records_refusals() {
        let push = RecordingPushDelivery::new();
        push.fail_token("bad");

        let data = HashMap::from([("type".to_string(), "winner".to_string())]);
        assert!(push.send("good", "t", "b", data.clone()).await.is_ok());
        assert_eq!(
            push.send("bad", "t", "b", data).await,
            Err(DeliveryError::InvalidToken)
        );

        assert_eq!(push.attempts().len(), 2);
        assert_eq!(push.delivered().len(), 1);
        assert_eq!(push.count_tagged("winner"), 2);
    }

    #[tokio::test]
    async fn test_log_lists_newest_first() {
        let log = InMemoryNotificationLog::new();
        let event_id = EventId::new();
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap();

        for (offset, recipient) in [(0, "a"), (2, "b"), (1, "a")] {
            log.append(NotificationRecord {
                id: NotificationId::new(),
                sender_id: "org-1".to_string(),
                sender_name: "Organizer".to_string(),
                recipient_id: EntrantId::new(recipient),
                recipient_name: recipient.to_string(),
                message: "hello".to_string(),
                event_id,
                event_name: "Gala".to_string(),
                category: NotificationCategory::Waitlist,
                timestamp: start + Duration::minutes(offset),
            })
            .await
            .unwrap();
        }

        let for_event = log.list_for_event(&event_id).await.unwrap();
        let recipients: Vec<&str> = for_event.iter().map(|r| r.recipient_id.as_str()).collect();
        assert_eq!(recipients, vec!["b", "a", "a"]);

        let for_a = log.list_for_recipient(&EntrantId::new("a")).await.unwrap();
        assert_eq!(for_a.len(), 2);
        assert!(for_a[0].timestamp > for_a[1].timestamp);
    }
}
