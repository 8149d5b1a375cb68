//! The lottery engine facade and its shared plumbing.
//!
//! [`LotteryEngine`] owns the collaborators, the draw RNG and the per-event
//! lock registry. The operations themselves live in sibling modules
//! (`lottery`, `replacement`, `redraw`, `lifecycle`) as further `impl`
//! blocks; this module holds what they share:
//!
//! 1. load the record under the event's lock
//! 2. write per-entrant statuses to the directory, collecting failures
//! 3. commit with the loaded version, undoing directory writes on failure
//! 4. release the lock, then notify

use crate::config::EngineConfig;
use crate::dispatcher::{Announcement, NotificationDispatcher};
use crate::locks::EventLocks;
use crate::metrics::{LotteryMetrics, Operation};
use futures::future;
use std::sync::Arc;
use waitlist_lottery_core::draw::DrawEngine;
use waitlist_lottery_core::environment::{
    Clock, EntrantDirectory, EntrantUpdate, EventRecordStore, NotificationLog, PushDelivery,
    SystemClock,
};
use waitlist_lottery_core::error::StoreError;
use waitlist_lottery_core::notification::{DispatchSummary, NotificationCategory, NotificationRecord};
use waitlist_lottery_core::{
    EntrantId, EventId, EventRecord, LotteryError, OrganizerContext, RegistrationStatus, Result,
    Version,
};

/// Collaborators the engine is wired to.
#[derive(Clone)]
pub struct EngineEnvironment {
    /// Entrant records
    pub directory: Arc<dyn EntrantDirectory>,
    /// Event records
    pub store: Arc<dyn EventRecordStore>,
    /// Push channel
    pub push: Arc<dyn PushDelivery>,
    /// Notification audit log
    pub log: Arc<dyn NotificationLog>,
    /// Timestamps for audit records
    pub clock: Arc<dyn Clock>,
    /// Source of draw randomness
    pub draws: Arc<DrawEngine>,
}

impl EngineEnvironment {
    /// Wire the four collaborators with the system clock and an entropy-seeded draw engine
    #[must_use]
    pub fn new(
        directory: Arc<dyn EntrantDirectory>,
        store: Arc<dyn EventRecordStore>,
        push: Arc<dyn PushDelivery>,
        log: Arc<dyn NotificationLog>,
    ) -> Self {
        Self {
            directory,
            store,
            push,
            log,
            clock: Arc::new(SystemClock),
            draws: Arc::new(DrawEngine::from_entropy()),
        }
    }

    /// Replace the clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the draw engine
    #[must_use]
    pub fn with_draw_engine(mut self, draws: DrawEngine) -> Self {
        self.draws = Arc::new(draws);
        self
    }
}

/// Runs lotteries, replacements and redraws against injected collaborators.
///
/// Every mutation of one event is serialized through that event's lock and
/// committed with the record version it was computed from. Notifications go
/// out only after the commit, outside the lock.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use waitlist_lottery_core::OrganizerContext;
/// use waitlist_lottery_runtime::{EngineConfig, EngineEnvironment, LotteryEngine};
/// use waitlist_lottery_testing::fixtures::{entrant, event_with_capacity};
/// use waitlist_lottery_testing::{
///     InMemoryEntrantDirectory, InMemoryEventStore, InMemoryNotificationLog, RecordingPushDelivery,
/// };
///
/// # tokio_test::block_on(async {
/// let store = InMemoryEventStore::new();
/// let record = event_with_capacity("Pottery Night", 1, &["a", "b"]);
/// let event_id = record.id;
/// store.insert(record);
///
/// let env = EngineEnvironment::new(
///     Arc::new(InMemoryEntrantDirectory::with_entrants(["a", "b"].map(entrant))),
///     Arc::new(store),
///     Arc::new(RecordingPushDelivery::new()),
///     Arc::new(InMemoryNotificationLog::new()),
/// );
/// let engine = LotteryEngine::new(env, EngineConfig::default().with_draw_seed(1));
///
/// let ctx = OrganizerContext::new("organizer-1", "Olive");
/// let outcome = engine.run_lottery(&ctx, event_id).await?;
/// assert_eq!(outcome.winners.len(), 1);
/// assert_eq!(outcome.notifications.sent, 2);
/// # Ok::<(), waitlist_lottery_core::LotteryError>(())
/// # })?;
/// # Ok::<(), waitlist_lottery_core::LotteryError>(())
/// ```
pub struct LotteryEngine {
    pub(crate) env: EngineEnvironment,
    pub(crate) config: EngineConfig,
    pub(crate) locks: EventLocks,
    pub(crate) dispatcher: NotificationDispatcher,
}

impl LotteryEngine {
    /// Build an engine.
    ///
    /// A `draw_seed` in `config` replaces the environment's draw engine with
    /// a seeded one.
    #[must_use]
    pub fn new(mut env: EngineEnvironment, config: EngineConfig) -> Self {
        if let Some(seed) = config.draw_seed {
            env.draws = Arc::new(DrawEngine::seeded(seed));
        }
        let dispatcher = NotificationDispatcher::new(
            Arc::clone(&env.directory),
            Arc::clone(&env.push),
            Arc::clone(&env.log),
            Arc::clone(&env.clock),
            config.dispatch_concurrency,
        );
        Self {
            env,
            config,
            locks: EventLocks::new(),
            dispatcher,
        }
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The dispatcher, for callers that notify outside an engine operation
    #[must_use]
    pub const fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    /// Current copy of an event record.
    ///
    /// # Errors
    ///
    /// - [`LotteryError::EventNotFound`] if the event does not exist
    /// - [`LotteryError::Store`] if the store fails
    pub async fn event(&self, event_id: EventId) -> Result<EventRecord> {
        self.load(event_id).await
    }

    /// Audit records for an event, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::Store`] if the log cannot be read.
    pub async fn event_notifications(&self, event_id: EventId) -> Result<Vec<NotificationRecord>> {
        Ok(self.env.log.list_for_event(&event_id).await?)
    }

    /// Audit records received by an entrant, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::Store`] if the log cannot be read.
    pub async fn entrant_notifications(&self, entrant: &EntrantId) -> Result<Vec<NotificationRecord>> {
        Ok(self.env.log.list_for_recipient(entrant).await?)
    }

    // ═══════════════════════════════════════════════════════════
    // Shared steps
    // ═══════════════════════════════════════════════════════════

    pub(crate) async fn load(&self, event_id: EventId) -> Result<EventRecord> {
        self.env
            .store
            .get(&event_id)
            .await?
            .ok_or(LotteryError::EventNotFound(event_id))
    }

    /// Set `status` on every entrant concurrently, returning `(updated, failed)`
    /// in input order.
    pub(crate) async fn set_status(
        &self,
        event_id: EventId,
        ids: &[EntrantId],
        status: RegistrationStatus,
        operation: Operation,
    ) -> (Vec<EntrantId>, Vec<EntrantId>) {
        let update = EntrantUpdate::Registration { event_id, status };
        let pending: Vec<_> = ids
            .iter()
            .map(|id| self.env.directory.update(id, update.clone()))
            .collect();
        let results = future::join_all(pending).await;

        let mut updated = Vec::with_capacity(ids.len());
        let mut failed = Vec::new();
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(()) => updated.push(id.clone()),
                Err(error) => {
                    tracing::warn!(entrant = %id, %operation, %error, "Directory update failed");
                    LotteryMetrics::record_directory_failure(operation);
                    failed.push(id.clone());
                }
            }
        }
        (updated, failed)
    }

    /// Apply one directory update whose failure aborts the operation.
    pub(crate) async fn update_entrant(
        &self,
        id: &EntrantId,
        update: EntrantUpdate,
        operation: Operation,
    ) -> Result<()> {
        self.env.directory.update(id, update).await.map_err(|error| {
            tracing::warn!(entrant = %id, %operation, %error, "Directory update failed");
            LotteryMetrics::record_directory_failure(operation);
            LotteryError::from(error)
        })
    }

    /// Commit `record` against the version it was loaded at.
    ///
    /// On any store failure the directory writes listed in `undo` are
    /// reverted before the error is returned; a version mismatch surfaces as
    /// [`LotteryError::ConcurrentModification`].
    pub(crate) async fn commit(
        &self,
        record: &EventRecord,
        operation: Operation,
        undo: &[(EntrantId, EntrantUpdate)],
    ) -> Result<Version> {
        debug_assert_eq!(record.partition_violation(), None);

        match self.env.store.update(record.clone(), record.version).await {
            Ok(version) => {
                tracing::debug!(event_id = %record.id, %version, %operation, "Committed event record");
                Ok(version)
            }
            Err(error) => {
                self.compensate(undo).await;
                if let StoreError::ConcurrencyConflict { .. } = error {
                    tracing::warn!(event_id = %record.id, %operation, %error, "Event record changed underneath");
                    LotteryMetrics::record_conflict(operation);
                    Err(LotteryError::ConcurrentModification { event_id: record.id })
                } else {
                    tracing::warn!(event_id = %record.id, %operation, %error, "Event record commit failed");
                    Err(error.into())
                }
            }
        }
    }

    async fn compensate(&self, undo: &[(EntrantId, EntrantUpdate)]) {
        let pending: Vec<_> = undo
            .iter()
            .map(|(id, update)| self.env.directory.update(id, update.clone()))
            .collect();
        let results = future::join_all(pending).await;
        for ((id, _), result) in undo.iter().zip(results) {
            if let Err(error) = result {
                tracing::warn!(entrant = %id, %error, "Failed to revert directory status");
            }
        }
    }

    /// Send winner notifications to `winners`.
    pub(crate) async fn notify_winners(
        &self,
        ctx: &OrganizerContext,
        record: &EventRecord,
        winners: &[EntrantId],
    ) -> DispatchSummary {
        self.dispatcher
            .dispatch_to_ids(
                ctx,
                winners,
                Announcement {
                    event_id: record.id,
                    event_name: &record.name,
                    category: NotificationCategory::Winner,
                    message: "",
                },
            )
            .await
    }
}

/// Directory updates that put `ids` back to `status` for this event.
pub(crate) fn revert_to(
    event_id: EventId,
    ids: &[EntrantId],
    status: RegistrationStatus,
) -> Vec<(EntrantId, EntrantUpdate)> {
    ids.iter()
        .map(|id| (id.clone(), EntrantUpdate::Registration { event_id, status }))
        .collect()
}
