//! Decline handling and single-entrant replacement draws.

use crate::engine::LotteryEngine;
use crate::metrics::{LotteryMetrics, Operation};
use crate::outcome::DeclineOutcome;
use waitlist_lottery_core::environment::EntrantUpdate;
use waitlist_lottery_core::notification::DispatchSummary;
use waitlist_lottery_core::{EntrantId, EventId, OrganizerContext, RegistrationStatus, Result};

impl LotteryEngine {
    /// Remove a declining entrant from `selected` and draw one replacement.
    ///
    /// Waitlisted candidates are tried in uniformly random order until one's
    /// directory update succeeds; that entrant moves to `selected` as
    /// `Notified` and gets a winner notification. An empty waitlist leaves
    /// the seat unfilled and returns no replacement.
    ///
    /// Declining an entrant who is not selected (including a repeated
    /// decline) changes nothing and sends nothing.
    ///
    /// # Errors
    ///
    /// - [`LotteryError::EventNotFound`](waitlist_lottery_core::LotteryError::EventNotFound)
    /// - [`LotteryError::InvalidTransition`](waitlist_lottery_core::LotteryError::InvalidTransition)
    ///   if the entrant already accepted
    /// - [`LotteryError::ConcurrentModification`](waitlist_lottery_core::LotteryError::ConcurrentModification)
    /// - [`LotteryError::Store`](waitlist_lottery_core::LotteryError::Store)
    #[tracing::instrument(skip_all, fields(event_id = %event_id, entrant = %entrant))]
    pub async fn handle_decline(
        &self,
        ctx: &OrganizerContext,
        event_id: EventId,
        entrant: &EntrantId,
    ) -> Result<DeclineOutcome> {
        let (record, replacement, failed) = {
            let _guard = self.locks.lock(event_id).await;
            let mut record = self.load(event_id).await?;

            let Some(previous) = record.remove_declined(entrant)? else {
                tracing::debug!("Entrant is not selected; nothing to replace");
                return Ok(DeclineOutcome::default());
            };

            let mut undo = Vec::new();
            let declined = EntrantUpdate::Registration {
                event_id,
                status: RegistrationStatus::Declined,
            };
            match self.env.directory.update(entrant, declined).await {
                Ok(()) => undo.push((
                    entrant.clone(),
                    EntrantUpdate::Registration {
                        event_id,
                        status: previous.into(),
                    },
                )),
                Err(error) => {
                    tracing::warn!(%error, "Could not record decline in directory");
                    LotteryMetrics::record_directory_failure(Operation::Replacement);
                }
            }

            let mut failed = Vec::new();
            let mut replacement = None;
            for candidate in self.env.draws.shuffle(&record.waitlist.to_vec()) {
                let (updated, refused) = self
                    .set_status(
                        event_id,
                        std::slice::from_ref(&candidate),
                        RegistrationStatus::Notified,
                        Operation::Replacement,
                    )
                    .await;
                if updated.is_empty() {
                    failed.extend(refused);
                } else {
                    replacement = Some(candidate);
                    break;
                }
            }

            if let Some(chosen) = &replacement {
                record.promote(std::iter::once(chosen));
                undo.push((
                    chosen.clone(),
                    EntrantUpdate::Registration {
                        event_id,
                        status: RegistrationStatus::Waitlisted,
                    },
                ));
            }

            self.commit(&record, Operation::Replacement, &undo).await?;
            match &replacement {
                Some(chosen) => {
                    LotteryMetrics::record_draw(Operation::Replacement, 1);
                    tracing::info!(replacement = %chosen, "Decline committed with replacement");
                }
                None => tracing::info!(
                    failed = failed.len(),
                    "Decline committed; no replacement available"
                ),
            }
            (record, replacement, failed)
        };

        let notifications = match &replacement {
            Some(chosen) => {
                self.notify_winners(ctx, &record, std::slice::from_ref(chosen))
                    .await
            }
            None => DispatchSummary::default(),
        };

        Ok(DeclineOutcome {
            replacement,
            failed,
            notifications,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::{EngineConfig, EngineEnvironment, LotteryEngine};
    use std::sync::Arc;
    use waitlist_lottery_core::{
        EntrantId, EventRecord, LotteryError, OrganizerContext, RegistrationStatus, SelectionStatus,
    };
    use waitlist_lottery_testing::fixtures::{entrant, event_with_waitlist, ids};
    use waitlist_lottery_testing::{
        InMemoryEntrantDirectory, InMemoryEventStore, InMemoryNotificationLog,
        RecordingPushDelivery,
    };

    struct World {
        directory: InMemoryEntrantDirectory,
        store: InMemoryEventStore,
        push: RecordingPushDelivery,
        engine: LotteryEngine,
    }

    fn world(selected: &[&str], waiting: &[&str]) -> (World, EventRecord) {
        let everyone = selected.iter().chain(waiting).map(|name| entrant(name));
        let directory = InMemoryEntrantDirectory::with_entrants(everyone);
        let store = InMemoryEventStore::new();
        let push = RecordingPushDelivery::new();

        let mut record = event_with_waitlist("Gala", selected);
        record.promote(&ids(selected));
        for id in ids(waiting) {
            record.waitlist.add(id).unwrap();
        }
        store.insert(record.clone());

        let env = EngineEnvironment::new(
            Arc::new(directory.clone()),
            Arc::new(store.clone()),
            Arc::new(push.clone()),
            Arc::new(InMemoryNotificationLog::new()),
        );
        let world = World {
            directory,
            store,
            push,
            engine: LotteryEngine::new(env, EngineConfig::default().with_draw_seed(5)),
        };
        (world, record)
    }

    fn ctx() -> OrganizerContext {
        OrganizerContext::new("organizer-1", "Olive")
    }

    #[tokio::test]
    async fn test_decline_records_status_in_directory() {
        let (w, record) = world(&["a"], &["b"]);
        let a = EntrantId::new("a");

        w.engine.handle_decline(&ctx(), record.id, &a).await.unwrap();

        let a = w.directory.entrant(&a).unwrap();
        assert_eq!(a.registration(&record.id), Some(RegistrationStatus::Declined));
        let b = w.directory.entrant(&EntrantId::new("b")).unwrap();
        assert_eq!(b.registration(&record.id), Some(RegistrationStatus::Notified));
    }

    #[tokio::test]
    async fn test_failed_candidate_is_skipped() {
        let (w, record) = world(&["a"], &["b", "c"]);
        w.directory.fail_updates_for(&EntrantId::new("b"));

        let outcome = w
            .engine
            .handle_decline(&ctx(), record.id, &EntrantId::new("a"))
            .await
            .unwrap();

        assert_eq!(outcome.replacement, Some(EntrantId::new("c")));
        assert!(outcome.failed.len() <= 1);
        let stored = w.store.record(&record.id).unwrap();
        assert!(stored.waitlist.contains(&EntrantId::new("b")));
        assert_eq!(stored.selected.get(&EntrantId::new("c")), Some(&SelectionStatus::Notified));
        assert_eq!(w.push.count_tagged("winner"), 1);
    }

    #[tokio::test]
    async fn test_all_candidates_failing_leaves_seat_empty() {
        let (w, record) = world(&["a"], &["b"]);
        w.directory.fail_updates_for(&EntrantId::new("b"));

        let outcome = w
            .engine
            .handle_decline(&ctx(), record.id, &EntrantId::new("a"))
            .await
            .unwrap();

        assert_eq!(outcome.replacement, None);
        assert_eq!(outcome.failed, ids(&["b"]));
        let stored = w.store.record(&record.id).unwrap();
        assert!(stored.selected.is_empty());
        assert_eq!(stored.waitlist.to_vec(), ids(&["b"]));
        assert!(w.push.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_accepted_entrant_cannot_decline() {
        let (w, record) = world(&["a"], &["b"]);
        let a = EntrantId::new("a");
        w.engine.accept_invitation(record.id, &a).await.unwrap();

        let err = w.engine.handle_decline(&ctx(), record.id, &a).await.unwrap_err();

        assert!(matches!(err, LotteryError::InvalidTransition { .. }));
        let stored = w.store.record(&record.id).unwrap();
        assert_eq!(stored.selected.get(&a), Some(&SelectionStatus::Accepted));
        assert!(w.push.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_conflict_restores_both_entrants() {
        let (w, record) = world(&["a"], &["b"]);
        w.store.force_conflicts(1);

        let err = w
            .engine
            .handle_decline(&ctx(), record.id, &EntrantId::new("a"))
            .await
            .unwrap_err();

        assert_eq!(err, LotteryError::ConcurrentModification { event_id: record.id });
        assert_eq!(w.store.record(&record.id).unwrap(), record);
        let a = w.directory.entrant(&EntrantId::new("a")).unwrap();
        assert_eq!(a.registration(&record.id), Some(RegistrationStatus::Notified));
        let b = w.directory.entrant(&EntrantId::new("b")).unwrap();
        assert_eq!(b.registration(&record.id), Some(RegistrationStatus::Waitlisted));
        assert!(w.push.attempts().is_empty());
    }
}
