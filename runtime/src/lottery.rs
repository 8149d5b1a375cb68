//! Capacity-bounded lottery rounds.

use crate::dispatcher::Announcement;
use crate::engine::{LotteryEngine, revert_to};
use crate::metrics::{LotteryMetrics, Operation};
use crate::outcome::LotteryOutcome;
use waitlist_lottery_core::draw::DrawMode;
use waitlist_lottery_core::notification::NotificationCategory;
use waitlist_lottery_core::{EventId, OrganizerContext, RegistrationStatus, Result};

impl LotteryEngine {
    /// Draw winners from the waitlist up to the event's open capacity.
    ///
    /// Winners move to `selected` as `Notified` and get a winner
    /// notification; everyone still waiting gets a loser notification for
    /// this round. An empty waitlist or no open capacity is a no-op that
    /// sends nothing. Drawn entrants whose directory update fails stay on
    /// the waitlist, are reported in `failed`, and get the loser notice with
    /// the rest. If no drawn entrant could be updated nothing is committed.
    ///
    /// # Errors
    ///
    /// - [`LotteryError::EventNotFound`](waitlist_lottery_core::LotteryError::EventNotFound)
    /// - [`LotteryError::ConcurrentModification`](waitlist_lottery_core::LotteryError::ConcurrentModification)
    ///   if the record changed before the commit; nothing is committed or sent
    /// - [`LotteryError::Store`](waitlist_lottery_core::LotteryError::Store)
    #[tracing::instrument(skip_all, fields(event_id = %event_id))]
    pub async fn run_lottery(
        &self,
        ctx: &OrganizerContext,
        event_id: EventId,
    ) -> Result<LotteryOutcome> {
        let (record, winners, failed) = {
            let _guard = self.locks.lock(event_id).await;
            let mut record = self.load(event_id).await?;

            let count = record.lottery_size();
            if count == 0 {
                tracing::info!(
                    waitlist = record.waitlist.len(),
                    selected = record.selected.len(),
                    capacity = %record.capacity,
                    "Nothing to draw"
                );
                return Ok(LotteryOutcome {
                    remaining: record.waitlist.to_vec(),
                    ..LotteryOutcome::default()
                });
            }

            let drawn = self
                .env
                .draws
                .draw(&record.waitlist.to_vec(), count, DrawMode::Clamp)?;
            let (marked, failed) = self
                .set_status(event_id, &drawn, RegistrationStatus::Notified, Operation::Lottery)
                .await;
            let winners = record.promote(&marked);

            if winners.is_empty() {
                tracing::warn!(failed = failed.len(), "No drawn entrant could be updated; nothing committed");
            } else {
                let undo = revert_to(event_id, &winners, RegistrationStatus::Waitlisted);
                self.commit(&record, Operation::Lottery, &undo).await?;
                LotteryMetrics::record_draw(Operation::Lottery, winners.len());
                tracing::info!(
                    winners = winners.len(),
                    remaining = record.waitlist.len(),
                    failed = failed.len(),
                    "Lottery round committed"
                );
            }
            (record, winners, failed)
        };

        let remaining = record.waitlist.to_vec();
        let loser_notice = Announcement {
            event_id,
            event_name: &record.name,
            category: NotificationCategory::Loser,
            message: "",
        };
        let (mut notifications, loser_summary) = futures::join!(
            self.notify_winners(ctx, &record, &winners),
            self.dispatcher.dispatch_to_ids(ctx, &remaining, loser_notice),
        );
        notifications.merge(loser_summary);

        Ok(LotteryOutcome {
            winners,
            remaining,
            failed,
            notifications,
        })
    }
}
