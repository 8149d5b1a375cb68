//! Organizer-initiated exact-count redraws.

use crate::engine::{LotteryEngine, revert_to};
use crate::metrics::{LotteryMetrics, Operation};
use crate::outcome::RedrawOutcome;
use waitlist_lottery_core::draw::DrawMode;
use waitlist_lottery_core::{EventId, LotteryError, OrganizerContext, RegistrationStatus, Result};

impl LotteryEngine {
    /// Draw exactly `count` entrants off the waitlist, ignoring capacity.
    ///
    /// Existing selections are untouched. Each drawn entrant whose directory
    /// update succeeds moves to `selected` as `Notified` and gets a winner
    /// notification; the others stay waiting and are listed in `failed`.
    /// Successful moves are kept even when some fail.
    ///
    /// # Errors
    ///
    /// - [`LotteryError::InvalidRedrawSize`] if `count` is zero or exceeds the
    ///   waitlist; raised before anything is written
    /// - [`LotteryError::EventNotFound`]
    /// - [`LotteryError::ConcurrentModification`]
    /// - [`LotteryError::Store`]
    #[tracing::instrument(skip_all, fields(event_id = %event_id, count = count))]
    pub async fn redraw(
        &self,
        ctx: &OrganizerContext,
        event_id: EventId,
        count: usize,
    ) -> Result<RedrawOutcome> {
        let (record, drawn, failed) = {
            let _guard = self.locks.lock(event_id).await;
            let mut record = self.load(event_id).await?;

            let available = record.waitlist.len();
            if count == 0 || count > available {
                tracing::debug!(available, "Rejected redraw size");
                return Err(LotteryError::InvalidRedrawSize {
                    requested: count,
                    available,
                });
            }

            let picked = self
                .env
                .draws
                .draw(&record.waitlist.to_vec(), count, DrawMode::Strict)?;
            let (marked, failed) = self
                .set_status(event_id, &picked, RegistrationStatus::Notified, Operation::Redraw)
                .await;
            let drawn = record.promote(&marked);

            if !drawn.is_empty() {
                let undo = revert_to(event_id, &drawn, RegistrationStatus::Waitlisted);
                self.commit(&record, Operation::Redraw, &undo).await?;
                LotteryMetrics::record_draw(Operation::Redraw, drawn.len());
            }
            tracing::info!(drawn = drawn.len(), failed = failed.len(), "Redraw finished");
            (record, drawn, failed)
        };

        let notifications = self.notify_winners(ctx, &record, &drawn).await;
        Ok(RedrawOutcome {
            drawn,
            failed,
            requested: count,
            notifications,
        })
    }
}
