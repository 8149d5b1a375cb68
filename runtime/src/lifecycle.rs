//! Waitlist membership, invitation replies and organizer broadcasts.
//!
//! Membership changes touch one entrant, so a directory failure aborts the
//! whole operation instead of being collected.

use crate::dispatcher::Announcement;
use crate::engine::LotteryEngine;
use crate::metrics::Operation;
use waitlist_lottery_core::environment::EntrantUpdate;
use waitlist_lottery_core::notification::{DispatchSummary, NotificationCategory, RecipientGroup};
use waitlist_lottery_core::{
    EntrantId, EventId, OrganizerContext, RegistrationStatus, Result, SelectionStatus,
};

impl LotteryEngine {
    /// Put an entrant on an event's waitlist.
    ///
    /// Events without a waitlist limit of their own get the configured
    /// default limit.
    ///
    /// # Errors
    ///
    /// - [`LotteryError::AlreadyRegistered`](waitlist_lottery_core::LotteryError::AlreadyRegistered)
    ///   if the entrant is waiting, selected or cancelled
    /// - [`LotteryError::WaitlistFull`](waitlist_lottery_core::LotteryError::WaitlistFull)
    /// - [`LotteryError::Directory`](waitlist_lottery_core::LotteryError::Directory)
    /// - [`LotteryError::EventNotFound`](waitlist_lottery_core::LotteryError::EventNotFound),
    ///   [`LotteryError::ConcurrentModification`](waitlist_lottery_core::LotteryError::ConcurrentModification),
    ///   [`LotteryError::Store`](waitlist_lottery_core::LotteryError::Store)
    #[tracing::instrument(skip_all, fields(event_id = %event_id, entrant = %entrant))]
    pub async fn join_waitlist(&self, event_id: EventId, entrant: &EntrantId) -> Result<()> {
        let _guard = self.locks.lock(event_id).await;
        let mut record = self.load(event_id).await?;

        if record.waitlist.max_size().is_none() {
            record
                .waitlist
                .set_max_size(self.config.default_waitlist_limit);
        }
        record.join(entrant.clone())?;

        self.update_entrant(
            entrant,
            EntrantUpdate::Registration {
                event_id,
                status: RegistrationStatus::Waitlisted,
            },
            Operation::Membership,
        )
        .await?;
        let undo = [(entrant.clone(), EntrantUpdate::ClearRegistration { event_id })];
        self.commit(&record, Operation::Membership, &undo).await?;

        tracing::info!(waitlist = record.waitlist.len(), "Entrant joined waitlist");
        Ok(())
    }

    /// Take an entrant off an event's waitlist.
    ///
    /// # Errors
    ///
    /// - [`LotteryError::NotOnWaitlist`](waitlist_lottery_core::LotteryError::NotOnWaitlist)
    /// - [`LotteryError::Directory`](waitlist_lottery_core::LotteryError::Directory)
    /// - [`LotteryError::EventNotFound`](waitlist_lottery_core::LotteryError::EventNotFound),
    ///   [`LotteryError::ConcurrentModification`](waitlist_lottery_core::LotteryError::ConcurrentModification),
    ///   [`LotteryError::Store`](waitlist_lottery_core::LotteryError::Store)
    #[tracing::instrument(skip_all, fields(event_id = %event_id, entrant = %entrant))]
    pub async fn leave_waitlist(&self, event_id: EventId, entrant: &EntrantId) -> Result<()> {
        let _guard = self.locks.lock(event_id).await;
        let mut record = self.load(event_id).await?;
        record.leave(entrant)?;

        self.update_entrant(
            entrant,
            EntrantUpdate::ClearRegistration { event_id },
            Operation::Membership,
        )
        .await?;
        let undo = [(
            entrant.clone(),
            EntrantUpdate::Registration {
                event_id,
                status: RegistrationStatus::Waitlisted,
            },
        )];
        self.commit(&record, Operation::Membership, &undo).await?;

        tracing::info!(waitlist = record.waitlist.len(), "Entrant left waitlist");
        Ok(())
    }

    /// Record that a notified entrant accepted their selection.
    ///
    /// Accepting twice is not an error.
    ///
    /// # Errors
    ///
    /// - [`LotteryError::NotSelected`](waitlist_lottery_core::LotteryError::NotSelected)
    /// - [`LotteryError::InvalidTransition`](waitlist_lottery_core::LotteryError::InvalidTransition)
    /// - [`LotteryError::Directory`](waitlist_lottery_core::LotteryError::Directory)
    /// - [`LotteryError::EventNotFound`](waitlist_lottery_core::LotteryError::EventNotFound),
    ///   [`LotteryError::ConcurrentModification`](waitlist_lottery_core::LotteryError::ConcurrentModification),
    ///   [`LotteryError::Store`](waitlist_lottery_core::LotteryError::Store)
    #[tracing::instrument(skip_all, fields(event_id = %event_id, entrant = %entrant))]
    pub async fn accept_invitation(&self, event_id: EventId, entrant: &EntrantId) -> Result<()> {
        let _guard = self.locks.lock(event_id).await;
        let mut record = self.load(event_id).await?;
        let previous = record
            .selected
            .get(entrant)
            .copied()
            .unwrap_or(SelectionStatus::Notified);
        record.accept(entrant)?;

        self.update_entrant(
            entrant,
            EntrantUpdate::Registration {
                event_id,
                status: RegistrationStatus::Accepted,
            },
            Operation::Membership,
        )
        .await?;
        let undo = [(
            entrant.clone(),
            EntrantUpdate::Registration {
                event_id,
                status: previous.into(),
            },
        )];
        self.commit(&record, Operation::Membership, &undo).await?;

        tracing::info!("Invitation accepted");
        Ok(())
    }

    /// Withdraw a selected entrant into the cancelled set.
    ///
    /// The freed seat is not refilled; the organizer may redraw.
    ///
    /// # Errors
    ///
    /// - [`LotteryError::NotSelected`](waitlist_lottery_core::LotteryError::NotSelected)
    /// - [`LotteryError::Directory`](waitlist_lottery_core::LotteryError::Directory)
    /// - [`LotteryError::EventNotFound`](waitlist_lottery_core::LotteryError::EventNotFound),
    ///   [`LotteryError::ConcurrentModification`](waitlist_lottery_core::LotteryError::ConcurrentModification),
    ///   [`LotteryError::Store`](waitlist_lottery_core::LotteryError::Store)
    #[tracing::instrument(skip_all, fields(event_id = %event_id, entrant = %entrant))]
    pub async fn cancel_entrant(&self, event_id: EventId, entrant: &EntrantId) -> Result<()> {
        let _guard = self.locks.lock(event_id).await;
        let mut record = self.load(event_id).await?;
        let previous = record.cancel(entrant)?;

        self.update_entrant(
            entrant,
            EntrantUpdate::Registration {
                event_id,
                status: RegistrationStatus::Cancelled,
            },
            Operation::Membership,
        )
        .await?;
        let undo = [(
            entrant.clone(),
            EntrantUpdate::Registration {
                event_id,
                status: previous.into(),
            },
        )];
        self.commit(&record, Operation::Membership, &undo).await?;

        tracing::info!(%previous, "Entrant cancelled");
        Ok(())
    }

    /// Send an organizer message to one of the event's groups.
    ///
    /// Reads a snapshot of the record; concurrent draws may add or remove
    /// recipients.
    ///
    /// # Errors
    ///
    /// - [`LotteryError::EventNotFound`](waitlist_lottery_core::LotteryError::EventNotFound)
    /// - [`LotteryError::Store`](waitlist_lottery_core::LotteryError::Store)
    #[tracing::instrument(skip_all, fields(event_id = %event_id, group = ?group))]
    pub async fn notify_group(
        &self,
        ctx: &OrganizerContext,
        event_id: EventId,
        group: RecipientGroup,
        message: &str,
    ) -> Result<DispatchSummary> {
        let record = self.load(event_id).await?;
        let recipients = record.members(group);
        Ok(self
            .dispatcher
            .dispatch_to_ids(
                ctx,
                &recipients,
                Announcement {
                    event_id,
                    event_name: &record.name,
                    category: group.category(),
                    message,
                },
            )
            .await)
    }

    /// Invite specific entrants to an event.
    ///
    /// # Errors
    ///
    /// - [`LotteryError::EventNotFound`](waitlist_lottery_core::LotteryError::EventNotFound)
    /// - [`LotteryError::Store`](waitlist_lottery_core::LotteryError::Store)
    #[tracing::instrument(skip_all, fields(event_id = %event_id, invitees = entrants.len()))]
    pub async fn send_invitations(
        &self,
        ctx: &OrganizerContext,
        event_id: EventId,
        entrants: &[EntrantId],
        message: &str,
    ) -> Result<DispatchSummary> {
        let record = self.load(event_id).await?;
        Ok(self
            .dispatcher
            .dispatch_to_ids(
                ctx,
                entrants,
                Announcement {
                    event_id,
                    event_name: &record.name,
                    category: NotificationCategory::Invitation,
                    message,
                },
            )
            .await)
    }
}
