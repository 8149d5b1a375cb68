//! Notification fan-out to the push channel.
//!
//! The dispatcher is the only component that talks to [`PushDelivery`]. It
//! filters out recipients who cannot be reached, submits the rest
//! concurrently, and appends one audit record for every push the channel
//! accepts. Failures are isolated per recipient and never retried.

use crate::metrics::{DeliveryOutcome, LotteryMetrics};
use futures::future;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use waitlist_lottery_core::environment::{Clock, EntrantDirectory, NotificationLog, PushDelivery};
use waitlist_lottery_core::notification::{
    DispatchSummary, NotificationCategory, NotificationPayload, NotificationRecord,
};
use waitlist_lottery_core::types::NotificationId;
use waitlist_lottery_core::{Entrant, EntrantId, EventId, OrganizerContext};

/// What one dispatch is about: the event, the category and the organizer's text.
#[derive(Debug, Clone, Copy)]
pub struct Announcement<'a> {
    /// Event concerned
    pub event_id: EventId,
    /// Event name used in titles and bodies
    pub event_name: &'a str,
    /// Outcome category
    pub category: NotificationCategory,
    /// Organizer-supplied text (ignored by the winner and loser templates)
    pub message: &'a str,
}

/// Builds payloads and submits them to the push channel.
#[derive(Clone)]
pub struct NotificationDispatcher {
    directory: Arc<dyn EntrantDirectory>,
    push: Arc<dyn PushDelivery>,
    log: Arc<dyn NotificationLog>,
    clock: Arc<dyn Clock>,
    concurrency: usize,
}

impl NotificationDispatcher {
    /// Create a dispatcher submitting at most `concurrency` pushes at once
    #[must_use]
    pub fn new(
        directory: Arc<dyn EntrantDirectory>,
        push: Arc<dyn PushDelivery>,
        log: Arc<dyn NotificationLog>,
        clock: Arc<dyn Clock>,
        concurrency: usize,
    ) -> Self {
        Self {
            directory,
            push,
            log,
            clock,
            concurrency: concurrency.max(1),
        }
    }

    /// Notify each recipient about `announcement`.
    ///
    /// Recipients that opted out or have no delivery token are counted as
    /// skipped. Completion order across recipients is unspecified.
    pub async fn dispatch(
        &self,
        ctx: &OrganizerContext,
        recipients: &[Entrant],
        announcement: Announcement<'_>,
    ) -> DispatchSummary {
        let started = Instant::now();
        let mut summary = DispatchSummary::default();
        let mut eligible = Vec::with_capacity(recipients.len());

        for recipient in recipients {
            if let Some(token) = recipient.notifiable_token() {
                eligible.push((recipient, token));
            } else {
                tracing::debug!(
                    recipient = %recipient.id,
                    category = %announcement.category,
                    "Skipping recipient: opted out or no delivery token"
                );
                LotteryMetrics::record_notification(announcement.category, DeliveryOutcome::Skipped);
                summary.skipped += 1;
            }
        }

        // Collected first so the returned future stays `Send`.
        let pending: Vec<_> = eligible
            .into_iter()
            .map(|(recipient, token)| self.deliver(ctx, recipient, token, announcement))
            .collect();
        let outcomes: Vec<DeliveryOutcome> = stream::iter(pending)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                DeliveryOutcome::Sent => summary.sent += 1,
                DeliveryOutcome::Failed => summary.failed += 1,
                DeliveryOutcome::Skipped => summary.skipped += 1,
            }
        }

        LotteryMetrics::record_dispatch(announcement.category, started.elapsed());
        tracing::info!(
            event_id = %announcement.event_id,
            category = %announcement.category,
            sent = summary.sent,
            skipped = summary.skipped,
            failed = summary.failed,
            "Dispatched notifications"
        );
        summary
    }

    /// Like [`dispatch`](Self::dispatch), resolving recipients through the directory first.
    ///
    /// Ids the directory does not know, or cannot look up, count as skipped.
    pub async fn dispatch_to_ids(
        &self,
        ctx: &OrganizerContext,
        ids: &[EntrantId],
        announcement: Announcement<'_>,
    ) -> DispatchSummary {
        if ids.is_empty() {
            return DispatchSummary::default();
        }

        let pending: Vec<_> = ids.iter().map(|id| self.directory.get(id)).collect();
        let lookups = future::join_all(pending).await;
        let mut unresolved = 0;
        let mut recipients = Vec::with_capacity(ids.len());
        for (id, lookup) in ids.iter().zip(lookups) {
            match lookup {
                Ok(Some(entrant)) => recipients.push(entrant),
                Ok(None) => {
                    tracing::debug!(recipient = %id, "Skipping recipient: not in directory");
                    unresolved += 1;
                }
                Err(error) => {
                    tracing::warn!(recipient = %id, %error, "Skipping recipient: directory lookup failed");
                    unresolved += 1;
                }
            }
        }
        for _ in 0..unresolved {
            LotteryMetrics::record_notification(announcement.category, DeliveryOutcome::Skipped);
        }

        let mut summary = self.dispatch(ctx, &recipients, announcement).await;
        summary.skipped += unresolved;
        summary
    }

    async fn deliver(
        &self,
        ctx: &OrganizerContext,
        recipient: &Entrant,
        token: &str,
        announcement: Announcement<'_>,
    ) -> DeliveryOutcome {
        let Announcement {
            event_id,
            event_name,
            category,
            message,
        } = announcement;
        let payload = NotificationPayload::build(category, &recipient.name, event_name, message);
        let data = payload.data(category, &event_id, event_name);

        if let Err(error) = self.push.send(token, &payload.title, &payload.body, data).await {
            tracing::warn!(
                recipient = %recipient.id,
                %category,
                %error,
                "Push delivery failed"
            );
            LotteryMetrics::record_notification(category, DeliveryOutcome::Failed);
            return DeliveryOutcome::Failed;
        }

        let record = NotificationRecord {
            id: NotificationId::new(),
            sender_id: ctx.organizer_id.clone(),
            sender_name: ctx.organizer_name.clone(),
            recipient_id: recipient.id.clone(),
            recipient_name: recipient.name.clone(),
            message: payload.body,
            event_id,
            event_name: event_name.to_string(),
            category,
            timestamp: self.clock.now(),
        };
        if let Err(error) = self.log.append(record).await {
            tracing::warn!(recipient = %recipient.id, %error, "Failed to append notification audit record");
        }

        LotteryMetrics::record_notification(category, DeliveryOutcome::Sent);
        DeliveryOutcome::Sent
    }
}
