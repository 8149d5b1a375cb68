//! Notification categories, payload templates and audit records.

use crate::types::{EntrantId, EventId, NotificationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Outcome category a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    /// Drawn in a lottery, replacement or redraw
    Winner,
    /// Left on the waitlist after a lottery round
    Loser,
    /// Invited by the organizer
    Invitation,
    /// Organizer message to the waitlist
    Waitlist,
    /// Organizer message to selected entrants
    Selected,
    /// Organizer message to cancelled entrants
    Cancelled,
    /// Organizer message to entrants who accepted
    Accepted,
}

impl NotificationCategory {
    /// Tag stored on audit records and sent in the push data map
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Winner => "winner",
            Self::Loser => "loser",
            Self::Invitation => "invitation",
            Self::Waitlist => "waitlist",
            Self::Selected => "selected",
            Self::Cancelled => "cancelled",
            Self::Accepted => "accepted",
        }
    }
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Which of an event's collections an organizer broadcast targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipientGroup {
    /// Everyone on the waitlist
    Waitlisted,
    /// Selected entrants still awaiting a reply
    Selected,
    /// Cancelled entrants
    Cancelled,
    /// Selected entrants who accepted
    Accepted,
}

impl RecipientGroup {
    /// Category used for a broadcast to this group
    #[must_use]
    pub const fn category(self) -> NotificationCategory {
        match self {
            Self::Waitlisted => NotificationCategory::Waitlist,
            Self::Selected => NotificationCategory::Selected,
            Self::Cancelled => NotificationCategory::Cancelled,
            Self::Accepted => NotificationCategory::Accepted,
        }
    }
}

/// Title and body shown to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Notification title
    pub title: String,
    /// Notification body
    pub body: String,
}

impl NotificationPayload {
    /// Builds the category-specific payload.
    ///
    /// Winner and loser use fixed wording; every other category carries the
    /// organizer's `message` as its body.
    #[must_use]
    pub fn build(
        category: NotificationCategory,
        recipient_name: &str,
        event_name: &str,
        message: &str,
    ) -> Self {
        let (title, body) = match category {
            NotificationCategory::Winner => (
                "Congratulations!".to_string(),
                format!(
                    "Congratulations {recipient_name}! You have been selected for {event_name}. \
                     Please check your invitations to accept or decline."
                ),
            ),
            NotificationCategory::Loser => (
                format!("Lottery Results for {event_name}"),
                format!(
                    "Thank you for your interest in {event_name}. Unfortunately, you were not \
                     selected in this lottery. Keep an eye out for future events!"
                ),
            ),
            NotificationCategory::Invitation => (
                format!("You're invited to {event_name}!"),
                if message.trim().is_empty() {
                    format!("Hi {recipient_name}, you have been invited to join {event_name}.")
                } else {
                    message.to_string()
                },
            ),
            NotificationCategory::Waitlist => {
                (format!("Waitlist update: {event_name}"), message.to_string())
            }
            NotificationCategory::Selected => {
                (format!("Selection update: {event_name}"), message.to_string())
            }
            NotificationCategory::Cancelled => {
                (format!("Cancellation notice: {event_name}"), message.to_string())
            }
            NotificationCategory::Accepted => {
                (format!("Confirmed: {event_name}"), message.to_string())
            }
        };
        Self { title, body }
    }

    /// Data map sent alongside the push
    #[must_use]
    pub fn data(
        &self,
        category: NotificationCategory,
        event_id: &EventId,
        event_name: &str,
    ) -> HashMap<String, String> {
        HashMap::from([
            ("title".to_string(), self.title.clone()),
            ("body".to_string(), self.body.clone()),
            ("eventId".to_string(), event_id.to_string()),
            ("eventName".to_string(), event_name.to_string()),
            ("type".to_string(), category.tag().to_string()),
        ])
    }
}

/// Append-only audit entry, one per delivery the channel accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Record identifier
    pub id: NotificationId,
    /// Organizer id
    pub sender_id: String,
    /// Organizer display name
    pub sender_name: String,
    /// Recipient id
    pub recipient_id: EntrantId,
    /// Recipient display name
    pub recipient_name: String,
    /// Body that was sent
    pub message: String,
    /// Event concerned
    pub event_id: EventId,
    /// Event name
    pub event_name: String,
    /// Category
    pub category: NotificationCategory,
    /// When the channel accepted the delivery
    pub timestamp: DateTime<Utc>,
}

/// Counts from one dispatch call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    /// Accepted by the channel and audited
    pub sent: usize,
    /// Not attempted: opted out, no token, or unknown recipient
    pub skipped: usize,
    /// Attempted but refused by the channel
    pub failed: usize,
}

impl DispatchSummary {
    /// Recipients a delivery was attempted for
    #[must_use]
    pub const fn attempted(&self) -> usize {
        self.sent + self.failed
    }

    /// Adds another summary's counts to this one
    pub const fn merge(&mut self, other: Self) {
        self.sent += other.sent;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}
