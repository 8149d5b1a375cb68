//! End-to-end lottery scenarios against in-memory collaborators.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

mod common;

use common::{Harness, assert_partition, ctx, id};
use std::collections::BTreeSet;
use waitlist_lottery_core::notification::{DispatchSummary, NotificationCategory};
use waitlist_lottery_core::{EntrantId, LotteryError, RegistrationStatus, SelectionStatus};
use waitlist_lottery_testing::fixtures::{
    event_with_capacity, event_with_waitlist, ids, opted_out_entrant, token_for,
};

const FIVE: [&str; 5] = ["A", "B", "C", "D", "E"];

fn set(ids: &[EntrantId]) -> BTreeSet<EntrantId> {
    ids.iter().cloned().collect()
}

// ============================================================================
// Lottery rounds
// ============================================================================

#[tokio::test]
async fn full_lottery_selects_capacity_and_notifies_everyone() {
    let h = Harness::new(1);
    let event_id = h.with_event(event_with_capacity("Pottery Night", 2, &FIVE));

    let outcome = h.engine.run_lottery(&ctx(), event_id).await.unwrap();

    assert_eq!(set(&outcome.winners).len(), 2);
    assert_eq!(outcome.remaining.len(), 3);
    let everyone: BTreeSet<_> = outcome.winners.iter().chain(&outcome.remaining).cloned().collect();
    assert_eq!(everyone, set(&ids(&FIVE)));

    assert_eq!(h.push.attempts().len(), 5);
    assert_eq!(h.push.count_tagged("winner"), 2);
    assert_eq!(h.push.count_tagged("loser"), 3);
    assert_eq!(outcome.notifications, DispatchSummary { sent: 5, skipped: 0, failed: 0 });

    let record = h.record(event_id);
    assert_partition(&record);
    assert_eq!(set(&record.selected_with(SelectionStatus::Notified)), set(&outcome.winners));
    assert_eq!(record.waitlist.to_vec(), outcome.remaining);
    for winner in &outcome.winners {
        let entrant = h.directory.entrant(winner).unwrap();
        assert_eq!(entrant.registration(&event_id), Some(RegistrationStatus::Notified));
    }
}

#[tokio::test]
async fn lottery_payloads_use_category_templates() {
    let h = Harness::new(2);
    let event_id = h.with_event(event_with_capacity("Pottery Night", 1, &["A", "B"]));

    let outcome = h.engine.run_lottery(&ctx(), event_id).await.unwrap();

    let winner_token = token_for(outcome.winners[0].as_str());
    for attempt in h.push.attempts() {
        if attempt.token == winner_token {
            assert_eq!(attempt.title, "Congratulations!");
            assert!(attempt.body.contains("Pottery Night"));
            assert_eq!(attempt.category_tag(), Some("winner"));
        } else {
            assert_eq!(attempt.title, "Lottery Results for Pottery Night");
            assert!(attempt.body.contains("not selected"));
            assert_eq!(attempt.data.get("eventName").map(String::as_str), Some("Pottery Night"));
        }
        assert_eq!(attempt.data.get("eventId"), Some(&event_id.to_string()));
    }
}

#[tokio::test]
async fn lottery_audits_only_accepted_deliveries() {
    let h = Harness::new(3);
    let event_id = h.with_event(event_with_capacity("Pottery Night", 2, &FIVE));
    h.directory.insert(opted_out_entrant("E"));
    h.push.fail_token(token_for("D"));

    let outcome = h.engine.run_lottery(&ctx(), event_id).await.unwrap();

    assert_eq!(outcome.notifications, DispatchSummary { sent: 3, skipped: 1, failed: 1 });
    assert_eq!(h.push.attempts().len(), 4);

    let audit = h.engine.event_notifications(event_id).await.unwrap();
    assert_eq!(audit.len(), 3);
    let audited: BTreeSet<_> = audit.iter().map(|r| r.recipient_id.clone()).collect();
    assert!(!audited.contains(&id("D")));
    assert!(!audited.contains(&id("E")));
    for record in &audit {
        assert_eq!(record.sender_id, "organizer-1");
        assert_eq!(record.event_name, "Pottery Night");
        let expected = if outcome.winners.contains(&record.recipient_id) {
            NotificationCategory::Winner
        } else {
            NotificationCategory::Loser
        };
        assert_eq!(record.category, expected);
    }
}

#[tokio::test]
async fn everyone_left_waiting_hears_the_result() {
    for seed in 0..8 {
        let h = Harness::new(seed);
        let event_id = h.with_event(event_with_capacity("Pottery Night", 2, &FIVE));
        h.directory.fail_updates_for(&id("A"));
        h.directory.fail_updates_for(&id("B"));

        let outcome = h.engine.run_lottery(&ctx(), event_id).await.unwrap();

        assert_eq!(outcome.winners.len() + outcome.remaining.len(), 5);
        assert_eq!(h.push.count_tagged("winner"), outcome.winners.len());
        assert_eq!(h.push.count_tagged("loser"), outcome.remaining.len());
        for failed in &outcome.failed {
            assert!(outcome.remaining.contains(failed));
        }
    }
}

#[tokio::test]
async fn round_where_every_draw_fails_still_sends_results() {
    let h = Harness::new(11);
    let event_id = h.with_event(event_with_capacity("Pottery Night", 2, &["A", "B", "C"]));
    for name in ["A", "B", "C"] {
        h.directory.fail_updates_for(&id(name));
    }

    let outcome = h.engine.run_lottery(&ctx(), event_id).await.unwrap();

    assert!(outcome.winners.is_empty());
    assert_eq!(outcome.failed.len(), 2);
    assert_eq!(outcome.remaining, ids(&["A", "B", "C"]));
    assert_eq!(h.push.count_tagged("loser"), 3);
    assert_eq!(h.store.commit_count(), 0);
}

// ============================================================================
// Declines
// ============================================================================

#[tokio::test]
async fn decline_draws_one_replacement() {
    let h = Harness::new(4);
    let mut record = event_with_waitlist("Pottery Night", &["A", "B", "C", "D"]);
    record.promote(&ids(&["A", "B"]));
    let event_id = h.with_event(record);

    let outcome = h.engine.handle_decline(&ctx(), event_id, &id("A")).await.unwrap();

    let replacement = outcome.replacement.clone().unwrap();
    assert!(replacement == id("C") || replacement == id("D"));

    let record = h.record(event_id);
    assert_partition(&record);
    assert_eq!(set(&record.selected.keys().cloned().collect::<Vec<_>>()), set(&[id("B"), replacement.clone()]));
    let other = if replacement == id("C") { id("D") } else { id("C") };
    assert_eq!(record.waitlist.to_vec(), vec![other]);
    assert!(!record.is_engaged(&id("A")));

    assert_eq!(h.push.attempts().len(), 1);
    assert_eq!(h.push.attempts()[0].token, token_for(replacement.as_str()));
    assert_eq!(outcome.notifications.sent, 1);
}

#[tokio::test]
async fn decline_with_empty_waitlist_leaves_seat_open() {
    let h = Harness::new(5);
    let mut record = event_with_waitlist("Pottery Night", &["A", "B"]);
    record.promote(&ids(&["A", "B"]));
    let event_id = h.with_event(record);

    let outcome = h.engine.handle_decline(&ctx(), event_id, &id("A")).await.unwrap();

    assert_eq!(outcome.replacement, None);
    let record = h.record(event_id);
    assert_eq!(record.selected.keys().cloned().collect::<Vec<_>>(), vec![id("B")]);
    assert!(record.waitlist.is_empty());
    assert!(h.push.attempts().is_empty());
}

#[tokio::test]
async fn repeated_decline_is_noop() {
    let h = Harness::new(6);
    let mut record = event_with_waitlist("Pottery Night", &["A", "B", "C"]);
    record.promote(&ids(&["A"]));
    let event_id = h.with_event(record);

    h.engine.handle_decline(&ctx(), event_id, &id("A")).await.unwrap();
    let after_first = h.record(event_id);
    let commits = h.store.commit_count();
    h.push.clear();

    let second = h.engine.handle_decline(&ctx(), event_id, &id("A")).await.unwrap();

    assert_eq!(second.replacement, None);
    assert_eq!(second.notifications, DispatchSummary::default());
    assert_eq!(h.record(event_id), after_first);
    assert_eq!(h.store.commit_count(), commits);
    assert!(h.push.attempts().is_empty());
}

// ============================================================================
// Redraws
// ============================================================================

#[tokio::test]
async fn oversized_redraw_is_rejected_before_any_change() {
    let h = Harness::new(7);
    let event_id = h.with_event(event_with_waitlist("Pottery Night", &["A", "B", "C"]));
    let before = h.record(event_id);

    let err = h.engine.redraw(&ctx(), event_id, 5).await.unwrap_err();

    assert_eq!(err, LotteryError::InvalidRedrawSize { requested: 5, available: 3 });
    assert_eq!(h.record(event_id), before);
    assert_eq!(h.store.commit_count(), 0);
    assert!(h.directory.updates().is_empty());
    assert!(h.push.attempts().is_empty());
}

#[tokio::test]
async fn redraw_moves_exactly_the_requested_number() {
    let h = Harness::new(8);
    let mut record = event_with_waitlist("Pottery Night", &["A", "B", "C", "D", "E"]);
    record.promote(&ids(&["A"]));
    let event_id = h.with_event(record);

    let outcome = h.engine.redraw(&ctx(), event_id, 2).await.unwrap();

    assert_eq!(outcome.succeeded(), 2);
    assert_eq!(outcome.requested, 2);
    assert!(outcome.failed.is_empty());
    let record = h.record(event_id);
    assert_partition(&record);
    assert_eq!(record.selected.len(), 3);
    assert_eq!(record.waitlist.len(), 2);
    assert_eq!(h.push.count_tagged("winner"), 2);
}

#[tokio::test]
async fn redraw_reports_missing_entrants_as_failed() {
    let h = Harness::new(9);
    let event_id = h.with_event(event_with_waitlist("Pottery Night", &["A", "B", "C"]));
    h.directory.remove(&id("B"));

    let outcome = h.engine.redraw(&ctx(), event_id, 3).await.unwrap();

    assert_eq!(outcome.succeeded(), 2);
    assert_eq!(outcome.failed, vec![id("B")]);
    let record = h.record(event_id);
    assert_eq!(record.waitlist.to_vec(), vec![id("B")]);
    assert_eq!(h.push.attempts().len(), 2);
}

// ============================================================================
// Full lifecycle
// ============================================================================

#[tokio::test]
async fn join_draw_accept_decline_cancel() {
    let h = Harness::new(10);
    let event_id = h.with_event(event_with_capacity("Pottery Night", 2, &[]));
    for name in FIVE {
        h.directory.insert(waitlist_lottery_testing::fixtures::entrant(name));
        h.engine.join_waitlist(event_id, &id(name)).await.unwrap();
    }
    assert_eq!(h.record(event_id).waitlist.len(), 5);

    let round = h.engine.run_lottery(&ctx(), event_id).await.unwrap();
    let (first, second) = (round.winners[0].clone(), round.winners[1].clone());

    h.engine.accept_invitation(event_id, &first).await.unwrap();
    let decline = h.engine.handle_decline(&ctx(), event_id, &second).await.unwrap();
    let replacement = decline.replacement.unwrap();
    h.engine.cancel_entrant(event_id, &first).await.unwrap();

    let record = h.record(event_id);
    assert_partition(&record);
    assert!(record.cancelled.contains(&first));
    assert_eq!(record.selected.get(&replacement), Some(&SelectionStatus::Notified));
    assert!(!record.is_engaged(&second));
    assert_eq!(record.waitlist.len(), 2);

    let second_entrant = h.directory.entrant(&second).unwrap();
    assert_eq!(second_entrant.registration(&event_id), Some(RegistrationStatus::Declined));

    let history = h.engine.entrant_notifications(&replacement).await.unwrap();
    assert_eq!(history[0].category, NotificationCategory::Winner);
}
