//! Shared wiring for runtime integration tests.

#![allow(dead_code)] // Each test binary uses a different subset
#![allow(clippy::expect_used)]

use std::sync::Arc;
use waitlist_lottery_core::{EntrantId, EventId, EventRecord, OrganizerContext};
use waitlist_lottery_runtime::{EngineConfig, EngineEnvironment, LotteryEngine};
use waitlist_lottery_testing::fixtures::entrant;
use waitlist_lottery_testing::{
    InMemoryEntrantDirectory, InMemoryEventStore, InMemoryNotificationLog, RecordingPushDelivery,
    init_test_tracing, test_clock,
};

/// Engine wired to in-memory collaborators, with handles to inspect them.
pub struct Harness {
    pub directory: InMemoryEntrantDirectory,
    pub store: InMemoryEventStore,
    pub push: RecordingPushDelivery,
    pub log: InMemoryNotificationLog,
    pub engine: Arc<LotteryEngine>,
}

impl Harness {
    pub fn new(seed: u64) -> Self {
        init_test_tracing();
        let directory = InMemoryEntrantDirectory::new();
        let store = InMemoryEventStore::new();
        let push = RecordingPushDelivery::new();
        let log = InMemoryNotificationLog::new();
        let env = EngineEnvironment::new(
            Arc::new(directory.clone()),
            Arc::new(store.clone()),
            Arc::new(push.clone()),
            Arc::new(log.clone()),
        )
        .with_clock(Arc::new(test_clock()));
        let engine = LotteryEngine::new(env, EngineConfig::default().with_draw_seed(seed));
        Self {
            directory,
            store,
            push,
            log,
            engine: Arc::new(engine),
        }
    }

    /// Store the record and register a notifiable entrant for every id it mentions.
    pub fn with_event(&self, record: EventRecord) -> EventId {
        let mentioned = record
            .waitlist
            .iter()
            .chain(record.selected.keys())
            .chain(record.cancelled.iter());
        for id in mentioned {
            self.directory.insert(entrant(id.as_str()));
        }
        let event_id = record.id;
        self.store.insert(record);
        event_id
    }

    pub fn record(&self, event_id: EventId) -> EventRecord {
        self.store.record(&event_id).expect("event should be stored")
    }
}

pub fn ctx() -> OrganizerContext {
    OrganizerContext::new("organizer-1", "Olive")
}

pub fn id(name: &str) -> EntrantId {
    EntrantId::new(name)
}

/// Panics if any entrant appears in more than one collection.
pub fn assert_partition(record: &EventRecord) {
    assert_eq!(
        record.partition_violation(),
        None,
        "entrant in more than one collection: {record:?}"
    );
}
