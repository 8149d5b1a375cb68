//! # Waitlist Lottery Testing
//!
//! Testing utilities for the waitlist lottery engine.
//!
//! This crate provides:
//! - In-memory implementations of every collaborator trait, with failure injection
//! - A fixed clock for deterministic audit timestamps
//! - Fixtures for entrants and event records
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```
//! use waitlist_lottery_testing::fixtures::{entrant, event_with_waitlist};
//! use waitlist_lottery_testing::{InMemoryEntrantDirectory, InMemoryEventStore};
//!
//! let directory = InMemoryEntrantDirectory::with_entrants(["a", "b", "c"].map(entrant));
//! let store = InMemoryEventStore::new();
//! let record = event_with_waitlist("Pottery Night", &["a", "b", "c"]);
//! let event_id = record.id;
//! store.insert(record);
//!
//! assert_eq!(directory.len(), 3);
//! assert_eq!(store.record(&event_id).map(|r| r.waitlist.len()), Some(3));
//! ```

use chrono::{DateTime, Utc};
use waitlist_lottery_core::environment::Clock;

mod collaborators;

pub use collaborators::{
    InMemoryEntrantDirectory, InMemoryEventStore, InMemoryNotificationLog, PushAttempt,
    RecordingPushDelivery,
};

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, so audit records carry predictable timestamps.
    ///
    /// # Example
    ///
    /// ```
    /// use waitlist_lottery_testing::mocks::FixedClock;
    /// use waitlist_lottery_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Builders for common test data.
pub mod fixtures {
    use waitlist_lottery_core::{Capacity, Entrant, EntrantId, EventId, EventRecord, Waitlist};

    /// Organizer id used by [`event_with_waitlist`]
    pub const ORGANIZER_ID: &str = "organizer-1";

    /// Delivery token [`entrant`] assigns to `id`
    #[must_use]
    pub fn token_for(id: &str) -> String {
        format!("token-{id}")
    }

    /// A notifiable entrant named after its id, holding the token [`token_for`] gives.
    #[must_use]
    pub fn entrant(id: &str) -> Entrant {
        Entrant::new(EntrantId::new(id), format!("Entrant {id}"), format!("{id}@example.com"))
            .with_delivery_token(token_for(id))
    }

    /// An entrant without a delivery token
    #[must_use]
    pub fn entrant_without_token(id: &str) -> Entrant {
        Entrant::new(EntrantId::new(id), format!("Entrant {id}"), format!("{id}@example.com"))
    }

    /// An entrant holding a token but opted out of notifications
    #[must_use]
    pub fn opted_out_entrant(id: &str) -> Entrant {
        entrant(id).with_notifications(false)
    }

    /// Entrant ids from string slices
    #[must_use]
    pub fn ids(names: &[&str]) -> Vec<EntrantId> {
        names.iter().map(|name| EntrantId::new(*name)).collect()
    }

    /// Unbounded event whose waitlist holds `names`
    #[must_use]
    pub fn event_with_waitlist(name: &str, names: &[&str]) -> EventRecord {
        EventRecord::new(EventId::new(), name, ORGANIZER_ID)
            .with_waitlist(ids(names).into_iter().collect::<Waitlist>())
    }

    /// Event with a limited capacity whose waitlist holds `names`
    #[must_use]
    pub fn event_with_capacity(name: &str, capacity: u32, names: &[&str]) -> EventRecord {
        event_with_waitlist(name, names).with_capacity(Capacity::Limited(capacity))
    }
}

/// Property-based testing strategies using proptest.
pub mod properties {
    use proptest::prelude::*;
    use waitlist_lottery_core::{Capacity, EntrantId};

    /// Between `0` and `max` distinct entrant ids
    pub fn entrant_ids(max: usize) -> impl Strategy<Value = Vec<EntrantId>> {
        proptest::collection::btree_set("[a-z]{1,8}", 0..=max)
            .prop_map(|names| names.into_iter().map(EntrantId::new).collect())
    }

    /// Unbounded, or a limit between 0 and `max`
    pub fn capacity(max: u32) -> impl Strategy<Value = Capacity> {
        prop_oneof![
            1 => Just(Capacity::Unbounded),
            4 => (0..=max).prop_map(Capacity::Limited),
        ]
    }
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
