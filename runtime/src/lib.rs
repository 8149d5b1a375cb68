//! # Waitlist Lottery Runtime
//!
//! Runs the waitlist lottery against injected collaborators.
//!
//! ## Core Components
//!
//! - **`LotteryEngine`**: lottery rounds, decline replacement, manual redraw,
//!   waitlist membership and organizer broadcasts
//! - **`NotificationDispatcher`**: eligibility filtering, concurrent push
//!   submission and the audit trail
//! - **`EventLocks`**: per-event serialization of read-modify-write cycles
//! - **`EngineConfig`**: environment-driven configuration
//!
//! ## Example
//!
//! ```ignore
//! use waitlist_lottery_runtime::{EngineConfig, EngineEnvironment, LotteryEngine};
//!
//! let config = EngineConfig::from_env();
//! waitlist_lottery_runtime::tracing_setup::init_tracing(&config)?;
//!
//! let env = EngineEnvironment::new(directory, store, push, audit_log);
//! let engine = LotteryEngine::new(env, config);
//!
//! let outcome = engine.run_lottery(&organizer, event_id).await?;
//! println!("{} winners, {} still waiting", outcome.winners.len(), outcome.remaining.len());
//! ```

/// Environment-driven configuration
pub mod config;

/// Notification fan-out to the push channel
pub mod dispatcher;

/// Engine facade and shared commit plumbing
pub mod engine;

/// Per-event locks
pub mod locks;

/// Prometheus metrics for observability
pub mod metrics;

/// Operation results
pub mod outcome;

/// Subscriber installation
pub mod tracing_setup;

mod lifecycle;
mod lottery;
mod redraw;
mod replacement;

pub use config::EngineConfig;
pub use dispatcher::{Announcement, NotificationDispatcher};
pub use engine::{EngineEnvironment, LotteryEngine};
pub use locks::EventLocks;
pub use outcome::{DeclineOutcome, LotteryOutcome, RedrawOutcome};
