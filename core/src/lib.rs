//! # Waitlist Lottery Core
//!
//! Domain types and pure logic for drawing entrants off an event's waitlist.
//!
//! This crate provides:
//! - **Types**: entrants, event records and the selection sub-status
//! - **Waitlist**: the pool of entrants awaiting a decision
//! - **Draw Engine**: uniform selection without replacement
//! - **Record transitions**: partition-preserving moves between collections
//! - **Notifications**: categories, payload templates, audit records
//! - **Environment**: collaborator traits (directory, store, push, audit log, clock)
//!
//! Nothing here performs I/O. The `waitlist-lottery-runtime` crate wires
//! these pieces to the collaborators and serializes mutations per event.
//!
//! ## Example
//!
//! ```
//! use waitlist_lottery_core::draw::{DrawEngine, DrawMode};
//! use waitlist_lottery_core::types::EntrantId;
//!
//! let pool: Vec<EntrantId> = ["a", "b", "c", "d", "e"].into_iter().map(EntrantId::from).collect();
//! let engine = DrawEngine::seeded(7);
//! let winners = engine.draw(&pool, 2, DrawMode::Clamp).unwrap_or_default();
//! assert_eq!(winners.len(), 2);
//! ```

pub mod draw;
pub mod environment;
pub mod error;
pub mod notification;
pub mod record;
pub mod types;
pub mod waitlist;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use error::{LotteryError, Result};
pub use types::{
    Capacity, Entrant, EntrantId, EventId, EventRecord, OrganizerContext, RegistrationStatus,
    SelectionStatus, Version,
};
pub use waitlist::Waitlist;
