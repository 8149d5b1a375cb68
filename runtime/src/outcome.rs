//! Values returned by the engine's draw operations.

use serde::{Deserialize, Serialize};
use waitlist_lottery_core::EntrantId;
use waitlist_lottery_core::notification::DispatchSummary;

/// Result of one lottery round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotteryOutcome {
    /// Entrants moved to `selected` as `Notified`
    pub winners: Vec<EntrantId>,
    /// Entrants left on the waitlist, including `failed`
    pub remaining: Vec<EntrantId>,
    /// Drawn entrants whose directory update failed; they stay on the waitlist
    pub failed: Vec<EntrantId>,
    /// Winner and loser notifications combined
    pub notifications: DispatchSummary,
}

/// Result of a decline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclineOutcome {
    /// Entrant drawn to take the freed seat, if anyone was waiting
    pub replacement: Option<EntrantId>,
    /// Candidates tried before the replacement whose directory update failed
    pub failed: Vec<EntrantId>,
    /// Winner notification to the replacement
    pub notifications: DispatchSummary,
}

/// Result of an organizer-initiated redraw.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedrawOutcome {
    /// Entrants moved to `selected` as `Notified`
    pub drawn: Vec<EntrantId>,
    /// Drawn entrants whose directory update failed; they stay on the waitlist
    pub failed: Vec<EntrantId>,
    /// Number of entrants the organizer asked for
    pub requested: usize,
    /// Winner notifications to the drawn entrants
    pub notifications: DispatchSummary,
}

impl RedrawOutcome {
    /// Entrants actually moved
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.drawn.len()
    }

    /// Whether every requested entrant was moved
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.succeeded() == self.requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redraw_counts() {
        let outcome = RedrawOutcome {
            drawn: vec![EntrantId::new("a")],
            failed: vec![EntrantId::new("b")],
            requested: 2,
            notifications: DispatchSummary::default(),
        };
        assert_eq!(outcome.succeeded(), 1);
        assert!(!outcome.is_complete());
    }
}
