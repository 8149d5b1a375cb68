//! State transitions on an [`EventRecord`].
//!
//! Every transition keeps the waitlist / selected / cancelled partition
//! intact. None of them perform I/O; the runtime applies them to a freshly
//! loaded copy while holding the event's lock, then commits the copy.

use crate::error::{LotteryError, Result};
use crate::notification::RecipientGroup;
use crate::types::{Capacity, EntrantId, EventRecord, SelectionStatus};

impl EventRecord {
    /// Number of winners a lottery round should draw now.
    ///
    /// Capacity already taken by selected entrants is not offered again, so
    /// `|selected| <= capacity` holds after the round.
    #[must_use]
    pub fn lottery_size(&self) -> usize {
        let open = match self.capacity {
            Capacity::Unbounded => self.waitlist.len(),
            Capacity::Limited(limit) => (limit as usize).saturating_sub(self.selected.len()),
        };
        open.min(self.waitlist.len())
    }

    /// Entrants an organizer broadcast to `group` reaches.
    #[must_use]
    pub fn members(&self, group: RecipientGroup) -> Vec<EntrantId> {
        match group {
            RecipientGroup::Waitlisted => self.waitlist.to_vec(),
            RecipientGroup::Selected => self.selected_with(SelectionStatus::Notified),
            RecipientGroup::Accepted => self.selected_with(SelectionStatus::Accepted),
            RecipientGroup::Cancelled => self.cancelled.iter().cloned().collect(),
        }
    }

    /// Moves drawn entrants from the waitlist into `selected` as `Notified`.
    ///
    /// Ids not currently on the waitlist are ignored; the ids actually moved
    /// are returned in input order.
    pub fn promote<'a, I>(&mut self, ids: I) -> Vec<EntrantId>
    where
        I: IntoIterator<Item = &'a EntrantId>,
    {
        let mut moved = Vec::new();
        for id in ids {
            if self.waitlist.remove(id) {
                self.selected.insert(id.clone(), SelectionStatus::Notified);
                moved.push(id.clone());
            }
        }
        moved
    }

    /// Puts `Notified` entrants back on the waitlist, undoing a [`promote`](Self::promote).
    pub fn demote<'a, I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = &'a EntrantId>,
    {
        for id in ids {
            if self.selected.get(id) == Some(&SelectionStatus::Notified) {
                self.selected.remove(id);
                self.waitlist.restore(id.clone());
            }
        }
    }

    /// Removes a declining entrant from `selected`.
    ///
    /// Returns `Ok(None)` when the entrant is not selected (a repeated decline
    /// is a no-op).
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::InvalidTransition`] if the entrant already accepted.
    pub fn remove_declined(&mut self, id: &EntrantId) -> Result<Option<SelectionStatus>> {
        match self.selected.get(id) {
            None => Ok(None),
            Some(SelectionStatus::Notified | SelectionStatus::Declined) => {
                Ok(self.selected.remove(id))
            }
            Some(&from) => Err(LotteryError::InvalidTransition {
                entrant: id.clone(),
                from,
                to: SelectionStatus::Declined,
            }),
        }
    }

    /// Marks a notified entrant as having accepted.
    ///
    /// Accepting twice is allowed and changes nothing.
    ///
    /// # Errors
    ///
    /// - [`LotteryError::NotSelected`] if the entrant is not selected
    /// - [`LotteryError::InvalidTransition`] if the entrant is in any other sub-status
    pub fn accept(&mut self, id: &EntrantId) -> Result<()> {
        let Some(status) = self.selected.get_mut(id) else {
            return Err(LotteryError::NotSelected(id.clone()));
        };
        match *status {
            SelectionStatus::Notified | SelectionStatus::Accepted => {
                *status = SelectionStatus::Accepted;
                Ok(())
            }
            from @ SelectionStatus::Declined => Err(LotteryError::InvalidTransition {
                entrant: id.clone(),
                from,
                to: SelectionStatus::Accepted,
            }),
        }
    }

    /// Withdraws a selected entrant into the cancelled set.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::NotSelected`] if the entrant is not selected.
    pub fn cancel(&mut self, id: &EntrantId) -> Result<SelectionStatus> {
        let status = self
            .selected
            .remove(id)
            .ok_or_else(|| LotteryError::NotSelected(id.clone()))?;
        self.cancelled.insert(id.clone());
        Ok(status)
    }

    /// Adds an entrant to the waitlist.
    ///
    /// # Errors
    ///
    /// - [`LotteryError::AlreadyRegistered`] if the entrant is in any collection
    /// - [`LotteryError::WaitlistFull`] if the waitlist limit is reached
    pub fn join(&mut self, id: EntrantId) -> Result<()> {
        if self.selected.contains_key(&id) || self.cancelled.contains(&id) {
            return Err(LotteryError::AlreadyRegistered(id));
        }
        self.waitlist.add(id)
    }

    /// Removes an entrant from the waitlist.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::NotOnWaitlist`] if the entrant is not waiting.
    pub fn leave(&mut self, id: &EntrantId) -> Result<()> {
        if self.waitlist.remove(id) {
            Ok(())
        } else {
            Err(LotteryError::NotOnWaitlist(id.clone()))
        }
    }
}
