//! Seat allocation: greedy first-come-first-served against capacity.
//!
//! Allocation is strictly FIFO over submission time, not bin packing: a
//! large party that does not fit is waitlisted even when a later, smaller
//! party would still fit and is then confirmed. Arrival order is never
//! bypassed for packing efficiency - that is the fairness contract, not a
//! bug to optimize away.

use crate::types::{Capacity, ParticipantName, RegistrationStatus, Roster};

/// Names decided by an allocation pass, in decision order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllocationOutcome {
    /// Entries that received seats
    pub confirmed: Vec<ParticipantName>,
    /// Entries that did not fit
    pub waitlisted: Vec<ParticipantName>,
}

impl AllocationOutcome {
    /// Checks whether the pass decided nothing
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.confirmed.is_empty() && self.waitlisted.is_empty()
    }
}

/// Decides every `Unset` entry against the game's capacity.
///
/// Only undecided entries are touched, which makes the pass idempotent:
/// confirmed, waitlisted, cancelled, and operator-pinned entries keep
/// their status. The running seat count is seeded with every currently
/// confirmed entry (wherever it sits in submission order), so undecided
/// entries always allocate against true remaining capacity. Undecided
/// entries are then walked in ascending submission time, insertion order
/// breaking exact ties, and each either fits in full or goes to the
/// waitlist.
///
/// There are no failure modes: zero capacity simply waitlists everyone.
pub fn allocate(roster: &mut Roster, capacity: Capacity) -> AllocationOutcome {
    let mut cumulative = roster.confirmed_seats();
    let mut outcome = AllocationOutcome::default();

    let entries = roster.entries_mut();
    let mut undecided: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.status.is_unset())
        .map(|(i, _)| i)
        .collect();
    // Stable sort: entries submitted at the same instant keep insertion order
    undecided.sort_by_key(|&i| entries[i].submitted_at);

    for i in undecided {
        let entry = &mut entries[i];
        let party = entry.party_size();
        if cumulative.saturating_add(party) <= capacity.seats() {
            entry.status = RegistrationStatus::Confirmed;
            cumulative = cumulative.saturating_add(party);
            outcome.confirmed.push(entry.name.clone());
        } else {
            entry.status = RegistrationStatus::Waitlisted;
            outcome.waitlisted.push(entry.name.clone());
        }
    }

    tracing::debug!(
        confirmed = outcome.confirmed.len(),
        waitlisted = outcome.waitlisted.len(),
        seats_used = cumulative,
        capacity = capacity.seats(),
        "allocation pass complete"
    );

    outcome
}
