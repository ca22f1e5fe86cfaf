//! Waitlist promotion.
//!
//! When confirmed seats free up, the waitlist is ranked by priority score
//! and scanned top to bottom. A party that does not fit in the remaining
//! seats is skipped, not blocked on: the scan keeps going so a smaller
//! party further down can take the space. Entries whose status was pinned
//! by an organizer are left where they are.

use crate::environment::AttendanceSource;
use crate::priority::{score, waitlist_rank};
use crate::types::{
    Capacity, ParticipantName, PriorityScore, RegistrationStatus, Roster,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Result of a promotion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionOutcome {
    /// Names promoted to confirmed, in the order they were promoted.
    pub promoted: Vec<ParticipantName>,
    /// Seats still open after the pass.
    pub seats_remaining: u32,
}

impl PromotionOutcome {
    /// True when the pass promoted nobody.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.promoted.is_empty()
    }
}

/// Snapshot of the waitlist for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitlistOverview {
    /// Seat capacity of the game.
    pub capacity: Capacity,
    /// Seats currently held by confirmed parties.
    pub confirmed_seats: u32,
    /// Number of waitlisted registrations.
    pub waitlisted_entries: usize,
    /// Seats still open.
    pub available_seats: u32,
    /// Confirmed seats as a percentage of capacity. Zero for a zero-capacity game.
    pub utilization_percent: f64,
    /// Highest-ranked waitlisted participant eligible for promotion, if any.
    pub next_to_promote: Option<ParticipantName>,
}

/// A waitlisted entry with its rank ingredients resolved.
struct Candidate {
    index: usize,
    party: u32,
    pinned: bool,
    key: (Reverse<PriorityScore>, DateTime<Utc>),
}

/// All waitlisted entries ranked by priority. Stable sort, so entries that
/// tie on both score and submission time keep roster order.
fn ranked_waitlist(roster: &Roster, history: &dyn AttendanceSource) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = roster
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.status.is_waitlisted())
        .map(|(index, entry)| Candidate {
            index,
            party: entry.party_size(),
            pinned: entry.pinned,
            key: waitlist_rank(score(&history.record_for(&entry.name)), entry.submitted_at),
        })
        .collect();
    candidates.sort_by(|a, b| a.key.cmp(&b.key));
    candidates
}

/// Promotes waitlisted parties into open seats, highest priority first.
///
/// The ranked waitlist is scanned once. Each party that fits in the seats
/// still open is confirmed; one that does not fit is skipped and the scan
/// continues. The pass ends when the scan runs out of candidates or seats.
/// Running it with no open seats or no waitlist changes nothing.
pub fn promote(
    roster: &mut Roster,
    capacity: Capacity,
    history: &dyn AttendanceSource,
) -> PromotionOutcome {
    let mut seats = capacity.seats().saturating_sub(roster.confirmed_seats());
    let candidates = ranked_waitlist(roster, history);

    let mut outcome = PromotionOutcome {
        promoted: Vec::new(),
        seats_remaining: seats,
    };

    let entries = roster.entries_mut();
    for candidate in candidates {
        if seats == 0 {
            break;
        }
        if candidate.pinned || candidate.party > seats {
            continue;
        }
        let entry = &mut entries[candidate.index];
        entry.status = RegistrationStatus::Confirmed;
        seats = seats.saturating_sub(candidate.party);
        outcome.promoted.push(entry.name.clone());
    }
    outcome.seats_remaining = seats;

    if !outcome.is_unchanged() {
        tracing::info!(
            promoted = outcome.promoted.len(),
            seats_remaining = outcome.seats_remaining,
            "promoted waitlisted parties"
        );
    }
    outcome
}

/// 1-indexed position of `name` on the ranked waitlist, or `None` if the
/// participant is not waitlisted. Pinned entries keep their place in the
/// ranking even though promotion passes over them.
#[must_use]
pub fn waitlist_position(
    roster: &Roster,
    history: &dyn AttendanceSource,
    name: &ParticipantName,
) -> Option<usize> {
    ranked_waitlist(roster, history)
        .iter()
        .position(|candidate| {
            roster
                .entries()
                .get(candidate.index)
                .is_some_and(|entry| &entry.name == name)
        })
        .map(|position| position + 1)
}

/// Builds a display snapshot of the game's seat usage and waitlist.
#[must_use]
pub fn waitlist_overview(
    roster: &Roster,
    capacity: Capacity,
    history: &dyn AttendanceSource,
) -> WaitlistOverview {
    let confirmed_seats = roster.confirmed_seats();
    let candidates = ranked_waitlist(roster, history);
    let next_to_promote = candidates
        .iter()
        .find(|candidate| !candidate.pinned)
        .and_then(|candidate| roster.entries().get(candidate.index))
        .map(|entry| entry.name.clone());

    let utilization_percent = if capacity.is_zero() {
        0.0
    } else {
        f64::from(confirmed_seats) / f64::from(capacity.seats()) * 100.0
    };

    WaitlistOverview {
        capacity,
        confirmed_seats,
        waitlisted_entries: candidates.len(),
        available_seats: capacity.seats().saturating_sub(confirmed_seats),
        utilization_percent,
        next_to_promote,
    }
}

// The promotion test suite lives in `core/tests/promotion_test.rs`: it
// consumes `courtside-testing` fixtures, which are typed against the
// library build of this crate and so cannot link from the lib-test
// target (the cyclic dev-dependency would duplicate `courtside_core`).
