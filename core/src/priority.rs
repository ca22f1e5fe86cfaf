//! Waitlist priority scoring.
//!
//! Scores reward showing up (attendance count, streak, rate bonus) and
//! penalize cancellations and no-shows. Scores are clamped at zero: a bad
//! record costs your rank, never more. Ordering is descending score with
//! earlier submission breaking ties, so two strangers with no history are
//! ranked purely first-come-first-served.

use crate::types::{AttendanceRecord, PriorityScore};
use chrono::{DateTime, Utc};
use std::cmp::Reverse;

/// Points per attended game
const ATTENDANCE_WEIGHT: i64 = 10;
/// Points per game of the current streak
const STREAK_WEIGHT: i64 = 5;
/// Points lost per cancellation
const CANCEL_PENALTY: i64 = 5;
/// Points lost per no-show
const NO_SHOW_PENALTY: i64 = 15;
/// Bonus for an attendance rate of at least 90%
const HIGH_RATE_BONUS: i64 = 50;
/// Bonus for an attendance rate of at least 75%
const GOOD_RATE_BONUS: i64 = 25;

/// Computes a participant's waitlist priority from their history.
///
/// ```text
/// score = attended * 10 + rate_bonus + streak * 5
///         - cancelled * 5 - no_shows * 15       (clamped at 0)
/// ```
///
/// where `rate_bonus` is 50 at a 90% attendance rate, 25 at 75%, else 0.
/// A participant with no history scores 0.
#[must_use]
pub fn score(record: &AttendanceRecord) -> PriorityScore {
    let rate = record.attendance_rate();
    let rate_bonus = if rate >= 90.0 {
        HIGH_RATE_BONUS
    } else if rate >= 75.0 {
        GOOD_RATE_BONUS
    } else {
        0
    };

    let raw = i64::from(record.games_attended) * ATTENDANCE_WEIGHT
        + rate_bonus
        + i64::from(record.current_streak) * STREAK_WEIGHT
        - i64::from(record.games_cancelled) * CANCEL_PENALTY
        - i64::from(record.games_no_show) * NO_SHOW_PENALTY;

    PriorityScore::new(u32::try_from(raw.max(0)).unwrap_or(u32::MAX))
}

/// Sort key for the ranked waitlist: descending score, then ascending
/// submission time. Used with a stable sort so full ties keep roster
/// insertion order.
#[must_use]
pub fn waitlist_rank(
    score: PriorityScore,
    submitted_at: DateTime<Utc>,
) -> (Reverse<PriorityScore>, DateTime<Utc>) {
    (Reverse(score), submitted_at)
}
