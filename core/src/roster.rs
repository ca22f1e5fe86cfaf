//! Roster aggregate for a single game.
//!
//! Wires the engine components (allocation, promotion, teams) into one
//! reducer so every mutation of a game goes through a single entry point:
//! 1. Participants submit or withdraw RSVPs
//! 2. Each command settles the roster (allocate, then promote) before
//!    reporting, so no entry is ever left undecided
//! 3. Applied events are published to the game's event feed; observers
//!    (waitlist displays, notifiers) subscribe there
//! 4. Organizer overrides pin entries until explicitly cleared
//!
//! Replaying a command's events onto the command's pre-state reproduces
//! its post-state, which is what lets callers persist the feed and rebuild
//! a roster later.

use crate::allocation::{self, AllocationOutcome};
use crate::effect::Effect;
use crate::environment::{AttendanceSource, Clock, NoAttendanceHistory, SystemClock};
use crate::feed::{EventFeed, FeedSource};
use crate::promotion;
use crate::reducer::Reducer;
use crate::teams;
use crate::types::{
    GameState, ParticipantName, RegistrationStatus, Team, UpsertOutcome,
};
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for the roster aggregate
///
/// Commands are requests and may be rejected; events are facts that have
/// already been applied to state and are published to the game feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RosterAction {
    // Commands
    /// Record or refresh an RSVP; `attending: false` withdraws it
    SubmitRsvp {
        /// Participant name (identity key, case-insensitive)
        name: String,
        /// Guest names; blank entries are ignored
        guests: Vec<String>,
        /// Whether the participant plans to attend
        attending: bool,
    },

    /// Pin a registration to an organizer-chosen status
    OverrideStatus {
        /// Participant to pin
        name: String,
        /// Status to pin them to
        status: RegistrationStatus,
    },

    /// Clear an organizer pin and let allocation re-decide the entry
    ClearOverride {
        /// Participant to release
        name: String,
    },

    /// Delete registrations outright
    RemoveEntries {
        /// Participants to delete
        names: Vec<String>,
    },

    /// Re-run allocation and promotion over the whole roster
    Reallocate,

    /// Deal the confirmed roster into balanced teams
    GenerateTeams {
        /// Requested number of teams; `None` picks a sensible default
        team_count: Option<usize>,
    },

    // Events
    /// An RSVP was recorded and allocated
    RsvpRecorded {
        /// Participant name
        name: ParticipantName,
        /// Guest names as submitted
        guests: Vec<String>,
        /// Status the entry settled to
        status: RegistrationStatus,
        /// When the RSVP was submitted
        submitted_at: DateTime<Utc>,
    },

    /// A participant withdrew
    RegistrationCancelled {
        /// Participant name
        name: ParticipantName,
        /// Guest names as submitted with the withdrawal
        guests: Vec<String>,
        /// When the withdrawal was submitted
        submitted_at: DateTime<Utc>,
    },

    /// An organizer pinned an entry to a status
    StatusOverridden {
        /// Participant name
        name: ParticipantName,
        /// Pinned status
        status: RegistrationStatus,
    },

    /// An organizer pin was cleared
    OverrideCleared {
        /// Participant name
        name: ParticipantName,
        /// Status the freed entry settled to on reallocation
        status: RegistrationStatus,
    },

    /// Registrations were deleted
    EntriesRemoved {
        /// Participants actually deleted
        names: Vec<ParticipantName>,
    },

    /// An allocation pass re-decided entries
    RosterReallocated {
        /// Names the pass confirmed
        confirmed: Vec<ParticipantName>,
        /// Names the pass waitlisted
        waitlisted: Vec<ParticipantName>,
    },

    /// Waitlisted parties were promoted into freed seats
    WaitlistPromoted {
        /// Promoted names, highest priority first
        names: Vec<ParticipantName>,
    },

    /// Teams were dealt from the confirmed roster
    TeamsGenerated {
        /// The dealt teams; ephemeral, never stored in state
        teams: Vec<Team>,
    },

    /// A command was rejected
    ValidationFailed {
        /// Why the command was rejected
        reason: String,
    },
}

impl RosterAction {
    /// Checks whether this action is a command (a request)
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(
            self,
            Self::SubmitRsvp { .. }
                | Self::OverrideStatus { .. }
                | Self::ClearOverride { .. }
                | Self::RemoveEntries { .. }
                | Self::Reallocate
                | Self::GenerateTeams { .. }
        )
    }

    /// Checks whether this action is an event (an applied fact)
    #[must_use]
    pub const fn is_event(&self) -> bool {
        !self.is_command()
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Environment dependencies for the roster aggregate
#[derive(Clone)]
pub struct RosterEnvironment {
    /// Clock for submission timestamps
    pub clock: Arc<dyn Clock>,
    /// Attendance history backing waitlist priority
    pub history: Arc<dyn AttendanceSource>,
    /// Feed applied events are published to
    pub feed: EventFeed<RosterAction>,
    /// Fixed shuffle seed for team deals; `None` draws from entropy
    pub shuffle_seed: Option<u64>,
}

impl RosterEnvironment {
    /// Creates a production environment: system clock, no attendance
    /// history, a default-capacity feed, entropy-seeded shuffles
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            history: Arc::new(NoAttendanceHistory),
            feed: EventFeed::default(),
            shuffle_seed: None,
        }
    }

    /// Replaces the clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the attendance source
    #[must_use]
    pub fn with_history(mut self, history: Arc<dyn AttendanceSource>) -> Self {
        self.history = history;
        self
    }

    /// Replaces the event feed
    #[must_use]
    pub fn with_feed(mut self, feed: EventFeed<RosterAction>) -> Self {
        self.feed = feed;
        self
    }

    /// Fixes the team shuffle seed (deterministic deals)
    #[must_use]
    pub const fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }
}

impl Default for RosterEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedSource<RosterAction> for RosterEnvironment {
    fn event_feed(&self) -> &EventFeed<RosterAction> {
        &self.feed
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the roster aggregate
///
/// Commands validate, change state through the engine components, and
/// return effects that publish the resulting events. Event actions
/// arriving from outside (feed replay) are applied directly with no
/// effects.
#[derive(Clone, Copy, Debug)]
pub struct RosterReducer;

impl RosterReducer {
    /// Creates a new `RosterReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Runs allocation then promotion so no entry is left undecided
    fn settle(
        state: &mut GameState,
        env: &RosterEnvironment,
    ) -> (AllocationOutcome, promotion::PromotionOutcome) {
        let allocated = allocation::allocate(&mut state.roster, state.capacity);
        let promoted = promotion::promote(&mut state.roster, state.capacity, env.history.as_ref());
        (allocated, promoted)
    }

    /// Builds a `RosterReallocated` event for pass outcomes beyond the
    /// entry the triggering command already reports, if there were any
    fn reallocation_event(
        outcome: &AllocationOutcome,
        already_reported: Option<&ParticipantName>,
    ) -> Option<RosterAction> {
        let keep = |name: &&ParticipantName| already_reported.is_none_or(|skip| skip != *name);
        let confirmed: Vec<ParticipantName> =
            outcome.confirmed.iter().filter(keep).cloned().collect();
        let waitlisted: Vec<ParticipantName> =
            outcome.waitlisted.iter().filter(keep).cloned().collect();
        if confirmed.is_empty() && waitlisted.is_empty() {
            None
        } else {
            Some(RosterAction::RosterReallocated {
                confirmed,
                waitlisted,
            })
        }
    }

    /// Returns an effect that publishes `event` to the game feed
    fn publish(env: &RosterEnvironment, event: RosterAction) -> Effect<RosterAction> {
        let feed = env.feed.clone();
        Effect::Future(Box::pin(async move {
            feed.publish(event);
            None
        }))
    }

    /// Marks the command successful and publishes its events
    ///
    /// One command's events go out through a single effect that publishes
    /// them synchronously, in emission order. Batches of commands racing
    /// on a multi-thread runtime may interleave on the feed; callers that
    /// serialize commands (awaiting each terminal event before sending the
    /// next, as `send_and_wait_for` callers do) observe whole batches in
    /// command order.
    fn emit(
        state: &mut GameState,
        env: &RosterEnvironment,
        events: Vec<RosterAction>,
    ) -> SmallVec<[Effect<RosterAction>; 4]> {
        state.last_error = None;
        if events.is_empty() {
            return SmallVec::new();
        }
        let feed = env.feed.clone();
        smallvec![Effect::Future(Box::pin(async move {
            for event in events {
                feed.publish(event);
            }
            None
        }))]
    }

    /// Rejects the command: records the reason and publishes the failure
    fn fail(
        state: &mut GameState,
        env: &RosterEnvironment,
        reason: impl Into<String>,
    ) -> SmallVec<[Effect<RosterAction>; 4]> {
        let reason = reason.into();
        tracing::warn!(%reason, "roster command rejected");
        state.last_error = Some(reason.clone());
        smallvec![Self::publish(env, RosterAction::ValidationFailed { reason })]
    }

    /// Sets an entry's status without touching its pin
    fn set_status(state: &mut GameState, name: &ParticipantName, status: RegistrationStatus) {
        if let Some(entry) = state
            .roster
            .entries_mut()
            .iter_mut()
            .find(|entry| entry.name == *name)
        {
            entry.status = status;
        }
    }

    /// Applies an event to state
    fn apply_event(state: &mut GameState, action: &RosterAction) {
        match action {
            RosterAction::RsvpRecorded {
                name,
                guests,
                status,
                submitted_at,
            } => {
                let outcome = state
                    .roster
                    .upsert(name.clone(), guests.clone(), *submitted_at);
                if !matches!(outcome, UpsertOutcome::PinnedKept { .. }) {
                    Self::set_status(state, name, *status);
                }
                state.last_error = None;
            }

            RosterAction::RegistrationCancelled {
                name,
                guests,
                submitted_at,
            } => {
                state
                    .roster
                    .record_cancellation(name.clone(), guests.clone(), *submitted_at);
                state.last_error = None;
            }

            RosterAction::StatusOverridden { name, status } => {
                state.roster.override_status(name, *status);
                state.last_error = None;
            }

            RosterAction::OverrideCleared { name, status } => {
                state.roster.clear_override(name);
                Self::set_status(state, name, *status);
                state.last_error = None;
            }

            RosterAction::EntriesRemoved { names } => {
                for name in names {
                    state.roster.remove(name);
                }
                state.last_error = None;
            }

            RosterAction::RosterReallocated {
                confirmed,
                waitlisted,
            } => {
                for name in confirmed {
                    Self::set_status(state, name, RegistrationStatus::Confirmed);
                }
                for name in waitlisted {
                    Self::set_status(state, name, RegistrationStatus::Waitlisted);
                }
                state.last_error = None;
            }

            RosterAction::WaitlistPromoted { names } => {
                for name in names {
                    Self::set_status(state, name, RegistrationStatus::Confirmed);
                }
                state.last_error = None;
            }

            // Teams are ephemeral; the event carries them to observers only
            RosterAction::TeamsGenerated { .. } => {
                state.last_error = None;
            }

            RosterAction::ValidationFailed { reason } => {
                state.last_error = Some(reason.clone());
            }

            // Commands don't modify state
            RosterAction::SubmitRsvp { .. }
            | RosterAction::OverrideStatus { .. }
            | RosterAction::ClearOverride { .. }
            | RosterAction::RemoveEntries { .. }
            | RosterAction::Reallocate
            | RosterAction::GenerateTeams { .. } => {}
        }
    }
}

impl Default for RosterReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for RosterReducer {
    type State = GameState;
    type Action = RosterAction;
    type Environment = RosterEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per command keeps the flow readable
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            RosterAction::SubmitRsvp {
                name,
                guests,
                attending,
            } => {
                if name.trim().is_empty() {
                    return Self::fail(state, env, "participant name must not be blank");
                }
                let name = ParticipantName::new(name);
                let submitted_at = env.clock.now();

                let mut events = Vec::new();
                if attending {
                    state
                        .roster
                        .upsert(name.clone(), guests.clone(), submitted_at);
                    let (allocated, promoted) = Self::settle(state, env);
                    let status = state
                        .roster
                        .get(&name)
                        .map_or(RegistrationStatus::Unset, |entry| entry.status);

                    events.push(RosterAction::RsvpRecorded {
                        name: name.clone(),
                        guests,
                        status,
                        submitted_at,
                    });
                    if let Some(event) = Self::reallocation_event(&allocated, Some(&name)) {
                        events.push(event);
                    }
                    if !promoted.is_unchanged() {
                        events.push(RosterAction::WaitlistPromoted {
                            names: promoted.promoted,
                        });
                    }
                } else {
                    state
                        .roster
                        .record_cancellation(name.clone(), guests.clone(), submitted_at);
                    let (allocated, promoted) = Self::settle(state, env);

                    events.push(RosterAction::RegistrationCancelled {
                        name,
                        guests,
                        submitted_at,
                    });
                    if let Some(event) = Self::reallocation_event(&allocated, None) {
                        events.push(event);
                    }
                    if !promoted.is_unchanged() {
                        events.push(RosterAction::WaitlistPromoted {
                            names: promoted.promoted,
                        });
                    }
                }
                Self::emit(state, env, events)
            }

            RosterAction::OverrideStatus { name, status } => {
                if status.is_unset() {
                    return Self::fail(
                        state,
                        env,
                        "cannot pin a registration to unset; clear the override instead",
                    );
                }
                let name = ParticipantName::new(name);
                if state.roster.override_status(&name, status).is_none() {
                    return Self::fail(state, env, format!("no registration for {name}"));
                }

                let (allocated, promoted) = Self::settle(state, env);
                let mut events = vec![RosterAction::StatusOverridden { name, status }];
                if let Some(event) = Self::reallocation_event(&allocated, None) {
                    events.push(event);
                }
                if !promoted.is_unchanged() {
                    events.push(RosterAction::WaitlistPromoted {
                        names: promoted.promoted,
                    });
                }
                Self::emit(state, env, events)
            }

            RosterAction::ClearOverride { name } => {
                let name = ParticipantName::new(name);
                if state.roster.clear_override(&name).is_none() {
                    return Self::fail(state, env, format!("no registration for {name}"));
                }

                let (allocated, promoted) = Self::settle(state, env);
                let status = state
                    .roster
                    .get(&name)
                    .map_or(RegistrationStatus::Unset, |entry| entry.status);

                let mut events = vec![RosterAction::OverrideCleared {
                    name: name.clone(),
                    status,
                }];
                if let Some(event) = Self::reallocation_event(&allocated, Some(&name)) {
                    events.push(event);
                }
                if !promoted.is_unchanged() {
                    events.push(RosterAction::WaitlistPromoted {
                        names: promoted.promoted,
                    });
                }
                Self::emit(state, env, events)
            }

            RosterAction::RemoveEntries { names } => {
                let mut removed = Vec::new();
                for raw in names {
                    let name = ParticipantName::new(raw);
                    if state.roster.remove(&name).is_some() {
                        removed.push(name);
                    }
                }
                if removed.is_empty() {
                    return Self::fail(state, env, "no matching registrations to remove");
                }

                let (allocated, promoted) = Self::settle(state, env);
                let mut events = vec![RosterAction::EntriesRemoved { names: removed }];
                if let Some(event) = Self::reallocation_event(&allocated, None) {
                    events.push(event);
                }
                if !promoted.is_unchanged() {
                    events.push(RosterAction::WaitlistPromoted {
                        names: promoted.promoted,
                    });
                }
                Self::emit(state, env, events)
            }

            RosterAction::Reallocate => {
                let (allocated, promoted) = Self::settle(state, env);
                let mut events = Vec::new();
                if let Some(event) = Self::reallocation_event(&allocated, None) {
                    events.push(event);
                }
                if !promoted.is_unchanged() {
                    events.push(RosterAction::WaitlistPromoted {
                        names: promoted.promoted,
                    });
                }
                Self::emit(state, env, events)
            }

            RosterAction::GenerateTeams { team_count } => {
                let mut rng = match env.shuffle_seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_entropy(),
                };
                match teams::partition(&state.roster, team_count, &mut rng) {
                    Ok(teams) => {
                        Self::emit(state, env, vec![RosterAction::TeamsGenerated { teams }])
                    }
                    Err(error) => Self::fail(state, env, error.to_string()),
                }
            }

            event @ (RosterAction::RsvpRecorded { .. }
            | RosterAction::RegistrationCancelled { .. }
            | RosterAction::StatusOverridden { .. }
            | RosterAction::OverrideCleared { .. }
            | RosterAction::EntriesRemoved { .. }
            | RosterAction::RosterReallocated { .. }
            | RosterAction::WaitlistPromoted { .. }
            | RosterAction::TeamsGenerated { .. }
            | RosterAction::ValidationFailed { .. }) => {
                Self::apply_event(state, &event);
                SmallVec::new()
            }
        }
    }
}

// The reducer test suite lives in `core/tests/roster_reducer_test.rs`:
// it consumes `courtside-testing` fixtures, which are typed against the
// library build of this crate and so cannot link from the lib-test
// target (the cyclic dev-dependency would duplicate `courtside_core`).
