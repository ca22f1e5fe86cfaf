//! # Courtside Core
//!
//! Deterministic roster management for capacity-bounded pickup games:
//! who gets a seat, who waits, who gets promoted when a seat frees up,
//! and how the confirmed crowd splits into balanced teams.
//!
//! ## Core Concepts
//!
//! - **State**: a [`types::GameState`], capacity plus an ordered [`types::Roster`]
//! - **Action**: commands (RSVP, cancel, override) and events (facts) in one enum
//! - **Reducer**: pure function `(State, Action, Environment) → Effects`
//! - **Effect**: side-effect descriptions (publishing to the event feed), never execution
//! - **Environment**: injected nondeterminism (clock, attendance history, shuffle seed)
//!
//! ## Engine components
//!
//! ```text
//! ┌────────────┐   submit    ┌───────────────┐
//! │   Roster   │────────────▶│   allocation  │  greedy FIFO against capacity
//! │ (ordered)  │             └───────────────┘
//! │            │   cancel    ┌───────────────┐   ┌──────────┐
//! │            │────────────▶│   promotion   │──▶│ priority │  history-ranked scan
//! │            │             └───────────────┘   └──────────┘
//! │            │   teams     ┌───────────────┐
//! │            │────────────▶│     teams     │  shuffle + round-robin deal
//! └────────────┘             └───────────────┘
//! ```
//!
//! Every component is synchronous and free of I/O. Callers serialize
//! operations per game (the runtime crate's `Store` does this with one
//! write lock per game); different games run fully in parallel.
//!
//! ## Example
//!
//! ```ignore
//! use courtside_core::reducer::Reducer;
//! use courtside_core::roster::{RosterAction, RosterEnvironment, RosterReducer};
//! use courtside_core::types::{Capacity, GameState};
//!
//! let mut state = GameState::new(Capacity::new(10));
//! let reducer = RosterReducer::new();
//! let env = RosterEnvironment::new();
//!
//! let effects = reducer.reduce(
//!     &mut state,
//!     RosterAction::SubmitRsvp {
//!         name: "Alice".to_string(),
//!         guests: vec!["Jordan".to_string()],
//!         attending: true,
//!     },
//!     &env,
//! );
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

pub mod allocation;
pub mod feed;
pub mod priority;
pub mod promotion;
pub mod roster;
pub mod teams;
pub mod types;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → Effects`
///
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for RosterReducer {
    ///     type State = GameState;
    ///     type Action = RosterAction;
    ///     type Environment = RosterEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut GameState,
    ///         action: RosterAction,
    ///         env: &RosterEnvironment,
    ///     ) -> SmallVec<[Effect<RosterAction>; 4]> {
    ///         match action {
    ///             RosterAction::SubmitRsvp { .. } => {
    ///                 // Business logic here
    ///                 smallvec![Effect::None]
    ///             }
    ///             _ => SmallVec::new(),
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// # Arguments
        ///
        /// - `state`: Mutable reference to current state
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        ///
        /// # Returns
        ///
        /// Effect descriptions to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and can be merged and nested.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should
    /// happen, returned from reducers and executed by the Store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects concurrently, completion order unspecified
        Parallel(Vec<Effect<Action>>),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                }
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run concurrently
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All nondeterministic inputs (time, attendance history) are abstracted
/// behind traits and injected via the Environment parameter, so reducers
/// and the engine components stay deterministic and testable.
pub mod environment {
    use crate::types::{AttendanceRecord, ParticipantName};
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Production uses [`SystemClock`]; tests use the fixed clock from the
    /// testing crate.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// System clock - returns the actual current time
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Read-only lookup of a participant's attendance history
    ///
    /// Waitlist priority is the only consumer. Implementations must not
    /// block: the engine runs inside a per-game critical section, so the
    /// source is expected to be an in-memory snapshot loaded by the caller.
    pub trait AttendanceSource: Send + Sync {
        /// Returns the attendance record for `name`.
        ///
        /// Participants with no recorded games return an all-zero record.
        fn record_for(&self, name: &ParticipantName) -> AttendanceRecord;
    }

    /// Attendance source with no history - everyone scores zero
    ///
    /// Useful for one-off games where past attendance should not matter.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct NoAttendanceHistory;

    impl AttendanceSource for NoAttendanceHistory {
        fn record_for(&self, _name: &ParticipantName) -> AttendanceRecord {
            AttendanceRecord::default()
        }
    }
}

// Re-export the central domain surface
pub use allocation::{AllocationOutcome, allocate};
pub use feed::{EventFeed, FeedSource};
pub use priority::score;
pub use promotion::{
    PromotionOutcome, WaitlistOverview, promote, waitlist_overview, waitlist_position,
};
pub use roster::{RosterAction, RosterEnvironment, RosterReducer};
pub use teams::{TeamsError, partition};
pub use types::{
    AttendanceRecord, Capacity, DEFAULT_CAPACITY, GameId, GameState, ParticipantName,
    PriorityScore, RegistrationEntry, RegistrationStatus, Roster, Team,
};
