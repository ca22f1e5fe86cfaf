//! # Courtside Testing
//!
//! Testing utilities and fixtures for the Courtside engine.
//!
//! This crate provides:
//! - Mock implementations of Environment traits (clock, attendance history)
//! - The [`ReducerTest`] Given-When-Then builder and effect assertions
//! - proptest strategies for domain types
//! - A tracing bootstrap for debugging failing tests
//!
//! ## Example
//!
//! ```ignore
//! use courtside_testing::{ReducerTest, mocks::test_clock};
//!
//! ReducerTest::new(RosterReducer::new())
//!     .with_env(env)
//!     .given_state(GameState::new(Capacity::new(10)))
//!     .when_action(RosterAction::SubmitRsvp {
//!         name: "Alice".to_string(),
//!         guests: vec![],
//!         attending: true,
//!     })
//!     .then_state(|state| assert_eq!(state.roster.len(), 1))
//!     .run();
//! ```

pub mod reducer_test;

/// Mock implementations for testing.
pub mod mocks {
    use chrono::{DateTime, Utc};
    use courtside_core::environment::{AttendanceSource, Clock};
    use courtside_core::types::{AttendanceRecord, ParticipantName};
    use std::collections::HashMap;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use courtside_testing::mocks::FixedClock;
    /// use courtside_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
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

    /// Attendance source backed by a fixed in-memory table
    ///
    /// Participants without an explicit record score all zeros, matching
    /// the production behavior for newcomers.
    ///
    /// # Example
    ///
    /// ```
    /// use courtside_testing::mocks::FixedHistory;
    /// use courtside_core::environment::AttendanceSource;
    /// use courtside_core::types::AttendanceRecord;
    ///
    /// let history = FixedHistory::new()
    ///     .with("veteran", AttendanceRecord::new(10, 0, 0, 5));
    /// assert_eq!(history.record_for(&"veteran".into()).games_attended, 10);
    /// assert_eq!(history.record_for(&"newcomer".into()).games_attended, 0);
    /// ```
    #[derive(Debug, Clone, Default)]
    pub struct FixedHistory {
        records: HashMap<ParticipantName, AttendanceRecord>,
    }

    impl FixedHistory {
        /// Create an empty history (everyone scores zero)
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a record for `name` (builder style)
        #[must_use]
        pub fn with(mut self, name: impl Into<ParticipantName>, record: AttendanceRecord) -> Self {
            self.records.insert(name.into(), record);
            self
        }
    }

    impl AttendanceSource for FixedHistory {
        fn record_for(&self, name: &ParticipantName) -> AttendanceRecord {
            self.records.get(name).copied().unwrap_or_default()
        }
    }
}

/// Test helpers and utilities.
pub mod helpers {
    /// Installs a compact tracing subscriber writing to the test harness
    ///
    /// Safe to call from every test; only the first call installs anything.
    /// Control verbosity with `RUST_LOG` as usual.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use chrono::{DateTime, Duration, Utc};
    use courtside_core::types::{
        AttendanceRecord, Capacity, ParticipantName, RegistrationEntry, Roster,
    };
    use proptest::prelude::*;

    /// Base timestamp all generated submissions are offset from
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which should
    /// never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn base_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-01T10:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc)
    }

    /// Strategy for attendance records across realistic counter ranges
    #[must_use]
    pub fn arb_attendance_record() -> impl Strategy<Value = AttendanceRecord> {
        (0u32..50, 0u32..20, 0u32..10, 0u32..15).prop_map(
            |(attended, cancelled, no_show, streak)| {
                AttendanceRecord::new(attended, cancelled, no_show, streak)
            },
        )
    }

    /// Strategy for capacities, including the degenerate zero
    #[must_use]
    pub fn arb_capacity() -> impl Strategy<Value = Capacity> {
        (0u32..=30).prop_map(Capacity::new)
    }

    /// Strategy for undecided rosters: unique names, arbitrary party sizes
    /// and submission times (including ties), everything `Unset`
    #[must_use]
    pub fn arb_roster() -> impl Strategy<Value = Roster> {
        prop::collection::vec((0usize..4, 0i64..240), 0..12).prop_map(|parties| {
            let entries = parties
                .into_iter()
                .enumerate()
                .map(|(i, (guests, minute))| {
                    RegistrationEntry::new(
                        ParticipantName::new(format!("player-{i}")),
                        (0..guests).map(|g| format!("guest-{i}-{g}")).collect(),
                        base_time() + Duration::minutes(minute),
                    )
                })
                .collect();
            Roster::from_entries(entries)
        })
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, FixedHistory, test_clock};
pub use reducer_test::{ReducerTest, assertions};
