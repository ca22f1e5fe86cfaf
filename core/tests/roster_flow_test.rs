//! End-to-end roster flows through the reducer
//!
//! Each test walks a whole evening of commands against one game, the way
//! the runtime drives the reducer, checking the roster after every step.
//! Effects are discarded; these flows assert state only.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use courtside_core::reducer::Reducer;
use courtside_core::{
    AttendanceRecord, Capacity, GameState, ParticipantName, RegistrationEntry, RegistrationStatus,
    RosterAction, RosterEnvironment, RosterReducer, waitlist_overview, waitlist_position,
};
use courtside_testing::{FixedHistory, test_clock};
use std::sync::Arc;

// ============================================================================
// Test Fixtures
// ============================================================================

/// One game plus the pieces needed to drive its reducer by hand.
struct Game {
    state: GameState,
    env: RosterEnvironment,
    reducer: RosterReducer,
}

impl Game {
    fn new(seats: u32, env: RosterEnvironment) -> Self {
        Self {
            state: GameState::new(Capacity::new(seats)),
            env,
            reducer: RosterReducer::new(),
        }
    }

    fn run(&mut self, action: RosterAction) {
        self.reducer.reduce(&mut self.state, action, &self.env);
    }

    fn entry(&self, who: &str) -> &RegistrationEntry {
        self.state.roster.get(&ParticipantName::from(who)).unwrap()
    }

    fn status(&self, who: &str) -> RegistrationStatus {
        self.entry(who).status
    }
}

fn test_env() -> RosterEnvironment {
    RosterEnvironment::new().with_clock(Arc::new(test_clock()))
}

fn submit(name: &str, guests: &[&str]) -> RosterAction {
    RosterAction::SubmitRsvp {
        name: name.to_owned(),
        guests: guests.iter().map(|g| (*g).to_owned()).collect(),
        attending: true,
    }
}

fn withdraw(name: &str) -> RosterAction {
    RosterAction::SubmitRsvp {
        name: name.to_owned(),
        guests: vec![],
        attending: false,
    }
}

fn name(s: &str) -> ParticipantName {
    ParticipantName::from(s)
}

// ============================================================================
// Tests
// ============================================================================

/// A quiet week: three parties, ten seats, everyone confirms. Blank
/// guest rows never take a seat.
#[test]
fn everyone_fits_on_a_quiet_week() {
    let mut game = Game::new(10, test_env());

    game.run(submit("Alice", &[]));
    game.run(submit("Bob", &["Maya", "   ", "Raj"]));
    game.run(submit("Cara", &[]));

    assert!(game.status("Alice").is_confirmed());
    assert!(game.status("Bob").is_confirmed());
    assert!(game.status("Cara").is_confirmed());
    assert_eq!(game.entry("Bob").party_size(), 3);
    assert_eq!(game.state.roster.confirmed_seats(), 5);

    let overview = waitlist_overview(
        &game.state.roster,
        game.state.capacity,
        game.env.history.as_ref(),
    );
    assert_eq!(overview.available_seats, 5);
    assert_eq!(overview.waitlisted_entries, 0);
    assert_eq!(overview.next_to_promote, None);
    assert!((overview.utilization_percent - 50.0).abs() < f64::EPSILON);
}

/// A cancellation frees one seat and the waitlist is worked in priority
/// order, not submission order: the big party up front is passed over
/// for the regular who fits.
#[test]
fn cancellation_promotes_by_priority_not_position() {
    let history = FixedHistory::new()
        .with("frank", AttendanceRecord::new(1, 0, 0, 0))
        .with("gina", AttendanceRecord::new(0, 0, 0, 1));
    let mut game = Game::new(3, test_env().with_history(Arc::new(history)));

    game.run(submit("dan", &[]));
    game.run(submit("hal", &["pal"]));
    game.run(submit("eve", &["g1", "g2", "g3"]));
    game.run(submit("frank", &["buddy"]));
    game.run(submit("gina", &[]));

    assert!(game.status("dan").is_confirmed());
    assert!(game.status("hal").is_confirmed());
    assert!(game.status("eve").is_waitlisted());
    assert!(game.status("frank").is_waitlisted());
    assert!(game.status("gina").is_waitlisted());

    let roster = &game.state.roster;
    let history = game.env.history.as_ref();
    assert_eq!(waitlist_position(roster, history, &name("frank")), Some(1));
    assert_eq!(waitlist_position(roster, history, &name("gina")), Some(2));
    assert_eq!(waitlist_position(roster, history, &name("eve")), Some(3));

    game.run(withdraw("dan"));

    assert!(game.status("dan").is_cancelled());
    assert!(game.status("frank").is_waitlisted());
    assert!(game.status("gina").is_confirmed());
    assert!(game.status("eve").is_waitlisted());
    assert_eq!(game.state.roster.confirmed_seats(), 3);

    let overview = waitlist_overview(
        &game.state.roster,
        game.state.capacity,
        game.env.history.as_ref(),
    );
    assert_eq!(overview.next_to_promote, Some(name("frank")));
    assert_eq!(overview.available_seats, 0);
}

/// An operator pin survives resubmission (guests update, nothing else)
/// and holds its seat even past capacity, until the pin is cleared and
/// the entry rejoins automatic allocation.
#[test]
fn pins_survive_resubmission_until_cleared() {
    let mut game = Game::new(2, test_env());

    game.run(submit("ana", &[]));
    game.run(submit("bo", &[]));
    game.run(submit("ted", &[]));
    assert!(game.status("ted").is_waitlisted());

    game.run(RosterAction::OverrideStatus {
        name: "ted".to_owned(),
        status: RegistrationStatus::Confirmed,
    });
    assert!(game.entry("ted").pinned);
    assert!(game.status("ted").is_confirmed());
    assert_eq!(game.state.roster.confirmed_seats(), 3);

    game.run(submit("ted", &["guest"]));
    let ted = game.entry("ted");
    assert!(ted.pinned);
    assert!(ted.status.is_confirmed());
    assert_eq!(ted.party_size(), 2);

    game.run(RosterAction::ClearOverride {
        name: "ted".to_owned(),
    });
    let ted = game.entry("ted");
    assert!(!ted.pinned);
    assert!(ted.status.is_waitlisted());
    assert_eq!(game.state.roster.confirmed_seats(), 2);
}

/// A rejected command records its reason and leaves the roster alone;
/// the next applied command clears the reason.
#[test]
fn a_rejected_command_never_touches_the_roster() {
    let mut game = Game::new(5, test_env());
    game.run(submit("ana", &[]));

    game.run(RosterAction::OverrideStatus {
        name: "ghost".to_owned(),
        status: RegistrationStatus::Confirmed,
    });
    assert_eq!(
        game.state.last_error.as_deref(),
        Some("no registration for ghost")
    );
    assert_eq!(game.state.roster.len(), 1);

    game.run(submit("bo", &[]));
    assert_eq!(game.state.last_error, None);
}
