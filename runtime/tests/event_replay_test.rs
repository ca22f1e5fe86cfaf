//! Event replay equivalence for the roster store
//!
//! Every command publishes events carrying enough data to reproduce its
//! state change. These tests run a command script against a live store,
//! collect the feed, replay it onto a fresh state, and check the replayed
//! roster matches the live one exactly.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use courtside_core::reducer::Reducer;
use courtside_core::{
    Capacity, GameState, RegistrationStatus, RosterAction, RosterEnvironment, RosterReducer,
};
use courtside_runtime::{RosterStore, Store};
use courtside_testing::test_clock;
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(1);

// ============================================================================
// Test Fixtures
// ============================================================================

fn replayable_store(seats: u32) -> RosterStore {
    let environment = RosterEnvironment::new().with_clock(Arc::new(test_clock()));
    Store::new(
        GameState::new(Capacity::new(seats)),
        RosterReducer::new(),
        environment,
    )
}

fn submit(name: &str, guests: &[&str], attending: bool) -> RosterAction {
    RosterAction::SubmitRsvp {
        name: name.to_owned(),
        guests: guests.iter().map(|g| (*g).to_owned()).collect(),
        attending,
    }
}

/// Run one command and wait until its event batch is on the feed.
///
/// Events of a single command publish in one synchronous batch, so once
/// the terminal event arrives the whole batch is buffered, and the next
/// command's events land strictly after it.
async fn run<F>(store: &RosterStore, command: RosterAction, terminal: F)
where
    F: Fn(&RosterAction) -> bool,
{
    store
        .send_and_wait_for(command, terminal, WAIT)
        .await
        .unwrap();
}

/// A script touching every roster command: fills the game, pins an
/// override past capacity, cancels, clears, and removes.
async fn run_script(store: &RosterStore) {
    let recorded = |a: &RosterAction| matches!(a, RosterAction::RsvpRecorded { .. });

    run(store, submit("alice", &["gina", "hana"], true), recorded).await;
    run(store, submit("bob", &[], true), recorded).await;
    run(store, submit("carol", &["ines"], true), recorded).await;
    run(store, submit("dave", &[], true), recorded).await;
    run(
        store,
        RosterAction::OverrideStatus {
            name: "dave".to_owned(),
            status: RegistrationStatus::Confirmed,
        },
        |a| matches!(a, RosterAction::StatusOverridden { .. }),
    )
    .await;
    run(store, submit("alice", &[], false), |a| {
        matches!(a, RosterAction::RegistrationCancelled { .. })
    })
    .await;
    run(
        store,
        RosterAction::ClearOverride {
            name: "dave".to_owned(),
        },
        |a| matches!(a, RosterAction::OverrideCleared { .. }),
    )
    .await;
    run(
        store,
        RosterAction::RemoveEntries {
            names: vec!["bob".to_owned()],
        },
        |a| matches!(a, RosterAction::EntriesRemoved { .. }),
    )
    .await;
}

// ============================================================================
// Tests
// ============================================================================

/// Replaying the collected feed onto an empty state of the same capacity
/// reproduces the live roster, entry for entry.
#[tokio::test]
async fn test_replaying_the_feed_rebuilds_the_roster() {
    let store = replayable_store(4);
    let mut rx = store.subscribe_events();

    run_script(&store).await;

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        assert!(event.is_event(), "feed must only carry events: {event:?}");
        events.push(event);
    }
    assert!(
        events
            .iter()
            .any(|e| matches!(e, RosterAction::WaitlistPromoted { .. })),
        "script should have promoted someone"
    );

    let live = store.state(Clone::clone).await;

    let reducer = RosterReducer::new();
    let environment = RosterEnvironment::new();
    let mut replayed = GameState::new(Capacity::new(4));
    for event in events {
        reducer.reduce(&mut replayed, event, &environment);
    }

    assert_eq!(replayed, live);
}

/// Events are idempotent: a feed observer that applies a duplicate (a
/// reconnect replaying its last event) converges to the same roster.
#[tokio::test]
async fn test_duplicated_events_replay_to_the_same_roster() {
    let store = replayable_store(4);
    let mut rx = store.subscribe_events();

    run_script(&store).await;

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    let live = store.state(Clone::clone).await;

    let reducer = RosterReducer::new();
    let environment = RosterEnvironment::new();
    let mut replayed = GameState::new(Capacity::new(4));
    for event in events {
        reducer.reduce(&mut replayed, event.clone(), &environment);
        reducer.reduce(&mut replayed, event, &environment);
    }

    assert_eq!(replayed, live);
}

/// The live endpoint of the script, spelled out: the freed seats went to
/// the waitlist, the override cleared back to a seat that still fit, and
/// the removed entry is gone.
#[tokio::test]
async fn test_script_settles_where_the_rules_say() {
    let store = replayable_store(4);

    run_script(&store).await;

    let snapshot = store.state(Clone::clone).await;

    let alice = snapshot.roster.get(&"alice".into()).unwrap();
    assert!(alice.status.is_cancelled());

    let carol = snapshot.roster.get(&"carol".into()).unwrap();
    assert!(carol.status.is_confirmed());

    let dave = snapshot.roster.get(&"dave".into()).unwrap();
    assert!(dave.status.is_confirmed());
    assert!(!dave.pinned);

    assert!(!snapshot.roster.is_registered(&"bob".into()));
    assert_eq!(snapshot.roster.confirmed_seats(), 3);
    assert_eq!(snapshot.last_error, None);
}
