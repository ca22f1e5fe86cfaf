//! # Courtside Runtime
//!
//! Runtime for the Courtside roster engine.
//!
//! This crate provides the Store runtime that coordinates reducer execution
//! and effect handling, plus a [`GameDirectory`] that keeps one store per
//! open game so commands against a game serialize behind its reducer.
//!
//! ## Core Components
//!
//! - **Store**: The runtime that manages state and executes effects
//! - **Effect Executor**: Executes effect descriptions and feeds actions back to reducers
//! - **`GameDirectory`**: One store (and one event feed) per game
//!
//! ## Example
//!
//! ```ignore
//! use courtside_core::{GameId, RosterAction, RosterEnvironment};
//! use courtside_runtime::{GameDirectory, RuntimeConfig};
//!
//! let directory = GameDirectory::new(RuntimeConfig::from_env(), RosterEnvironment::new());
//! let store = directory.store_for(GameId::new()).await;
//!
//! store.send(RosterAction::SubmitRsvp {
//!     name: "Dana".to_owned(),
//!     guests: vec![],
//!     attending: true,
//! }).await?;
//!
//! let confirmed = store.state(|s| s.roster.confirmed_seats()).await;
//! ```

use courtside_core::{Capacity, DEFAULT_CAPACITY, effect::Effect, feed::FeedSource, reducer::Reducer};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for terminal event
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching event is received.
        #[error("Timeout waiting for event")]
        Timeout,

        /// Event feed channel closed
        ///
        /// The event feed was closed, typically because the store is
        /// shutting down.
        #[error("Event feed channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub use courtside_core::feed::DEFAULT_FEED_CAPACITY;

/// Configuration for the roster runtime
///
/// Every value has a local-development default; deployments override via
/// environment variables through [`RuntimeConfig::from_env`].
///
/// # Example
///
/// ```ignore
/// let config = RuntimeConfig::from_env()
///     .with_default_capacity(Capacity::new(12));
///
/// let directory = GameDirectory::new(config, RosterEnvironment::new());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Seat capacity for games opened without an explicit capacity
    pub default_capacity: Capacity,
    /// Event feed buffer size per game
    pub feed_capacity: usize,
}

impl RuntimeConfig {
    /// Create a configuration with custom values
    #[must_use]
    pub const fn new(default_capacity: Capacity, feed_capacity: usize) -> Self {
        Self {
            default_capacity,
            feed_capacity,
        }
    }

    /// Build a configuration from environment variables
    ///
    /// - `COURTSIDE_DEFAULT_CAPACITY`: seat capacity for new games
    /// - `COURTSIDE_FEED_CAPACITY`: event feed buffer size per game
    ///
    /// Unset or unparseable variables fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            default_capacity: env_parse("COURTSIDE_DEFAULT_CAPACITY")
                .map_or(DEFAULT_CAPACITY, Capacity::new),
            feed_capacity: env_parse("COURTSIDE_FEED_CAPACITY").unwrap_or(DEFAULT_FEED_CAPACITY),
        }
    }

    /// Set the default seat capacity
    #[must_use]
    pub const fn with_default_capacity(mut self, capacity: Capacity) -> Self {
        self.default_capacity = capacity;
        self
    }

    /// Set the event feed buffer size
    #[must_use]
    pub const fn with_feed_capacity(mut self, capacity: usize) -> Self {
        self.feed_capacity = capacity;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_capacity: DEFAULT_CAPACITY,
            feed_capacity: DEFAULT_FEED_CAPACITY,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|value| value.parse().ok())
}

/// Guard that decrements the pending-effect counter on drop
///
/// Ensures the counter is decremented even if the effect panics.
struct EffectGuard(Arc<AtomicUsize>);

impl Drop for EffectGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicUsize, Duration, Effect, EffectGuard, FeedSource, Ordering,
        Reducer, RwLock, StoreError,
    };
    use tokio::sync::broadcast;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = Store::new(
    ///     GameState::new(Capacity::new(15)),
    ///     RosterReducer::new(),
    ///     RosterEnvironment::new(),
    /// );
    ///
    /// store.send(RosterAction::SubmitRsvp {
    ///     name: "Dana".to_owned(),
    ///     guests: vec![],
    ///     attending: true,
    /// }).await?;
    /// ```
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// # Arguments
        ///
        /// - `initial_state`: The starting state for the store
        /// - `reducer`: The reducer implementation (business logic)
        /// - `environment`: Injected dependencies
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// The environment this store injects into its reducer
        pub const fn environment(&self) -> &E {
            &self.environment
        }

        /// Send an action to the store
        ///
        /// This is the primary way to interact with the store:
        /// 1. Acquires write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Executes returned effects asynchronously
        /// 4. Effects may produce more actions (feedback loop)
        ///
        /// # Concurrency and Effect Execution
        ///
        /// - The reducer executes synchronously while holding a write lock
        /// - Effects execute asynchronously in spawned tasks
        /// - `send()` returns after starting effect execution, not completion
        /// - Multiple concurrent `send()` calls serialize at the reducer level
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        ///
        /// # Panics
        ///
        /// If the reducer panics, the panic will propagate and halt the store.
        /// Reducers should be pure functions that do not panic.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<(), StoreError>
        where
            R: Clone,
            E: Clone,
            A: Clone,
        {
            // Check if store is shutting down
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            tracing::debug!("Processing action");

            // Metrics: Increment command counter
            metrics::counter!("store.commands.total").increment(1);

            let effects = {
                let mut state = self.state.write().await;
                tracing::trace!("Acquired write lock on state");

                let span = tracing::debug_span!("reducer_execution");
                let _enter = span.enter();

                // Metrics: Time reducer execution
                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                let duration = start.elapsed();
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(duration.as_secs_f64());

                tracing::trace!("Reducer completed, returned {} effects", effects.len());

                // Note: Precision loss acceptable for metrics (effect counts < 2^52)
                #[allow(clippy::cast_precision_loss)]
                metrics::histogram!("store.effects.count").record(effects.len() as f64);

                effects
            };

            for effect in effects {
                self.execute_effect(effect);
            }

            Ok(())
        }

        /// Send an action and wait for a matching event
        ///
        /// This method is designed for request-response patterns (HTTP, RPC).
        /// It subscribes to the environment's event feed, sends the initial
        /// action, then waits for an event matching the predicate.
        ///
        /// # How It Works
        ///
        /// 1. Subscribe to the event feed BEFORE sending (avoids race conditions)
        /// 2. Send the initial action through the store
        /// 3. Wait for events published by effects
        /// 4. Return the first event matching the predicate
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: Timeout expired before matching event received
        /// - [`StoreError::ChannelClosed`]: Event feed closed (store shutting down)
        /// - [`StoreError::ShutdownInProgress`]: Store is shutting down
        ///
        /// # Example
        ///
        /// ```ignore
        /// let result = store.send_and_wait_for(
        ///     RosterAction::GenerateTeams { team_count: None },
        ///     |a| matches!(a,
        ///         RosterAction::TeamsGenerated { .. } |
        ///         RosterAction::ValidationFailed { .. }
        ///     ),
        ///     Duration::from_secs(5),
        /// ).await?;
        /// ```
        ///
        /// # Notes
        ///
        /// - If the feed lags and drops events, continues waiting (timeout catches it)
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            R: Clone,
            E: Clone + FeedSource<A>,
            F: Fn(&A) -> bool,
        {
            // Subscribe BEFORE sending to avoid race condition
            let mut rx = self.environment.event_feed().subscribe();

            // Send the initial action
            self.send(action).await?;

            // Wait for matching event with timeout
            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(event) if predicate(&event) => return Ok(event),
                        Ok(_) => {} // Not the event we want, keep waiting
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            // Slow consumer, some events were dropped
                            tracing::warn!(skipped, "Event observer lagged, {} events skipped", skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        }
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to all events published through this store's environment
        ///
        /// This method is designed for event streaming (`WebSockets`, SSE, feed
        /// replication). Returns a receiver that gets a clone of every event
        /// the reducer's effects publish.
        ///
        /// # Notes
        ///
        /// - Only events published by effects arrive here (not the commands sent via `send`)
        /// - If the receiver lags, it will skip old events and receive [`broadcast::error::RecvError::Lagged`]
        #[must_use]
        pub fn subscribe_events(&self) -> broadcast::Receiver<A>
        where
            E: FeedSource<A>,
        {
            self.environment.event_feed().subscribe()
        }

        /// Read current state via a closure
        ///
        /// Access state through a closure to ensure the lock is released promptly:
        ///
        /// ```ignore
        /// let seats = store.state(|s| s.roster.confirmed_seats()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&state)
        }

        /// Initiate graceful shutdown of the store
        ///
        /// This method:
        /// 1. Sets the shutdown flag (rejecting new actions)
        /// 2. Waits for pending effects to complete (with timeout)
        /// 3. Returns when all effects finish or timeout expires
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before
        /// all pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            // Set shutdown flag to reject new actions
            self.shutdown.store(true, Ordering::Release);

            // Wait for pending effects with timeout
            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    metrics::counter!("store.shutdown.completed").increment(1);
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(
                        pending_effects = pending,
                        "Shutdown timeout: {} effects still running",
                        pending
                    );
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tracing::debug!(
                    pending_effects = pending,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Waiting for effects to complete"
                );

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Execute an effect
        ///
        /// # Effect Types
        ///
        /// - `None`: No-op
        /// - `Future`: Executes async computation, sends resulting action if `Some`
        /// - `Parallel`: Executes effects concurrently
        ///
        /// # Error Handling Strategy
        ///
        /// **Reducer panics**: Propagate (fail fast). Reducers should be pure
        /// functions that do not panic.
        ///
        /// **Effect execution failures**: Log and continue. Effects are
        /// fire-and-forget operations. The [`EffectGuard`] keeps the pending
        /// counter accurate even if an effect task panics.
        #[tracing::instrument(skip(self, effect), name = "execute_effect")]
        fn execute_effect(&self, effect: Effect<A>)
        where
            R: Clone,
            E: Clone,
        {
            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                }
                Effect::Future(fut) => {
                    tracing::trace!("Executing Effect::Future");
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);

                    // Track pending effects for shutdown
                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = EffectGuard(Arc::clone(&self.pending_effects));

                    let store = self.clone();

                    tokio::spawn(async move {
                        let _pending_guard = pending_guard; // Decrement on drop

                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, sending to store");

                            // Send action back to store (auto-feedback)
                            let _ = store.send(action).await;
                        } else {
                            tracing::trace!("Effect::Future completed with no action");
                        }
                    });
                }
                Effect::Parallel(effects) => {
                    tracing::trace!("Executing Effect::Parallel with {} effects", effects.len());
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);

                    // Execute all effects concurrently
                    for effect in effects {
                        self.execute_effect(effect);
                    }
                }
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
            }
        }
    }
}

pub use store::Store;

/// Per-game store directory.
///
/// Every mutation of a game's roster goes through that game's single
/// store, so concurrent RSVPs serialize behind the reducer's write lock
/// and never interleave mid-decision.
pub mod directory {
    use super::{Arc, Duration, RuntimeConfig, RwLock, Store, StoreError};
    use courtside_core::{
        Capacity, EventFeed, GameId, GameState, RosterAction, RosterEnvironment, RosterReducer,
    };
    use std::collections::HashMap;

    /// Store type for a single game roster
    pub type RosterStore = Store<GameState, RosterAction, RosterEnvironment, RosterReducer>;

    /// Directory of per-game roster stores
    ///
    /// Each game gets its own store and its own event feed: commands
    /// against one game serialize behind that game's reducer and never
    /// contend with other games. The directory hands out `Arc`s, so a
    /// store stays alive for in-flight callers even after `close_game`.
    pub struct GameDirectory {
        config: RuntimeConfig,
        /// Template environment; each game gets a clone with a fresh feed
        environment: RosterEnvironment,
        stores: RwLock<HashMap<GameId, Arc<RosterStore>>>,
    }

    impl GameDirectory {
        /// Create a directory with the given configuration and template
        /// environment (clock, attendance source, shuffle seeding)
        #[must_use]
        pub fn new(config: RuntimeConfig, environment: RosterEnvironment) -> Self {
            Self {
                config,
                environment,
                stores: RwLock::new(HashMap::new()),
            }
        }

        /// Get the store for a game, opening it at the default capacity if absent
        pub async fn store_for(&self, game_id: GameId) -> Arc<RosterStore> {
            self.open_game(game_id, self.config.default_capacity).await
        }

        /// Open a game at the given capacity
        ///
        /// Idempotent: an already-open game keeps its store, its roster,
        /// and its original capacity.
        pub async fn open_game(&self, game_id: GameId, capacity: Capacity) -> Arc<RosterStore> {
            if let Some(store) = self.stores.read().await.get(&game_id) {
                return Arc::clone(store);
            }

            let mut stores = self.stores.write().await;

            // Another caller may have opened it between the locks
            if let Some(store) = stores.get(&game_id) {
                return Arc::clone(store);
            }

            let environment = self
                .environment
                .clone()
                .with_feed(EventFeed::new(self.config.feed_capacity));
            let store = Arc::new(Store::new(
                GameState::new(capacity),
                RosterReducer::new(),
                environment,
            ));
            stores.insert(game_id, Arc::clone(&store));

            tracing::info!(%game_id, seats = capacity.seats(), "Opened game roster");
            metrics::counter!("directory.games.opened").increment(1);

            store
        }

        /// Close a game: remove its store and drain pending effects
        ///
        /// Closing a game that was never opened is a no-op.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the game's pending
        /// effects do not finish within `timeout`.
        pub async fn close_game(
            &self,
            game_id: GameId,
            timeout: Duration,
        ) -> Result<(), StoreError> {
            let removed = self.stores.write().await.remove(&game_id);

            let Some(store) = removed else {
                return Ok(());
            };

            tracing::info!(%game_id, "Closing game roster");
            metrics::counter!("directory.games.closed").increment(1);
            store.shutdown(timeout).await
        }

        /// Number of open games
        pub async fn game_count(&self) -> usize {
            self.stores.read().await.len()
        }

        /// IDs of the currently open games
        pub async fn game_ids(&self) -> Vec<GameId> {
            self.stores.read().await.keys().copied().collect()
        }
    }
}

pub use directory::{GameDirectory, RosterStore};

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use courtside_core::{
        GameId, GameState, ParticipantName, RegistrationStatus, RosterAction, RosterEnvironment,
        RosterReducer,
    };

    fn test_store() -> RosterStore {
        Store::new(
            GameState::new(Capacity::new(10)),
            RosterReducer::new(),
            RosterEnvironment::new(),
        )
    }

    fn rsvp(name: &str) -> RosterAction {
        RosterAction::SubmitRsvp {
            name: name.to_owned(),
            guests: vec![],
            attending: true,
        }
    }

    #[tokio::test]
    async fn send_applies_the_command_before_returning() {
        let store = test_store();

        store.send(rsvp("Dana")).await.unwrap();

        let status = store
            .state(|s| {
                s.roster
                    .get(&ParticipantName::from("Dana"))
                    .map(|entry| entry.status)
            })
            .await;
        assert_eq!(status, Some(RegistrationStatus::Confirmed));
    }

    #[tokio::test]
    async fn shutdown_rejects_new_actions() {
        let store = test_store();

        store.shutdown(Duration::from_millis(100)).await.unwrap();

        let result = store.send(rsvp("Dana")).await;
        assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
    }

    #[tokio::test]
    async fn directory_reuses_the_store_for_a_game() {
        let directory = GameDirectory::new(RuntimeConfig::default(), RosterEnvironment::new());
        let game = GameId::new();

        let first = directory.store_for(game).await;
        let second = directory.store_for(game).await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(directory.game_count().await, 1);
    }

    #[tokio::test]
    async fn open_game_keeps_the_existing_capacity() {
        let directory = GameDirectory::new(RuntimeConfig::default(), RosterEnvironment::new());
        let game = GameId::new();

        directory.open_game(game, Capacity::new(5)).await;
        let store = directory.open_game(game, Capacity::new(20)).await;

        let capacity = store.state(|s| s.capacity).await;
        assert_eq!(capacity, Capacity::new(5));
    }

    #[tokio::test]
    async fn close_game_drops_the_store() {
        let directory = GameDirectory::new(RuntimeConfig::default(), RosterEnvironment::new());
        let game = GameId::new();

        directory.store_for(game).await;
        directory
            .close_game(game, Duration::from_millis(100))
            .await
            .unwrap();

        assert_eq!(directory.game_count().await, 0);
    }

    #[tokio::test]
    async fn close_game_is_a_noop_for_unknown_games() {
        let directory = GameDirectory::new(RuntimeConfig::default(), RosterEnvironment::new());

        let result = directory
            .close_game(GameId::new(), Duration::from_millis(100))
            .await;

        assert!(result.is_ok());
    }

    #[test]
    fn config_defaults() {
        let config = RuntimeConfig::default();

        assert_eq!(config.default_capacity, DEFAULT_CAPACITY);
        assert_eq!(config.feed_capacity, DEFAULT_FEED_CAPACITY);
    }
}
