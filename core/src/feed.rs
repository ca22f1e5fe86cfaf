//! In-process event feed.
//!
//! A thin wrapper over a tokio broadcast channel. The reducer's
//! environment owns one feed per game; publish effects send every
//! applied event into it, and observers (waitlist displays, the store's
//! `send_and_wait_for`) subscribe. Slow subscribers lag rather than
//! block the publisher, and publishing with no subscribers at all is a
//! no-op, not an error.

use tokio::sync::broadcast;

/// Default number of buffered events before slow subscribers start lagging.
pub const DEFAULT_FEED_CAPACITY: usize = 256;

/// Broadcast feed of applied events.
#[derive(Debug)]
pub struct EventFeed<A> {
    sender: broadcast::Sender<A>,
}

impl<A: Clone> EventFeed<A> {
    /// Creates a feed buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all current subscribers.
    pub fn publish(&self, event: A) {
        if self.sender.send(event).is_err() {
            tracing::trace!("event published with no subscribers");
        }
    }

    /// Opens a new subscription starting at the next published event.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<A> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<A> Clone for EventFeed<A> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<A: Clone> Default for EventFeed<A> {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

/// Environments that expose the feed their reducer's events flow into.
pub trait FeedSource<A> {
    /// The feed applied events are published to.
    fn event_feed(&self) -> &EventFeed<A>;
}
