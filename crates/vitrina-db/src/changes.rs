//! # Change Feed
//!
//! Broadcasts which collection of which user changed after every committed
//! write. Live queries listen here to know when to re-read.
//!
//! ```text
//! repository write ──commit──► ChangeFeed::publish(ChangeEvent)
//!                                    │
//!                  ┌─────────────────┼─────────────────┐
//!                  ▼                 ▼                 ▼
//!            LiveQuery(inv, A)  LiveQuery(sales, A)  LiveQuery(inv, B)
//!               re-reads           ignores            ignores
//! ```
//!
//! Events carry no payload: subscribers always re-read the whole collection,
//! so a lagging subscriber only needs to know that it missed something.

use std::fmt;

use tokio::sync::broadcast;
use tracing::trace;

/// Capacity of the broadcast buffer before slow subscribers lag.
const FEED_CAPACITY: usize = 256;

/// A per-user document collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Products, with their variants.
    Inventory,
    /// Recorded sales.
    Sales,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Inventory => f.write_str("inventory"),
            Collection::Sales => f.write_str("sales"),
        }
    }
}

/// "Something in `collection` of `owner_id` changed."
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub owner_id: String,
}

impl ChangeEvent {
    pub fn new(collection: Collection, owner_id: impl Into<String>) -> Self {
        ChangeEvent {
            collection,
            owner_id: owner_id.into(),
        }
    }

    /// Whether a subscriber to (`collection`, `owner_id`) cares.
    pub fn concerns(&self, collection: Collection, owner_id: &str) -> bool {
        self.collection == collection && self.owner_id == owner_id
    }
}

/// Cloneable handle to the broadcast channel.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        ChangeFeed { sender }
    }

    /// Publishes an event. Having no subscribers is not an error.
    pub fn publish(&self, event: ChangeEvent) {
        trace!(collection = %event.collection, owner_id = %event.owner_id, "Publishing change");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let feed = ChangeFeed::new();
        let mut rx = feed.subscribe();

        feed.publish(ChangeEvent::new(Collection::Sales, "u1"));

        let event = rx.recv().await.unwrap();
        assert!(event.concerns(Collection::Sales, "u1"));
        assert!(!event.concerns(Collection::Inventory, "u1"));
        assert!(!event.concerns(Collection::Sales, "u2"));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let feed = ChangeFeed::default();
        feed.publish(ChangeEvent::new(Collection::Inventory, "u1"));
    }
}
