//! Invalidation event bus.
//!
//! Any part of the application can ask for cache entries to be dropped
//! without holding a reference to the cache: it publishes an
//! [`InvalidationEvent`] on the bus, and an [`InvalidationListener`] wired to
//! the cache applies it.
//!
//! ## Architecture
//!
//! - Uses tokio broadcast channel for event distribution
//! - Publishing never blocks and never fails, even with no listener attached
//! - A listener that falls behind has missed events it cannot recover, so it
//!   clears the whole namespace

use serde::{Deserialize, Serialize};
use sprig_core::{CacheSettings, ConversationId, UserId};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, info, warn};

use crate::backend::KeyValueStore;
use crate::invalidation::{CacheInvalidator, InvalidationScope};

/// Why an invalidation was requested. Carried for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationReason {
    /// The user explicitly asked to reload.
    UserRequested,
    /// The backend or a presence channel asked clients to resync.
    ForcedResync,
    /// The UI switched to another conversation.
    ConversationSwitch,
    /// The user signed out.
    SignOut,
    /// The cache was found to be unusable.
    Corruption,
}

/// A request to drop cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationEvent {
    pub scope: InvalidationScope,
    pub reason: InvalidationReason,
}

impl InvalidationEvent {
    pub fn new(scope: InvalidationScope, reason: InvalidationReason) -> Self {
        Self { scope, reason }
    }

    pub fn conversation(conversation_id: ConversationId, reason: InvalidationReason) -> Self {
        Self::new(InvalidationScope::Conversation(conversation_id), reason)
    }

    pub fn user(user_id: UserId, reason: InvalidationReason) -> Self {
        Self::new(InvalidationScope::User(user_id), reason)
    }

    pub fn all(reason: InvalidationReason) -> Self {
        Self::new(InvalidationScope::All, reason)
    }
}

/// Publish/subscribe channel for invalidation events.
#[derive(Debug, Clone)]
pub struct InvalidationBus {
    tx: broadcast::Sender<InvalidationEvent>,
}

impl InvalidationBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Create a bus sized from settings.
    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.invalidation_channel_capacity)
    }

    /// Publish an event. Returns how many subscribers will see it.
    pub fn publish(&self, event: InvalidationEvent) -> usize {
        let reason = event.reason;
        match self.tx.send(event) {
            Ok(receivers) => {
                debug!(reason = ?reason, receivers, "Published invalidation");
                receivers
            }
            Err(_) => {
                debug!(reason = ?reason, "No listeners for invalidation");
                0
            }
        }
    }

    /// Subscribe to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<InvalidationEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Applies bus events to a cache.
pub struct InvalidationListener<S> {
    invalidator: CacheInvalidator<S>,
    receiver: broadcast::Receiver<InvalidationEvent>,
}

impl<S: KeyValueStore> InvalidationListener<S> {
    /// Subscribe `invalidator` to `bus`. Only events published after this
    /// call are seen.
    pub fn new(invalidator: CacheInvalidator<S>, bus: &InvalidationBus) -> Self {
        Self {
            invalidator,
            receiver: bus.subscribe(),
        }
    }

    /// Apply every pending event without waiting. Returns how many were handled.
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    self.handle(&event);
                    handled += 1;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    self.recover_from_lag(skipped);
                    handled += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        handled
    }

    /// Apply events as they arrive until every publisher is gone.
    pub async fn run(mut self) {
        loop {
            match self.receiver.recv().await {
                Ok(event) => self.handle(&event),
                Err(RecvError::Lagged(skipped)) => self.recover_from_lag(skipped),
                Err(RecvError::Closed) => {
                    info!("Invalidation bus closed; listener shutting down");
                    break;
                }
            }
        }
    }

    fn handle(&self, event: &InvalidationEvent) {
        let removed = self.invalidator.apply(&event.scope);
        debug!(scope = ?event.scope, reason = ?event.reason, removed, "Applied invalidation");
    }

    fn recover_from_lag(&self, skipped: u64) {
        warn!(skipped, "Invalidation listener lagged; clearing entire cache");
        self.invalidator.clear_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryStore;
    use crate::store::LocalMessageStore;
    use sprig_test_utils::fixtures::conversation;
    use std::sync::Arc;
    use std::time::Duration;

    fn seeded(ids: &[&str]) -> (Arc<LocalMessageStore<InMemoryStore>>, CacheInvalidator<InMemoryStore>) {
        let store = Arc::new(LocalMessageStore::new(InMemoryStore::new(), "sprig"));
        for id in ids {
            store.save(&ConversationId::new(*id), &conversation(id, 1));
        }
        let invalidator = CacheInvalidator::new(Arc::clone(&store));
        (store, invalidator)
    }

    #[test]
    fn test_publish_without_listeners() {
        let bus = InvalidationBus::new(8);
        assert_eq!(bus.publish(InvalidationEvent::all(InvalidationReason::SignOut)), 0);
    }

    #[test]
    fn test_drain_applies_pending_events() {
        let (store, invalidator) = seeded(&["c1", "c2", "c3"]);
        let bus = InvalidationBus::new(8);
        let mut listener = InvalidationListener::new(invalidator, &bus);

        bus.publish(InvalidationEvent::conversation(
            ConversationId::new("c1"),
            InvalidationReason::ConversationSwitch,
        ));
        bus.publish(InvalidationEvent::conversation(
            ConversationId::new("c2"),
            InvalidationReason::UserRequested,
        ));

        assert_eq!(listener.drain(), 2);
        assert_eq!(store.cached_conversations(), vec![ConversationId::new("c3")]);
        assert_eq!(listener.drain(), 0);
    }

    #[test]
    fn test_lagged_listener_clears_everything() {
        let (store, invalidator) = seeded(&["c1", "c2", "c3"]);
        let bus = InvalidationBus::new(1);
        let mut listener = InvalidationListener::new(invalidator, &bus);

        bus.publish(InvalidationEvent::conversation(
            ConversationId::new("c1"),
            InvalidationReason::ForcedResync,
        ));
        bus.publish(InvalidationEvent::conversation(
            ConversationId::new("c2"),
            InvalidationReason::ForcedResync,
        ));

        listener.drain();
        assert!(store.cached_conversations().is_empty());
    }

    #[test]
    fn test_subscriber_count() {
        let (_store, invalidator) = seeded(&[]);
        let bus = InvalidationBus::from_settings(&CacheSettings::default());
        assert_eq!(bus.subscriber_count(), 0);

        let _listener = InvalidationListener::new(invalidator, &bus);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_event_serialization() {
        let event = InvalidationEvent::user(UserId::new("alice"), InvalidationReason::SignOut);
        let json = serde_json::to_value(&event).expect("serialize should succeed");
        assert_eq!(json["reason"], "sign_out");
        assert_eq!(json["scope"]["scope"], "user");
        assert_eq!(json["scope"]["id"], "alice");
    }

    #[tokio::test]
    async fn test_run_applies_events_until_closed() {
        let (store, invalidator) = seeded(&["c1", "c2"]);
        let bus = InvalidationBus::new(8);
        let listener = InvalidationListener::new(invalidator, &bus);
        let handle = tokio::spawn(listener.run());

        bus.publish(InvalidationEvent::all(InvalidationReason::SignOut));
        drop(bus);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("listener should stop once the bus closes")
            .expect("listener task should not panic");
        assert!(store.cached_conversations().is_empty());
    }
}
