//! Conversation reconciler.
//!
//! Drives the cache-then-network flow for one conversation: show what is
//! cached, fetch the authoritative batch, merge it over the cache and
//! persist the result.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use sprig_core::{CachedMessage, ChatMessage, ConversationId, SprigResult};
use tracing::{debug, warn};

use crate::backend::KeyValueStore;
use crate::bus::{InvalidationBus, InvalidationListener};
use crate::invalidation::{CacheInvalidator, ConversationDirectory};
use crate::merge::merge_messages;
use crate::store::LocalMessageStore;

/// Remote source of a conversation's messages.
#[async_trait]
pub trait MessageFetcher<M: CachedMessage>: Send + Sync {
    /// Fetch the authoritative message batch for a conversation.
    async fn fetch(&self, conversation_id: &ConversationId) -> SprigResult<Vec<M>>;
}

/// Where a refreshed list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshSource {
    /// The remote batch was fetched and merged into the cache.
    Remote,
    /// The fetch failed; the list is the cache as it stood.
    CacheOnly,
}

/// Result of [`ConversationReconciler::refresh`].
#[derive(Debug, Clone, PartialEq)]
pub struct Refresh<M> {
    pub messages: Vec<M>,
    pub source: RefreshSource,
}

impl<M> Refresh<M> {
    /// Whether the list reflects a successful fetch.
    pub fn is_fresh(&self) -> bool {
        self.source == RefreshSource::Remote
    }
}

/// Keeps a conversation's cached list in step with the remote one.
pub struct ConversationReconciler<S, M = ChatMessage> {
    store: Arc<LocalMessageStore<S>>,
    invalidator: CacheInvalidator<S>,
    _message: PhantomData<fn() -> M>,
}

impl<S: KeyValueStore, M: CachedMessage> ConversationReconciler<S, M> {
    pub fn new(store: Arc<LocalMessageStore<S>>) -> Self {
        let invalidator = CacheInvalidator::new(Arc::clone(&store));
        Self {
            store,
            invalidator,
            _message: PhantomData,
        }
    }

    /// Resolve user-scoped invalidations through `directory`.
    pub fn with_directory(mut self, directory: Arc<dyn ConversationDirectory>) -> Self {
        self.invalidator = self.invalidator.with_directory(directory);
        self
    }

    /// The cached list, for immediate display.
    pub fn cached(&self, conversation_id: &ConversationId) -> Vec<M> {
        self.store.load(conversation_id)
    }

    /// Merge `remote` over the cached list, persist and return the result.
    ///
    /// On a shared id the remote version replaces the cached one.
    pub fn reconcile(&self, conversation_id: &ConversationId, remote: &[M]) -> Vec<M> {
        let cached: Vec<M> = self.store.load(conversation_id);
        let merged = merge_messages(&cached, remote);
        debug!(
            conversation_id = %conversation_id,
            cached = cached.len(),
            remote = remote.len(),
            merged = merged.len(),
            "Reconciled conversation"
        );
        self.store.save(conversation_id, &merged);
        merged
    }

    /// Merge one locally produced message (an outgoing draft or a pushed
    /// message) into the cache.
    pub fn record_local(&self, conversation_id: &ConversationId, message: M) -> Vec<M> {
        self.reconcile(conversation_id, std::slice::from_ref(&message))
    }

    /// Fetch, reconcile and return the conversation.
    ///
    /// A failed fetch leaves the cache untouched and returns it as is.
    pub async fn refresh<F>(&self, conversation_id: &ConversationId, fetcher: &F) -> Refresh<M>
    where
        F: MessageFetcher<M> + ?Sized,
    {
        match fetcher.fetch(conversation_id).await {
            Ok(remote) => Refresh {
                messages: self.reconcile(conversation_id, &remote),
                source: RefreshSource::Remote,
            },
            Err(e) => {
                warn!(
                    conversation_id = %conversation_id,
                    error = %e,
                    "Fetch failed; serving cached messages"
                );
                Refresh {
                    messages: self.cached(conversation_id),
                    source: RefreshSource::CacheOnly,
                }
            }
        }
    }

    pub fn invalidator(&self) -> &CacheInvalidator<S> {
        &self.invalidator
    }

    /// A listener that applies `bus` events to this reconciler's cache.
    pub fn listener(&self, bus: &InvalidationBus) -> InvalidationListener<S> {
        InvalidationListener::new(self.invalidator.clone(), bus)
    }

    pub fn store(&self) -> &Arc<LocalMessageStore<S>> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryStore;
    use crate::bus::{InvalidationEvent, InvalidationReason};
    use sprig_core::FetchError;
    use sprig_test_utils::fixtures::{conversation, message};

    struct FixedFetcher(Vec<ChatMessage>);

    #[async_trait]
    impl MessageFetcher<ChatMessage> for FixedFetcher {
        async fn fetch(&self, _conversation_id: &ConversationId) -> SprigResult<Vec<ChatMessage>> {
            Ok(self.0.clone())
        }
    }

    struct OfflineFetcher;

    #[async_trait]
    impl MessageFetcher<ChatMessage> for OfflineFetcher {
        async fn fetch(&self, conversation_id: &ConversationId) -> SprigResult<Vec<ChatMessage>> {
            Err(FetchError::RequestFailed {
                conversation_id: conversation_id.to_string(),
                reason: "network unreachable".to_string(),
            }
            .into())
        }
    }

    fn reconciler() -> ConversationReconciler<InMemoryStore> {
        ConversationReconciler::new(Arc::new(LocalMessageStore::new(InMemoryStore::new(), "sprig")))
    }

    fn ids(messages: &[ChatMessage]) -> Vec<&str> {
        messages.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_reconcile_remote_wins_and_persists() {
        let reconciler = reconciler();
        let cid = ConversationId::new("c1");
        reconciler
            .store()
            .save(&cid, &[message("1", "2024-01-01T10:00:00Z")]);

        let merged = reconciler.reconcile(
            &cid,
            &[
                message("1", "2024-01-01T10:05:00Z"),
                message("2", "2024-01-01T10:01:00Z"),
            ],
        );

        assert_eq!(ids(&merged), vec!["2", "1"]);
        assert_eq!(merged[1].sent_at, "2024-01-01T10:05:00Z");
        assert_eq!(reconciler.cached(&cid), merged);
    }

    #[test]
    fn test_reconcile_keeps_cache_only_messages() {
        let reconciler = reconciler();
        let cid = ConversationId::new("c1");
        reconciler.store().save(&cid, &conversation("c1", 3));

        let merged = reconciler.reconcile(&cid, &[]);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_record_local_appends_in_order() {
        let reconciler = reconciler();
        let cid = ConversationId::new("c1");
        reconciler.store().save(&cid, &conversation("c1", 2));

        let draft = ChatMessage::draft("c1", "u1", "Is this leaf spot fungal?");
        let draft_id = draft.id.clone();
        let merged = reconciler.record_local(&cid, draft);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[2].id, draft_id);
    }

    #[tokio::test]
    async fn test_refresh_from_remote() {
        let reconciler = reconciler();
        let cid = ConversationId::new("c1");
        let fetcher = FixedFetcher(conversation("c1", 4));

        let refresh = reconciler.refresh(&cid, &fetcher).await;

        assert!(refresh.is_fresh());
        assert_eq!(refresh.messages.len(), 4);
        assert_eq!(reconciler.cached(&cid).len(), 4);
    }

    #[tokio::test]
    async fn test_refresh_offline_serves_cache() {
        let reconciler = reconciler();
        let cid = ConversationId::new("c1");
        let cached = conversation("c1", 2);
        reconciler.store().save(&cid, &cached);

        let refresh = reconciler.refresh(&cid, &OfflineFetcher).await;

        assert_eq!(refresh.source, RefreshSource::CacheOnly);
        assert_eq!(refresh.messages, cached);
    }

    #[tokio::test]
    async fn test_refresh_through_trait_object() {
        let reconciler = reconciler();
        let fetcher: Box<dyn MessageFetcher<ChatMessage>> = Box::new(OfflineFetcher);

        let refresh = reconciler
            .refresh(&ConversationId::new("c1"), &*fetcher)
            .await;
        assert!(refresh.messages.is_empty());
    }

    #[test]
    fn test_invalidate_then_cached_is_empty() {
        let reconciler = reconciler();
        let cid = ConversationId::new("c1");
        reconciler.store().save(&cid, &conversation("c1", 2));

        reconciler.invalidator().invalidate_conversation(&cid);
        assert!(reconciler.cached(&cid).is_empty());
    }

    #[test]
    fn test_quota_error_does_not_reach_caller() {
        let store = Arc::new(LocalMessageStore::new(InMemoryStore::with_quota_bytes(32), "sprig"));
        let reconciler: ConversationReconciler<_> = ConversationReconciler::new(store);
        let cid = ConversationId::new("c1");

        let merged = reconciler.reconcile(&cid, &conversation("c1", 5));

        assert_eq!(merged.len(), 5);
        assert!(reconciler.cached(&cid).is_empty());
    }

    #[test]
    fn test_listener_applies_bus_events() {
        let reconciler = reconciler();
        let bus = InvalidationBus::new(4);
        let mut listener = reconciler.listener(&bus);
        let cid = ConversationId::new("c1");
        reconciler.store().save(&cid, &conversation("c1", 2));

        bus.publish(InvalidationEvent::conversation(
            cid.clone(),
            InvalidationReason::ForcedResync,
        ));
        listener.drain();

        assert!(reconciler.cached(&cid).is_empty());
    }
}
