//! Local message store.
//!
//! Persists one JSON-encoded message list per conversation through a
//! [`KeyValueStore`]. Nothing here ever returns an error: an unreadable
//! entry loads as an empty list and a refused write is dropped, so a broken
//! cache degrades into a cold cache rather than a broken chat screen.

use std::sync::{Arc, RwLock};

use sprig_core::{CacheSettings, CachedMessage, ConversationId, SprigResult};
use tracing::{debug, warn};

use crate::backend::{CacheKey, CacheStats, InMemoryStore, KeyValueStore, LmdbStore};

/// A store over a type-erased backend, as built from [`CacheSettings`].
pub type SharedMessageStore = LocalMessageStore<Arc<dyn KeyValueStore>>;

/// Per-conversation message persistence.
pub struct LocalMessageStore<S> {
    backend: S,
    namespace: String,
    stats: RwLock<CacheStats>,
}

impl SharedMessageStore {
    /// Build a store from settings: LMDB when a path is configured,
    /// otherwise an in-memory store with the configured quota.
    pub fn from_settings(settings: &CacheSettings) -> SprigResult<Self> {
        settings.validate()?;

        let backend: Arc<dyn KeyValueStore> = match &settings.lmdb_path {
            Some(path) => Arc::new(LmdbStore::open(path, settings.lmdb_max_size_mb)?),
            None => match settings.memory_quota_bytes {
                Some(quota) => Arc::new(InMemoryStore::with_quota_bytes(quota)),
                None => Arc::new(InMemoryStore::new()),
            },
        };

        Ok(Self::new(backend, settings.namespace.clone()))
    }
}

impl<S: KeyValueStore> LocalMessageStore<S> {
    /// Wrap a backend. `namespace` prefixes every key this store touches.
    pub fn new(backend: S, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// The namespace keys are built in.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The underlying backend.
    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Storage key for a conversation.
    pub fn key(&self, conversation_id: &ConversationId) -> CacheKey {
        CacheKey::new(self.namespace.clone(), conversation_id.clone())
    }

    /// Load the cached list for a conversation.
    ///
    /// Returns an empty list when nothing is cached, when the backend read
    /// fails, or when the stored value does not parse.
    pub fn load<M: CachedMessage>(&self, conversation_id: &ConversationId) -> Vec<M> {
        let key = self.key(conversation_id).encode();

        let raw = match self.backend.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.record(|s| s.misses += 1);
                return Vec::new();
            }
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "Cache read failed");
                self.record(|s| s.misses += 1);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<M>>(&raw) {
            Ok(messages) => {
                debug!(
                    conversation_id = %conversation_id,
                    count = messages.len(),
                    "Loaded cached messages"
                );
                self.record(|s| s.hits += 1);
                messages
            }
            Err(e) => {
                warn!(
                    conversation_id = %conversation_id,
                    error = %e,
                    "Discarding unreadable cache entry"
                );
                self.record(|s| s.parse_failures += 1);
                Vec::new()
            }
        }
    }

    /// Persist the full list for a conversation, replacing any prior value.
    ///
    /// Best-effort: serialization and write failures are logged and dropped.
    pub fn save<M: CachedMessage>(&self, conversation_id: &ConversationId, messages: &[M]) {
        let key = self.key(conversation_id).encode();

        let raw = match serde_json::to_string(messages) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "Cache entry not serializable");
                self.record(|s| s.write_failures += 1);
                return;
            }
        };

        match self.backend.set(&key, &raw) {
            Ok(()) => {
                debug!(
                    conversation_id = %conversation_id,
                    count = messages.len(),
                    bytes = raw.len(),
                    "Saved messages to cache"
                );
                self.record(|s| s.writes += 1);
            }
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "Cache write dropped");
                self.record(|s| s.write_failures += 1);
            }
        }
    }

    /// Whether an entry exists for the conversation.
    pub fn contains(&self, conversation_id: &ConversationId) -> bool {
        let key = self.key(conversation_id).encode();
        matches!(self.backend.get(&key), Ok(Some(_)))
    }

    /// Delete the entry for a conversation. Returns whether one existed.
    pub fn remove(&self, conversation_id: &ConversationId) -> bool {
        let key = self.key(conversation_id).encode();
        match self.backend.delete(&key) {
            Ok(removed) => {
                if removed {
                    self.record(|s| s.removals += 1);
                }
                removed
            }
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "Cache delete failed");
                false
            }
        }
    }

    /// Every conversation with an entry in this namespace.
    pub fn cached_conversations(&self) -> Vec<ConversationId> {
        let prefix = CacheKey::namespace_prefix(&self.namespace);
        match self.backend.keys_with_prefix(&prefix) {
            Ok(keys) => keys
                .iter()
                .filter_map(|raw| CacheKey::decode(raw))
                .map(|key| key.conversation_id().clone())
                .collect(),
            Err(e) => {
                warn!(namespace = %self.namespace, error = %e, "Cache scan failed");
                Vec::new()
            }
        }
    }

    /// Delete every entry in this namespace. Returns how many were removed.
    pub fn clear(&self) -> u64 {
        self.cached_conversations()
            .iter()
            .filter(|conversation_id| self.remove(conversation_id))
            .count() as u64
    }

    /// Snapshot of usage statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.read().map(|s| s.clone()).unwrap_or_default()
    }

    fn record(&self, update: impl FnOnce(&mut CacheStats)) {
        if let Ok(mut stats) = self.stats.write() {
            update(&mut *stats);
        }
    }
}
