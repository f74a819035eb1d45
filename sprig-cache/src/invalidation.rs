//! Cache invalidation policy.
//!
//! Invalidation is explicit and coarse-grained: one conversation, every
//! conversation of a user, or everything. There is no TTL and no notion of
//! a stale entry; an entry is either present or absent, and callers decide
//! when to refetch.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sprig_core::{ConversationId, SprigResult, UserId};
use tracing::{info, warn};

use crate::backend::KeyValueStore;
use crate::store::LocalMessageStore;

/// Resolves which conversations belong to a user.
///
/// Owned by the chat backend; the cache only consumes it.
pub trait ConversationDirectory: Send + Sync {
    /// Conversations the user takes part in.
    fn conversations_for_user(&self, user_id: &UserId) -> SprigResult<Vec<ConversationId>>;
}

/// What an invalidation removes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum InvalidationScope {
    /// A single conversation.
    Conversation(ConversationId),
    /// Every conversation of a user.
    User(UserId),
    /// Every cached conversation in the namespace.
    All,
}

/// Drops cache entries on request.
pub struct CacheInvalidator<S> {
    store: Arc<LocalMessageStore<S>>,
    directory: Option<Arc<dyn ConversationDirectory>>,
}

impl<S> Clone for CacheInvalidator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            directory: self.directory.clone(),
        }
    }
}

impl<S: KeyValueStore> CacheInvalidator<S> {
    /// Create an invalidator without a conversation directory.
    ///
    /// User-scoped invalidation then falls back to clearing everything.
    pub fn new(store: Arc<LocalMessageStore<S>>) -> Self {
        Self {
            store,
            directory: None,
        }
    }

    /// Attach the directory used to resolve a user's conversations.
    pub fn with_directory(mut self, directory: Arc<dyn ConversationDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Whether user-scoped invalidation can be targeted.
    pub fn has_directory(&self) -> bool {
        self.directory.is_some()
    }

    /// Remove the entry for exactly one conversation.
    pub fn invalidate_conversation(&self, conversation_id: &ConversationId) -> bool {
        let removed = self.store.remove(conversation_id);
        info!(conversation_id = %conversation_id, removed, "Invalidated conversation cache");
        removed
    }

    /// Remove the entries of every conversation owned by `user_id`.
    ///
    /// Without a directory, or when the lookup fails, the whole namespace is
    /// cleared instead.
    pub fn invalidate_user_conversations(&self, user_id: &UserId) -> u64 {
        let Some(directory) = &self.directory else {
            info!(user_id = %user_id, "No conversation directory; clearing entire cache");
            return self.clear_all();
        };

        match directory.conversations_for_user(user_id) {
            Ok(conversation_ids) => {
                let removed = conversation_ids
                    .iter()
                    .filter(|conversation_id| self.store.remove(conversation_id))
                    .count() as u64;
                info!(user_id = %user_id, removed, "Invalidated user conversation caches");
                removed
            }
            Err(e) => {
                warn!(
                    user_id = %user_id,
                    error = %e,
                    "Conversation lookup failed; clearing entire cache"
                );
                self.clear_all()
            }
        }
    }

    /// Drop every cached conversation in the namespace.
    pub fn clear_all(&self) -> u64 {
        let removed = self.store.clear();
        info!(namespace = %self.store.namespace(), removed, "Cleared message cache");
        removed
    }

    /// Apply a scope. Returns how many entries were removed.
    pub fn apply(&self, scope: &InvalidationScope) -> u64 {
        match scope {
            InvalidationScope::Conversation(conversation_id) => {
                u64::from(self.invalidate_conversation(conversation_id))
            }
            InvalidationScope::User(user_id) => self.invalidate_user_conversations(user_id),
            InvalidationScope::All => self.clear_all(),
        }
    }
}
