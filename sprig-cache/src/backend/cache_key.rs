//! Conversation-scoped cache keys.
//!
//! Every cached conversation lives under exactly one storage key:
//! `<namespace>:messages:<conversationId>`. Keeping the namespace first means
//! a prefix scan over `<namespace>:messages:` finds every cached conversation
//! and nothing else the application happens to keep in the same store.

use sprig_core::ConversationId;

/// Separator between key segments.
const SEPARATOR: char = ':';

/// Fixed segment naming the message-list entry kind.
const MESSAGES_SEGMENT: &str = "messages";

/// A storage key for one conversation's cached message list.
///
/// # Design
///
/// The private inner struct means a key can only be built through
/// [`CacheKey::new`] or [`CacheKey::decode`], so every key the cache writes
/// carries a namespace.
///
/// # Format
///
/// `<namespace>:messages:<conversationId>`. The namespace must not contain
/// `:`; the conversation id may, since decoding only splits on the first two
/// separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    inner: CacheKeyInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKeyInner {
    namespace: String,
    conversation_id: ConversationId,
}

impl CacheKey {
    /// Create a key for `conversation_id` inside `namespace`.
    pub fn new(namespace: impl Into<String>, conversation_id: ConversationId) -> Self {
        Self {
            inner: CacheKeyInner {
                namespace: namespace.into(),
                conversation_id,
            },
        }
    }

    /// Get the namespace this key is scoped to.
    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    /// Get the conversation this key addresses.
    pub fn conversation_id(&self) -> &ConversationId {
        &self.inner.conversation_id
    }

    /// Render the storage key.
    pub fn encode(&self) -> String {
        format!(
            "{}{}",
            Self::namespace_prefix(&self.inner.namespace),
            self.inner.conversation_id
        )
    }

    /// Parse a storage key.
    ///
    /// Returns `None` if:
    /// - The namespace segment is missing or empty
    /// - The second segment is not `messages`
    /// - The conversation id is empty
    pub fn decode(raw: &str) -> Option<Self> {
        let (namespace, rest) = raw.split_once(SEPARATOR)?;
        if namespace.is_empty() {
            return None;
        }

        let (segment, conversation_id) = rest.split_once(SEPARATOR)?;
        if segment != MESSAGES_SEGMENT || conversation_id.is_empty() {
            return None;
        }

        Some(Self::new(namespace, ConversationId::new(conversation_id)))
    }

    /// Prefix shared by every message-list key in `namespace`.
    pub fn namespace_prefix(namespace: &str) -> String {
        format!("{namespace}{SEPARATOR}{MESSAGES_SEGMENT}{SEPARATOR}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_getters() {
        let key = CacheKey::new("sprig", ConversationId::new("c1"));
        assert_eq!(key.namespace(), "sprig");
        assert_eq!(key.conversation_id().as_str(), "c1");
    }

    #[test]
    fn test_encode_format() {
        let key = CacheKey::new("sprig", ConversationId::new("c1"));
        assert_eq!(key.encode(), "sprig:messages:c1");
    }

    #[test]
    fn test_decode_roundtrip() {
        let key = CacheKey::new("sprig", ConversationId::new("c1"));
        let decoded = CacheKey::decode(&key.encode()).expect("decode should succeed");
        assert_eq!(key, decoded);
    }

    #[test]
    fn test_conversation_id_may_contain_separator() {
        let key = CacheKey::new("sprig", ConversationId::new("expert:42"));
        assert_eq!(key.encode(), "sprig:messages:expert:42");

        let decoded = CacheKey::decode("sprig:messages:expert:42").expect("decode should succeed");
        assert_eq!(decoded.conversation_id().as_str(), "expert:42");
    }

    #[test]
    fn test_decode_rejects_foreign_keys() {
        assert!(CacheKey::decode("sprig:settings:theme").is_none());
        assert!(CacheKey::decode("sprig:messages:").is_none());
        assert!(CacheKey::decode(":messages:c1").is_none());
        assert!(CacheKey::decode("no-separator").is_none());
        assert!(CacheKey::decode("sprig:messages").is_none());
    }

    #[test]
    fn test_namespace_prefix() {
        assert_eq!(CacheKey::namespace_prefix("sprig"), "sprig:messages:");
    }

    #[test]
    fn test_different_namespaces_different_keys() {
        let a = CacheKey::new("a", ConversationId::new("c1"));
        let b = CacheKey::new("b", ConversationId::new("c1"));
        assert_ne!(a.encode(), b.encode());
    }
}
