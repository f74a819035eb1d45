//! Chat message types

use chrono::{SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identity::{ConversationId, EpochMillis, MessageId, UserId};
use crate::timestamp::parse_sent_at;

/// The minimal contract the cache needs from a message.
///
/// The cache only ever looks at `id` and `sent_at`; every other field is
/// payload that it stores and hands back untouched.
///
/// # Implementation Requirements
///
/// - `id()` must be stable across fetches of the same message
/// - `sent_at()` may be any string; unparseable values order as the epoch
/// - Implementations must round-trip through serde for persistence
pub trait CachedMessage: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Identifier, unique within a conversation.
    fn id(&self) -> &str;

    /// Raw send timestamp as delivered by the backend.
    fn sent_at(&self) -> &str;

    /// `sent_at` as epoch milliseconds, zero when unparseable.
    fn sent_at_millis(&self) -> EpochMillis {
        parse_sent_at(self.sent_at())
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    /// The plant owner asking for help.
    #[default]
    User,
    /// A plant-pathology expert answering.
    Expert,
    /// Automated notices (diagnosis attached, expert joined, ...).
    System,
}

/// Kind of file attached to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Image,
    File,
}

/// A file reference attached to a chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// A message in a user/expert conversation.
///
/// Fields the backend adds that this type does not model are kept in
/// `extra` so that caching a message never loses data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    #[serde(default)]
    pub sender_role: SenderRole,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    pub sent_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    /// Create a message with an explicit id and timestamp.
    pub fn new(
        id: impl Into<MessageId>,
        conversation_id: impl Into<ConversationId>,
        sender_id: impl Into<UserId>,
        content: impl Into<String>,
        sent_at: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            conversation_id: conversation_id.into(),
            sender_id: sender_id.into(),
            sender_role: SenderRole::User,
            content: content.into(),
            attachments: Vec::new(),
            sent_at: sent_at.into(),
            read_at: None,
            extra: Map::new(),
        }
    }

    /// Compose a new outgoing message: fresh id, sent now.
    pub fn draft(
        conversation_id: impl Into<ConversationId>,
        sender_id: impl Into<UserId>,
        content: impl Into<String>,
    ) -> Self {
        let sent_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        Self::new(
            MessageId::generate(),
            conversation_id,
            sender_id,
            content,
            sent_at,
        )
    }

    pub fn with_role(mut self, role: SenderRole) -> Self {
        self.sender_role = role;
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_read_at(mut self, read_at: impl Into<String>) -> Self {
        self.read_at = Some(read_at.into());
        self
    }

    /// Whether the recipient has seen this message.
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

impl CachedMessage for ChatMessage {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn sent_at(&self) -> &str {
        &self.sent_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_fields_survive_roundtrip() {
        let raw = r#"{
            "id": "m1",
            "conversation_id": "c1",
            "sender_id": "u1",
            "sender_role": "expert",
            "content": "Looks like powdery mildew.",
            "sent_at": "2024-01-01T10:00:00Z",
            "diagnosis_id": "d-77",
            "edited": true
        }"#;

        let message: ChatMessage = serde_json::from_str(raw).expect("deserialize should succeed");
        assert_eq!(message.sender_role, SenderRole::Expert);
        assert_eq!(message.extra.get("diagnosis_id"), Some(&Value::from("d-77")));

        let json = serde_json::to_value(&message).expect("serialize should succeed");
        assert_eq!(json["diagnosis_id"], "d-77");
        assert_eq!(json["edited"], true);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let raw = r#"{"id":"m1","conversation_id":"c1","sender_id":"u1","sent_at":"x"}"#;
        let message: ChatMessage = serde_json::from_str(raw).expect("deserialize should succeed");
        assert_eq!(message.sender_role, SenderRole::User);
        assert!(message.content.is_empty());
        assert!(message.attachments.is_empty());
        assert!(!message.is_read());
    }

    #[test]
    fn test_cached_message_accessors() {
        let message = ChatMessage::new("m1", "c1", "u1", "hi", "2024-01-01T10:00:00Z");
        assert_eq!(CachedMessage::id(&message), "m1");
        assert_eq!(message.sent_at_millis(), 1_704_103_200_000);

        let broken = ChatMessage::new("m2", "c1", "u1", "hi", "not-a-date");
        assert_eq!(broken.sent_at_millis(), 0);
    }

    #[test]
    fn test_draft_has_parseable_timestamp() {
        let draft = ChatMessage::draft("c1", "u1", "my fern is yellow");
        assert!(draft.sent_at_millis() > 0);
        assert_eq!(draft.conversation_id.as_str(), "c1");
    }

    #[test]
    fn test_builders() {
        let message = ChatMessage::new("m1", "c1", "u1", "photo", "2024-01-01T10:00:00Z")
            .with_role(SenderRole::User)
            .with_attachment(Attachment {
                kind: AttachmentKind::Image,
                url: "https://cdn.example/leaf.jpg".to_string(),
                mime_type: Some("image/jpeg".to_string()),
                file_name: None,
            })
            .with_read_at("2024-01-01T10:01:00Z");

        assert_eq!(message.attachments.len(), 1);
        assert!(message.is_read());
    }
}
