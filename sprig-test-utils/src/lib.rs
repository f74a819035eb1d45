//! SPRIG Test Utilities
//!
//! Shared test infrastructure for the SPRIG workspace:
//! - Proptest generators for messages and message lists
//! - Test fixtures for common conversation shapes
//! - Custom assertions for cache-specific validation

pub use sprig_core::{
    CachedMessage, ChatMessage, ConversationId, MessageId, SenderRole, SprigError, SprigResult,
    StorageError, UserId,
};

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// 2024-01-01T10:00:00Z, the anchor every fixture timestamp is built from.
pub const FIXTURE_EPOCH_SECS: i64 = 1_704_103_200;

fn fixture_time(offset_secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(FIXTURE_EPOCH_SECS, 0).unwrap_or_default() + Duration::seconds(offset_secs)
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating chat messages.

    use super::*;
    use proptest::prelude::*;

    /// Generate a message id from a small pool so lists collide often.
    pub fn arb_message_id() -> impl Strategy<Value = MessageId> {
        (0u8..12).prop_map(|n| MessageId::new(format!("m{n:02}")))
    }

    /// Generate a conversation id.
    pub fn arb_conversation_id() -> impl Strategy<Value = ConversationId> {
        "[a-z0-9]{1,12}".prop_map(ConversationId::new)
    }

    /// Generate a `sent_at` string.
    ///
    /// Mostly well-formed RFC 3339 within a ten-minute window, so equal
    /// timestamps are common, plus other accepted shapes and values that do
    /// not parse at all.
    pub fn arb_sent_at() -> impl Strategy<Value = String> {
        prop_oneof![
            6 => (0i64..600).prop_map(|s| fixture_time(s).to_rfc3339_opts(SecondsFormat::Secs, true)),
            2 => (0i64..600, 0u32..1000).prop_map(|(s, ms)| {
                (fixture_time(s) + Duration::milliseconds(i64::from(ms)))
                    .to_rfc3339_opts(SecondsFormat::Millis, false)
            }),
            1 => (0i64..600).prop_map(|s| fixture_time(s).format("%Y-%m-%d %H:%M:%S").to_string()),
            1 => Just("2024-01-01T10:00:00Z".to_string()),
            1 => Just("not-a-date".to_string()),
            1 => Just(String::new()),
            1 => Just("1970-01-01T00:00:00Z".to_string()),
        ]
    }

    /// Generate a SenderRole variant.
    pub fn arb_sender_role() -> impl Strategy<Value = SenderRole> {
        prop_oneof![
            Just(SenderRole::User),
            Just(SenderRole::Expert),
            Just(SenderRole::System),
        ]
    }

    /// Generate a message in conversation `c1`.
    pub fn arb_message() -> impl Strategy<Value = ChatMessage> {
        (
            arb_message_id(),
            prop_oneof![Just("owner-1"), Just("expert-1")],
            arb_sender_role(),
            "[a-zA-Z0-9 ]{0,60}".prop_map(|s| s),
            arb_sent_at(),
            prop::option::of(arb_sent_at()),
        )
            .prop_map(|(id, sender, role, content, sent_at, read_at)| {
                let message = ChatMessage::new(id, "c1", sender, content, sent_at).with_role(role);
                match read_at {
                    Some(read_at) => message.with_read_at(read_at),
                    None => message,
                }
            })
    }

    /// Generate a message list that may repeat ids.
    pub fn arb_message_list() -> impl Strategy<Value = Vec<ChatMessage>> {
        prop::collection::vec(arb_message(), 0..20)
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built messages and conversations for common scenarios.

    use super::*;

    /// A message in conversation `c1` from `owner-1`.
    pub fn message(id: &str, sent_at: &str) -> ChatMessage {
        message_in("c1", id, sent_at)
    }

    /// A message in the given conversation.
    pub fn message_in(conversation_id: &str, id: &str, sent_at: &str) -> ChatMessage {
        ChatMessage::new(id, conversation_id, "owner-1", format!("message {id}"), sent_at)
    }

    /// A canonical conversation of `count` messages one minute apart,
    /// alternating between the owner and an expert.
    pub fn conversation(conversation_id: &str, count: usize) -> Vec<ChatMessage> {
        (0..count)
            .map(|i| {
                let sent_at = fixture_time(60 * i as i64).to_rfc3339_opts(SecondsFormat::Secs, true);
                let id = format!("{conversation_id}-m{i:03}");
                let (sender, role) = if i % 2 == 0 {
                    ("owner-1", SenderRole::User)
                } else {
                    ("expert-1", SenderRole::Expert)
                };
                ChatMessage::new(id, conversation_id, sender, format!("message {i}"), sent_at)
                    .with_role(role)
            })
            .collect()
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for message lists and cache results.

    use super::*;
    use std::collections::HashSet;

    /// Assert that a list is ordered by `(sent_at, id)` with no repeated id.
    #[track_caller]
    pub fn assert_canonical<M: CachedMessage + std::fmt::Debug>(messages: &[M]) {
        assert_unique_ids(messages);
        for pair in messages.windows(2) {
            let a = (pair[0].sent_at_millis(), pair[0].id());
            let b = (pair[1].sent_at_millis(), pair[1].id());
            assert!(a < b, "Out of order: {:?} before {:?}", pair[0], pair[1]);
        }
    }

    /// Assert that no id appears twice.
    #[track_caller]
    pub fn assert_unique_ids<M: CachedMessage>(messages: &[M]) {
        let mut seen = HashSet::new();
        for message in messages {
            assert!(seen.insert(message.id()), "Duplicate id: {}", message.id());
        }
    }

    /// Assert that a list holds exactly `expected` ids, in that order.
    #[track_caller]
    pub fn assert_ids<M: CachedMessage>(messages: &[M], expected: &[&str]) {
        let actual: Vec<&str> = messages.iter().map(|m| m.id()).collect();
        assert_eq!(actual, expected, "Unexpected message ids");
    }

    /// Assert that a SprigResult is a quota error.
    #[track_caller]
    pub fn assert_quota_exceeded<T: std::fmt::Debug>(result: &SprigResult<T>) {
        match result {
            Err(SprigError::Storage(StorageError::QuotaExceeded { .. })) => {}
            other => panic!("Expected QuotaExceeded, got: {:?}", other),
        }
    }
}
