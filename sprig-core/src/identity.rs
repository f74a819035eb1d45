//! Identity types for conversations, users and messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Epoch milliseconds, the unit every `sent_at` is compared in.
pub type EpochMillis = i64;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the raw identifier.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a conversation thread between a user and an expert.
    ///
    /// Opaque to the cache: backends hand these out and the cache only uses
    /// them to build storage keys.
    ConversationId
);

string_id!(
    /// Identifier of an application user.
    UserId
);

string_id!(
    /// Identifier of a single chat message, unique within its conversation.
    MessageId
);

impl MessageId {
    /// Mint a fresh identifier for a locally-composed message.
    ///
    /// UUIDv7 keeps drafts roughly ordered by creation time, which matters
    /// for the lexicographic tie-break when two drafts share a timestamp.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }
}
