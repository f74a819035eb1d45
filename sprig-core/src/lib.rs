//! SPRIG Core - Chat Message Types
//!
//! Data types shared by every SPRIG crate: identifiers, the chat message
//! model and its caching contract, lenient timestamp parsing, errors and
//! cache settings. No storage or merge logic lives here.

pub mod config;
pub mod error;
pub mod identity;
pub mod message;
pub mod timestamp;

pub use config::{CacheSettings, DEFAULT_MEMORY_QUOTA_BYTES, DEFAULT_NAMESPACE};
pub use error::{ConfigError, FetchError, SprigError, SprigResult, StorageError};
pub use identity::{ConversationId, EpochMillis, MessageId, Timestamp, UserId};
pub use message::{Attachment, AttachmentKind, CachedMessage, ChatMessage, SenderRole};
pub use timestamp::{parse_sent_at, try_parse_sent_at};
