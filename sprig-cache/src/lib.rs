//! SPRIG Cache - Local Conversation Message Cache
//!
//! Keeps each conversation's messages on the device so a chat screen can
//! render instantly and keep working offline, then folds in the
//! authoritative batch from the backend when it arrives.
//!
//! - [`backend`]: the [`KeyValueStore`] port plus in-memory and LMDB backends
//! - [`store`]: per-conversation load/save that never fails
//! - [`merge`]: dedupe-by-id and time-ordered merge of two message lists
//! - [`invalidation`]: conversation, user and namespace-wide invalidation
//! - [`bus`]: publish/subscribe delivery of invalidation requests
//! - [`reconciler`]: the cache-then-network flow tying the above together

pub mod backend;
pub mod bus;
pub mod invalidation;
pub mod merge;
pub mod reconciler;
pub mod store;

pub use backend::{CacheKey, CacheStats, InMemoryStore, KeyValueStore, LmdbStore, LmdbStoreError};
pub use bus::{InvalidationBus, InvalidationEvent, InvalidationListener, InvalidationReason};
pub use invalidation::{CacheInvalidator, ConversationDirectory, InvalidationScope};
pub use merge::{compare_messages, dedupe_sorted, merge_messages, sort_messages};
pub use reconciler::{ConversationReconciler, MessageFetcher, Refresh, RefreshSource};
pub use store::{LocalMessageStore, SharedMessageStore};
