//! Storage port and backends for the local message cache.
//!
//! The cache persists one string value per conversation. This module defines
//! the [`KeyValueStore`] port those values go through, the [`CacheKey`]
//! scheme that addresses them, and two backends: an [`InMemoryStore`] that
//! behaves like browser local storage and an LMDB-backed [`LmdbStore`] for
//! durable on-disk caching.
//!
//! # Example
//!
//! ```ignore
//! let backend = InMemoryStore::with_quota_bytes(5 * 1024 * 1024);
//! let key = CacheKey::new("sprig", ConversationId::new("c1"));
//! backend.set(&key.encode(), "[]")?;
//! ```

pub mod cache_key;
pub mod lmdb_backend;
pub mod memory;
pub mod traits;

pub use cache_key::CacheKey;
pub use lmdb_backend::{LmdbStore, LmdbStoreError};
pub use memory::InMemoryStore;
pub use traits::{CacheStats, KeyValueStore};
