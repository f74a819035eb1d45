//! Storage port and cache statistics.
//!
//! The message cache never talks to a concrete storage engine. Everything
//! goes through [`KeyValueStore`], a string-keyed, string-valued port that
//! mirrors what client-local storage offers on every platform.

use sprig_core::SprigResult;
use std::sync::Arc;

/// Key-value storage port.
///
/// Implementations must be thread-safe. Keys are independent: a write to
/// one key never affects another, and the last write to a key wins.
///
/// # Key Format
///
/// The cache only ever stores keys produced by `CacheKey`, but
/// implementations must not assume anything about key shape beyond
/// `keys_with_prefix` doing a plain byte-prefix match.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> SprigResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> SprigResult<()>;

    /// Remove `key`. Returns whether a value was present.
    fn delete(&self, key: &str) -> SprigResult<bool>;

    /// List every key starting with `prefix`.
    fn keys_with_prefix(&self, prefix: &str) -> SprigResult<Vec<String>>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> SprigResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> SprigResult<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> SprigResult<bool> {
        (**self).delete(key)
    }

    fn keys_with_prefix(&self, prefix: &str) -> SprigResult<Vec<String>> {
        (**self).keys_with_prefix(prefix)
    }
}

/// Statistics about local message cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Loads that found a readable entry.
    pub hits: u64,
    /// Loads that found nothing.
    pub misses: u64,
    /// Loads whose stored value was unreadable and was treated as empty.
    pub parse_failures: u64,
    /// Successful saves.
    pub writes: u64,
    /// Saves dropped because the backend refused them.
    pub write_failures: u64,
    /// Entries removed through invalidation.
    pub removals: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0). Parse failures count as misses.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.parse_failures;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
