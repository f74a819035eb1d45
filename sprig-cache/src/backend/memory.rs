//! In-memory key-value store.
//!
//! Behaves like browser local storage: string keys and values, an optional
//! byte quota that rejects oversized writes, and a switch that makes every
//! write fail the way storage does in private browsing modes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use sprig_core::{SprigResult, StorageError};

use super::traits::KeyValueStore;

/// Thread-safe in-memory [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
    writes_disabled: AtomicBool,
}

impl InMemoryStore {
    /// Create an unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that refuses writes once keys plus values exceed `quota_bytes`.
    pub fn with_quota_bytes(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    /// Make every subsequent `set` fail (or succeed again).
    pub fn set_writes_disabled(&self, disabled: bool) {
        self.writes_disabled.store(disabled, Ordering::SeqCst);
    }

    /// Bytes currently used by keys and values.
    pub fn used_bytes(&self) -> usize {
        self.entries
            .read()
            .map(|entries| entries.iter().map(|(k, v)| k.len() + v.len()).sum())
            .unwrap_or(0)
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> SprigResult<Option<String>> {
        let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> SprigResult<()> {
        if self.writes_disabled.load(Ordering::SeqCst) {
            return Err(StorageError::Backend {
                operation: "set".to_string(),
                reason: "storage is not writable".to_string(),
            }
            .into());
        }

        let mut entries = self.entries.write().map_err(|_| StorageError::LockPoisoned)?;

        if let Some(quota) = self.quota_bytes {
            let used: usize = entries.iter().map(|(k, v)| k.len() + v.len()).sum();
            let replaced = entries.get(key).map(|old| key.len() + old.len()).unwrap_or(0);
            let needed = key.len() + value.len();
            let available = quota.saturating_sub(used - replaced);
            if needed > available {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    available,
                }
                .into());
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> SprigResult<bool> {
        let mut entries = self.entries.write().map_err(|_| StorageError::LockPoisoned)?;
        Ok(entries.remove(key).is_some())
    }

    fn keys_with_prefix(&self, prefix: &str) -> SprigResult<Vec<String>> {
        let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;
        let mut keys: Vec<String> = entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprig_core::SprigError;

    #[test]
    fn test_set_get_delete() {
        let store = InMemoryStore::new();
        store.set("k", "v").expect("set should succeed");
        assert_eq!(store.get("k").expect("get should succeed"), Some("v".to_string()));

        assert!(store.delete("k").expect("delete should succeed"));
        assert!(!store.delete("k").expect("delete should succeed"));
        assert_eq!(store.get("k").expect("get should succeed"), None);
    }

    #[test]
    fn test_overwrite() {
        let store = InMemoryStore::new();
        store.set("k", "one").expect("set should succeed");
        store.set("k", "two").expect("set should succeed");
        assert_eq!(store.get("k").expect("get should succeed"), Some("two".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_keys_with_prefix_sorted() {
        let store = InMemoryStore::new();
        store.set("a:messages:2", "[]").expect("set should succeed");
        store.set("a:messages:1", "[]").expect("set should succeed");
        store.set("a:settings", "{}").expect("set should succeed");
        store.set("b:messages:1", "[]").expect("set should succeed");

        let keys = store.keys_with_prefix("a:messages:").expect("scan should succeed");
        assert_eq!(keys, vec!["a:messages:1", "a:messages:2"]);
    }

    #[test]
    fn test_quota_rejects_oversized_write() {
        let store = InMemoryStore::with_quota_bytes(10);
        store.set("k", "12345").expect("fits in quota");
        assert_eq!(store.used_bytes(), 6);

        let err = store.set("j", "123456").expect_err("exceeds quota");
        assert!(matches!(
            err,
            SprigError::Storage(StorageError::QuotaExceeded { needed: 7, available: 4, .. })
        ));
        assert_eq!(store.get("j").expect("get should succeed"), None);
    }

    #[test]
    fn test_quota_accounts_for_replaced_value() {
        let store = InMemoryStore::with_quota_bytes(10);
        store.set("k", "123456789").expect("fits in quota");
        // Replacing the only entry frees its bytes first
        store.set("k", "987654321").expect("replacement fits");
    }

    #[test]
    fn test_writes_disabled() {
        let store = InMemoryStore::new();
        store.set_writes_disabled(true);
        assert!(store.set("k", "v").is_err());

        store.set_writes_disabled(false);
        assert!(store.set("k", "v").is_ok());
    }
}
