//! LMDB-backed key-value store.
//!
//! Uses the heed crate (Rust bindings for LMDB) to give the message cache a
//! durable, memory-mapped home on platforms that have a filesystem.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The store uses:
//! - Read transactions for `get` and `keys_with_prefix`
//! - Write transactions for `set` and `delete`

use std::path::Path;

use heed::types::Str;
use heed::{Database, Env, EnvOpenOptions};
use sprig_core::{SprigError, SprigResult, StorageError};

use super::traits::KeyValueStore;

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// The map is full; LMDB's equivalent of a storage quota.
    #[error("LMDB map full")]
    MapFull,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<heed::Error> for LmdbStoreError {
    fn from(e: heed::Error) -> Self {
        match e {
            heed::Error::Mdb(heed::MdbError::MapFull) => LmdbStoreError::MapFull,
            other => LmdbStoreError::Transaction(other.to_string()),
        }
    }
}

impl From<LmdbStoreError> for SprigError {
    fn from(e: LmdbStoreError) -> Self {
        SprigError::Storage(StorageError::Backend {
            operation: "lmdb".to_string(),
            reason: e.to_string(),
        })
    }
}

/// Durable [`KeyValueStore`] on top of an LMDB environment.
///
/// # Example
///
/// ```ignore
/// use sprig_cache::{LmdbStore, LocalMessageStore};
///
/// let backend = LmdbStore::open("/var/lib/sprig/cache", 64)?;
/// let store = LocalMessageStore::new(backend, "sprig");
/// ```
pub struct LmdbStore {
    env: Env,
    db: Database<Str, Str>,
}

impl LmdbStore {
    /// Open (or create) an LMDB store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the map in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the
    /// environment or database cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment is opened once per directory by this process
        // and never through another mapping of the same files.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn()?;
        let db: Database<Str, Str> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;
        wtxn.commit()?;

        Ok(Self { env, db })
    }

    fn read(&self, key: &str) -> Result<Option<String>, LmdbStoreError> {
        let rtxn = self.env.read_txn()?;
        let value = self.db.get(&rtxn, key)?.map(str::to_string);
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), LmdbStoreError> {
        let mut wtxn = self.env.write_txn()?;
        self.db.put(&mut wtxn, key, value)?;
        wtxn.commit()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, LmdbStoreError> {
        let mut wtxn = self.env.write_txn()?;
        let deleted = self.db.delete(&mut wtxn, key)?;
        wtxn.commit()?;
        Ok(deleted)
    }

    fn scan(&self, prefix: &str) -> Result<Vec<String>, LmdbStoreError> {
        let rtxn = self.env.read_txn()?;
        let mut keys = Vec::new();
        for result in self.db.iter(&rtxn)? {
            match result {
                Ok((key, _)) if key.starts_with(prefix) => keys.push(key.to_string()),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable LMDB entry");
                }
            }
        }
        Ok(keys)
    }
}

impl KeyValueStore for LmdbStore {
    fn get(&self, key: &str) -> SprigResult<Option<String>> {
        Ok(self.read(key)?)
    }

    fn set(&self, key: &str, value: &str) -> SprigResult<()> {
        match self.write(key, value) {
            Err(LmdbStoreError::MapFull) => Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                needed: key.len() + value.len(),
                available: 0,
            }
            .into()),
            other => Ok(other?),
        }
    }

    fn delete(&self, key: &str) -> SprigResult<bool> {
        Ok(self.remove(key)?)
    }

    fn keys_with_prefix(&self, prefix: &str) -> SprigResult<Vec<String>> {
        Ok(self.scan(prefix)?)
    }
}
