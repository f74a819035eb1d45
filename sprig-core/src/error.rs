//! Error types for SPRIG operations

use thiserror::Error;

/// Storage backend errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Backend failure on {operation}: {reason}")]
    Backend { operation: String, reason: String },

    #[error("Storage quota exceeded writing {key}: {needed} bytes needed, {available} available")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },

    #[error("Serialization failed for {key}: {reason}")]
    Serialization { key: String, reason: String },

    #[error("Deserialization failed for {key}: {reason}")]
    Deserialization { key: String, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to parse config TOML: {reason}")]
    Parse { reason: String },
}

/// Errors raised by collaborators outside the cache (remote fetch, directory lookups).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Remote unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Request for conversation {conversation_id} failed: {reason}")]
    RequestFailed {
        conversation_id: String,
        reason: String,
    },

    #[error("Conversation directory lookup failed for user {user_id}: {reason}")]
    DirectoryLookup { user_id: String, reason: String },
}

/// Master error type for all SPRIG errors.
#[derive(Debug, Clone, Error)]
pub enum SprigError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
}

/// Result type alias for SPRIG operations.
pub type SprigResult<T> = Result<T, SprigError>;

// =============================================================================
// TESTS
// =============================================================================
