//! Cache configuration.
//!
//! Settings come from three places, in increasing order of precedence:
//! built-in defaults, a TOML file, and `SPRIG_CACHE_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Default storage key namespace.
pub const DEFAULT_NAMESPACE: &str = "sprig";

/// Browsers typically cap local storage at 5 MiB per origin.
pub const DEFAULT_MEMORY_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Settings for the local message cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    /// Prefix of every storage key: `<namespace>:messages:<conversation>`.
    pub namespace: String,
    /// Directory of the LMDB environment. `None` keeps the cache in memory.
    pub lmdb_path: Option<PathBuf>,
    /// LMDB map size in MiB.
    pub lmdb_max_size_mb: usize,
    /// Byte quota for the in-memory store. `None` means unbounded.
    pub memory_quota_bytes: Option<usize>,
    /// Buffered invalidation events per subscriber before it lags.
    pub invalidation_channel_capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            lmdb_path: None,
            lmdb_max_size_mb: 64,
            memory_quota_bytes: Some(DEFAULT_MEMORY_QUOTA_BYTES),
            invalidation_channel_capacity: 64,
        }
    }
}

impl CacheSettings {
    /// Create settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Persist to an LMDB environment at `path`.
    pub fn with_lmdb_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lmdb_path = Some(path.into());
        self
    }

    /// Set the LMDB map size.
    pub fn with_lmdb_max_size_mb(mut self, size_mb: usize) -> Self {
        self.lmdb_max_size_mb = size_mb;
        self
    }

    /// Set (or lift, with `None`) the in-memory quota.
    pub fn with_memory_quota(mut self, quota_bytes: Option<usize>) -> Self {
        self.memory_quota_bytes = quota_bytes;
        self
    }

    /// Set the invalidation channel capacity.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.invalidation_channel_capacity = capacity;
        self
    }

    /// Parse settings from a TOML document. Missing keys take defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let settings: CacheSettings = toml::from_str(contents).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let settings = Self::from_toml_str(&contents)?.with_env_overrides()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Create settings from environment variables over the defaults.
    ///
    /// Environment variables:
    /// - `SPRIG_CACHE_NAMESPACE`: key namespace (default: "sprig")
    /// - `SPRIG_CACHE_LMDB_PATH`: LMDB directory (default: unset, in-memory)
    /// - `SPRIG_CACHE_LMDB_MAX_SIZE_MB`: LMDB map size (default: 64)
    /// - `SPRIG_CACHE_MEMORY_QUOTA_BYTES`: in-memory quota, "0" or "none" lifts it (default: 5 MiB)
    /// - `SPRIG_CACHE_CHANNEL_CAPACITY`: invalidation buffer (default: 64)
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings = Self::default().with_env_overrides()?;
        settings.validate()?;
        Ok(settings)
    }

    fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(namespace) = std::env::var("SPRIG_CACHE_NAMESPACE") {
            self.namespace = namespace.trim().to_string();
        }

        if let Ok(path) = std::env::var("SPRIG_CACHE_LMDB_PATH") {
            let path = path.trim();
            self.lmdb_path = if path.is_empty() {
                None
            } else {
                Some(PathBuf::from(path))
            };
        }

        if let Ok(size) = std::env::var("SPRIG_CACHE_LMDB_MAX_SIZE_MB") {
            self.lmdb_max_size_mb = parse_number("SPRIG_CACHE_LMDB_MAX_SIZE_MB", &size)?;
        }

        if let Ok(quota) = std::env::var("SPRIG_CACHE_MEMORY_QUOTA_BYTES") {
            let quota = quota.trim();
            self.memory_quota_bytes = if quota.eq_ignore_ascii_case("none") {
                None
            } else {
                match parse_number("SPRIG_CACHE_MEMORY_QUOTA_BYTES", quota)? {
                    0 => None,
                    bytes => Some(bytes),
                }
            };
        }

        if let Ok(capacity) = std::env::var("SPRIG_CACHE_CHANNEL_CAPACITY") {
            self.invalidation_channel_capacity =
                parse_number("SPRIG_CACHE_CHANNEL_CAPACITY", &capacity)?;
        }

        Ok(self)
    }

    /// Check the settings for values the cache cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "namespace".to_string(),
            });
        }
        if self.namespace.contains(':') {
            return Err(ConfigError::InvalidValue {
                field: "namespace".to_string(),
                value: self.namespace.clone(),
                reason: "must not contain ':'".to_string(),
            });
        }
        if self.lmdb_max_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "lmdb_max_size_mb".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.invalidation_channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "invalidation_channel_capacity".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_number(field: &str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        value: raw.to_string(),
        reason: "expected a non-negative integer".to_string(),
    })
}
