//! Datastore configuration
//!
//! Loaded from TOML. Every knob except `database_path` has a default.
//!
//! ```toml
//! database_path = "/var/lib/relstore/relstore.db"
//! max_tuples_per_write = 100
//! batch_size = 50
//! busy_timeout_ms = 5000
//! changelog_horizon_offset_ms = 1000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use relstore_core::errors::{ExError, ExErrorKind};
use serde::Deserialize;
use thiserror::Error;

use crate::errors::Result;

pub const DEFAULT_MAX_TUPLES_PER_WRITE: usize = 100;
pub const DEFAULT_MAX_TYPES_PER_AUTHORIZATION_MODEL: usize = 100;
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Largest accepted `batch_size`
///
/// A batch becomes one OR term per key in the locking SELECT and DELETE,
/// which SQLite nests one expression level deep each (depth cap 1000), and
/// ten bound parameters per row in the multi-row INSERT (cap 32766).
pub const MAX_BATCH_SIZE: usize = 500;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {message}")]
    Parse { message: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl From<ConfigError> for ExError {
    fn from(err: ConfigError) -> Self {
        ExError::new(ExErrorKind::Config)
            .with_op("load_config")
            .with_message(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    pub database_path: PathBuf,
    #[serde(default = "default_max_tuples_per_write")]
    pub max_tuples_per_write: usize,
    #[serde(default = "default_max_types_per_authorization_model")]
    pub max_types_per_authorization_model: usize,
    /// Keys per locking SELECT, DELETE and multi-row INSERT
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// How long a writer waits for another writer's lock
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Changelog entries younger than this are not returned
    #[serde(default)]
    pub changelog_horizon_offset_ms: u64,
}

fn default_max_tuples_per_write() -> usize {
    DEFAULT_MAX_TUPLES_PER_WRITE
}

fn default_max_types_per_authorization_model() -> usize {
    DEFAULT_MAX_TYPES_PER_AUTHORIZATION_MODEL
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl StoreConfig {
    /// Defaults for everything but the database path
    pub fn for_path(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            max_tuples_per_write: DEFAULT_MAX_TUPLES_PER_WRITE,
            max_types_per_authorization_model: DEFAULT_MAX_TYPES_PER_AUTHORIZATION_MODEL,
            batch_size: DEFAULT_BATCH_SIZE,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            changelog_horizon_offset_ms: 0,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_tuples_per_write(mut self, max: usize) -> Self {
        self.max_tuples_per_write = max;
        self
    }

    pub fn with_changelog_horizon_offset(mut self, offset: Duration) -> Self {
        self.changelog_horizon_offset_ms = u64::try_from(offset.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// # Errors
    ///
    /// `Config` on malformed TOML, unknown keys or invalid values.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: StoreConfig = toml::from_str(s).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// `Io` if the file cannot be read, otherwise as [`StoreConfig::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| crate::errors::io_error("load_config", e))?;
        Self::from_toml_str(&contents)
    }

    /// # Errors
    ///
    /// `InvalidValue` when a size limit is zero, the batch size exceeds
    /// [`MAX_BATCH_SIZE`] or the path is empty.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "batch_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "batch_size",
                reason: format!("must be at most {}", MAX_BATCH_SIZE),
            });
        }
        if self.max_tuples_per_write == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_tuples_per_write",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_types_per_authorization_model == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_types_per_authorization_model",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "database_path",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn changelog_horizon_offset(&self) -> Duration {
        Duration::from_millis(self.changelog_horizon_offset_ms)
    }
}
