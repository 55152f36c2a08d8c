//! Locator configuration
//!
//! Loaded from JSON:
//!
//! ```json
//! {
//!   "database_path": "/var/lib/geo/IP2LOCATION-LITE-DB11.BIN",
//!   "use_memory_map": true,
//!   "cache_capacity": 10000
//! }
//! ```
//!
//! Only `database_path` is required.

use crate::database::{Database, DatabaseOpener, DEFAULT_CACHE_CAPACITY};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Where the database lives and how to open it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorConfig {
    pub database_path: PathBuf,
    #[serde(default = "default_use_memory_map")]
    pub use_memory_map: bool,
    /// Per-thread query cache entries; 0 disables the cache
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_use_memory_map() -> bool {
    true
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

impl LocatorConfig {
    /// Defaults for a database at `path`
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        LocatorConfig {
            database_path: database_path.into(),
            use_memory_map: default_use_memory_map(),
            cache_capacity: default_cache_capacity(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Database opener carrying these settings
    pub fn opener(&self) -> DatabaseOpener {
        Database::from(&self.database_path)
            .memory_map(self.use_memory_map)
            .cache_capacity(self.cache_capacity)
    }
}
