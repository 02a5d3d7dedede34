//! Configuration file (`config.toml`) and inspection policy.
//!
//! ```toml
//! allow = ["png", "jpeg", "zip"]
//!
//! [policy]
//! max_archive_entries = 10000
//! max_entry_bytes = 67108864
//! max_archive_depth = 2
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

use crate::signature::TypeTag;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "FILEGATE_CONFIG";

/// Default cap on the number of entries inspected in one archive
pub const DEFAULT_MAX_ARCHIVE_ENTRIES: usize = 10_000;

/// Default cap on how much of a single entry is read (64 MB)
pub const DEFAULT_MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

/// Default nesting limit; the outer archive is depth 1
pub const DEFAULT_MAX_ARCHIVE_DEPTH: u8 = 2;

/// Failure to load a config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid config TOML
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        /// Config file path
        path: PathBuf,
        /// Underlying TOML error
        #[source]
        source: toml::de::Error,
    },
}

/// Limits applied while inspecting archives.
///
/// Anything beyond a limit is rejected, never skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Policy {
    /// Archives with more entries than this are rejected outright.
    pub max_archive_entries: usize,
    /// Largest entry whose full content will be read for a script/nested check.
    pub max_entry_bytes: u64,
    /// Deepest archive nesting that will be opened (outer archive = 1).
    /// Zero rejects every archive.
    pub max_archive_depth: u8,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            max_archive_entries: DEFAULT_MAX_ARCHIVE_ENTRIES,
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
            max_archive_depth: DEFAULT_MAX_ARCHIVE_DEPTH,
        }
    }
}

impl Policy {
    /// Override the entry-count limit.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_archive_entries = max;
        self
    }

    /// Override the per-entry read limit.
    pub fn with_max_entry_bytes(mut self, max: u64) -> Self {
        self.max_entry_bytes = max;
        self
    }

    /// Override the nesting limit.
    pub fn with_max_depth(mut self, max: u8) -> Self {
        self.max_archive_depth = max;
        self
    }
}

/// Parsed `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Types accepted when the caller does not pass its own list.
    pub allow: BTreeSet<TypeTag>,
    /// Archive inspection limits.
    pub policy: Policy,
}

impl Config {
    /// Config path: `$FILEGATE_CONFIG`, else `<config_dir>/filegate/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(val) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(val));
        }
        dirs::config_dir().map(|d| d.join("filegate").join("config.toml"))
    }

    /// Parse a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML, unknown keys, or
    /// unknown type tags.
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        Self::from_toml(&content, path)
    }

    /// Load the config at `path`, or at [`Config::default_path`] when `None`.
    ///
    /// An explicit path must exist. A missing default file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub async fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path).await;
        }

        match Self::default_path() {
            Some(path) if path.exists() => {
                debug!("Loading config from {}", path.display());
                Self::load(&path).await
            }
            _ => Ok(Self::default()),
        }
    }
}
