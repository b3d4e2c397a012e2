//! Shelf configuration.
//!
//! Loaded from a TOML file; every section and key is optional:
//!
//! ```toml
//! [database]
//! url = "sqlite://shelf.db"   # or "memory"
//! max_connections = 5
//!
//! [index]
//! path = "shelf-index"
//! settings = "product-settings.json"   # defaults to the embedded settings
//!
//! [server]
//! bind = "127.0.0.1:8080"
//! ```
//!
//! A missing file yields the defaults. Command-line flags (and their
//! `SHELF_*` environment variables) override individual keys.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shelf_store::DEFAULT_MAX_CONNECTIONS;

use crate::error::{Error, Result};

/// Database URL selecting the in-memory product store.
pub const MEMORY_DATABASE_URL: &str = "memory";

/// Resolved configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShelfConfig {
    /// Product store.
    pub database: DatabaseConfig,
    /// Search index.
    pub index: IndexConfig,
    /// HTTP server.
    pub server: ServerConfig,
}

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite URL, or `memory`.
    pub url: String,
    /// Connection pool size.
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://shelf.db".to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl DatabaseConfig {
    /// Whether the in-memory store is selected.
    pub fn is_memory(&self) -> bool {
        self.url == MEMORY_DATABASE_URL
    }
}

/// `[index]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory holding the index directories (SQLite databases only).
    pub path: PathBuf,
    /// Analysis settings file; the embedded settings when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<PathBuf>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("shelf-index"),
            settings: None,
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Per-key overrides from the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `database.url`
    pub database_url: Option<String>,
    /// `index.path`
    pub index_path: Option<PathBuf>,
    /// `index.settings`
    pub index_settings: Option<PathBuf>,
    /// `server.bind`
    pub bind: Option<String>,
}

impl ShelfConfig {
    /// Load from `path`, or return the defaults if there is no file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(url) = overrides.database_url {
            self.database.url = url;
        }
        if let Some(path) = overrides.index_path {
            self.index.path = path;
        }
        if let Some(settings) = overrides.index_settings {
            self.index.settings = Some(settings);
        }
        if let Some(bind) = overrides.bind {
            self.server.bind = bind;
        }
        self
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
