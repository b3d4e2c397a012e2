//! Error types for shelf-cli

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for shelf-cli operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in shelf-cli
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from the catalog
    #[error(transparent)]
    Core(#[from] shelf_core::Error),

    /// Configuration file could not be read
    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        /// File that was read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for [`ShelfConfig`](crate::config::ShelfConfig)
    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        /// File that was parsed
        path: PathBuf,
        /// Underlying parse error
        source: toml::de::Error,
    },

    /// Configuration could not be rendered
    #[error("Failed to render config: {0}")]
    ConfigRender(#[from] toml::ser::Error),

    /// Output could not be serialized
    #[error("Failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),

    /// I/O error outside configuration loading
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
