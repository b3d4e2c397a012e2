//! # shelf-cli
//!
//! The `shelf` binary: configuration loading, store and index wiring,
//! one-shot catalog commands, and the HTTP server.
//!
//! - [`cli`]: command-line arguments
//! - [`config`]: TOML configuration with command-line overrides
//! - [`commands`]: service wiring and command handlers
//! - [`http`]: axum routes over [`shelf::CatalogService`]

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod http;

pub use error::{Error, Result};
