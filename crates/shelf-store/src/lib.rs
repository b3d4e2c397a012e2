//! # shelf-store
//!
//! Relational product store adapters for Shelf.
//!
//! This crate provides two [`ProductStore`](shelf_core::ProductStore)
//! implementations:
//! - [`SqliteProductStore`]: SQLite database via `sqlx`
//! - [`MemoryProductStore`]: in-process map (for testing)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod memory;
pub mod sqlite;

pub use memory::MemoryProductStore;
pub use sqlite::{DEFAULT_MAX_CONNECTIONS, SqliteProductStore};
