//! Shelf Core: shared types, traits, errors, and the query DSL.
//!
//! This crate has no internal Shelf dependencies. The store and index
//! adapters, and the catalog service, all build on it.
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`product`]: Product record and its search document mirror
//! - [`schema`]: Explicit index schema value
//! - [`query`]: Backend-agnostic query DSL, paging, and highlighting
//! - [`traits`]: `ProductStore` and `SearchIndex` adapter traits

#![forbid(unsafe_code)]

pub mod error;
pub mod product;
pub mod query;
pub mod schema;
pub mod traits;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};
pub use product::{NewProduct, Product, ProductDocument, ProductId, document_id};
pub use query::{Highlight, Hit, MAX_RESULT_WINDOW, PageRequest, SearchQuery};
pub use schema::IndexSchema;
pub use traits::{ProductStore, SearchIndex};
