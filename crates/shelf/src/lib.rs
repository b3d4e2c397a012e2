//! Shelf catalog service.
//!
//! [`CatalogService`] composes the authoritative [`ProductStore`] with the
//! derived [`SearchIndex`]:
//!
//! - **create** validates, inserts into the store, then mirrors the product
//!   into the index. A failed mirror is reported as a [`CatalogWarning`],
//!   never as a failure.
//! - **delete** removes from the store, then from the index.
//! - **list** pages through the store only.
//! - **suggest** and **search** query the index only.
//! - **reindex** rebuilds the index from the store.
//!
//! The query shapes used by suggest and search live in [`queries`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shelf::{CatalogService, SearchRequest};
//! use shelf_core::NewProduct;
//!
//! let service = CatalogService::new(Arc::new(store), Arc::new(index));
//!
//! let created = service
//!     .create(NewProduct::new("Red Shoe", 100, "shoes"))
//!     .await?;
//! let hits = service.search(&SearchRequest::new("red")).await?;
//! ```
//!
//! [`ProductStore`]: shelf_core::ProductStore
//! [`SearchIndex`]: shelf_core::SearchIndex

pub mod queries;
pub mod service;

pub use queries::SearchRequest;
pub use service::{CatalogService, CatalogWarning, Created, Deleted, ReindexStats};

pub use shelf_core as core;
