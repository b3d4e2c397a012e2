//! Full-text product index for Shelf.
//!
//! This crate implements [`shelf_core::SearchIndex`] on top of Tantivy. The
//! declarative [`shelf_core::IndexSchema`] is mapped onto a Tantivy schema,
//! analyzers are registered from a JSON settings document, and the abstract
//! [`shelf_core::SearchQuery`] tree is compiled into Tantivy queries.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      shelf-fts                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TantivyProductIndex (SearchIndex impl)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  AnalysisSettings (analyzer definitions, JSON)              │
//! │  TantivyMapping (schema paths -> Tantivy fields)            │
//! │  document (ProductDocument <-> TantivyDocument)             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  QueryCompiler (multi_match, term, range, bool)             │
//! │  highlight (fragments with pre/post tags)                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Product Mapping
//!
//! | Path | Kind | Analyzer |
//! |------|------|----------|
//! | `id` | keyword | |
//! | `name` | text | `products_name_analyzer` |
//! | `name.auto_complete` | search-as-you-type | `products_autocomplete_analyzer` |
//! | `name.auto_complete._2gram` | shingles of 2 | |
//! | `name.auto_complete._3gram` | shingles of 3 | |
//! | `description` | text | `products_description_analyzer` |
//! | `price` | integer | |
//! | `rating` | double | |
//! | `category` | text | `products_category_analyzer` |
//! | `category.raw` | keyword | |
//!
//! # Example
//!
//! ```rust,ignore
//! use shelf_core::{PageRequest, SearchIndex, SearchQuery};
//! use shelf_fts::{AnalysisSettings, TantivyProductIndex};
//!
//! let settings = AnalysisSettings::resolve(None)?;
//! let index = TantivyProductIndex::open_or_create(&data_dir, &settings)?;
//!
//! let hits = index
//!     .search(&SearchQuery::match_all(), PageRequest::first(10), None)
//!     .await?;
//! ```

pub mod document;
pub mod highlight;
pub mod index;
pub mod query;
pub mod schema;
pub mod settings;

// Re-exports
pub use index::TantivyProductIndex;
pub use query::{CompiledQuery, QueryCompiler};
pub use schema::TantivyMapping;
pub use settings::AnalysisSettings;
