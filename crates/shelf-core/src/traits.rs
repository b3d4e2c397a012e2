//! Adapter traits for the two stores the catalog composes.
//!
//! - [`ProductStore`]: the authoritative relational record of products.
//! - [`SearchIndex`]: the full-text index holding one document per product.
//!
//! Both are object-safe and shared as `Arc<dyn ...>` across concurrent
//! requests; implementations provide their own concurrency control.

use async_trait::async_trait;

use crate::error::Result;
use crate::product::{NewProduct, Product, ProductDocument, ProductId};
use crate::query::{Highlight, Hit, PageRequest, SearchQuery};

/// Relational product store.
///
/// Every call is transactional on its own.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Insert a product and return the assigned id.
    ///
    /// Ids increase monotonically and are never reused.
    async fn insert(&self, product: &NewProduct) -> Result<ProductId>;

    /// Delete a product. Returns `false` if no row had that id.
    async fn delete_by_id(&self, id: ProductId) -> Result<bool>;

    /// Up to `limit` products after skipping `offset`, ordered by id.
    async fn find_page(&self, offset: usize, limit: usize) -> Result<Vec<Product>>;

    /// Store name for diagnostics.
    fn name(&self) -> &str;
}

/// Full-text search index of product documents.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Insert or replace the document with the given id.
    ///
    /// The write is visible to subsequent searches when this returns.
    async fn upsert(&self, id: &str, document: &ProductDocument) -> Result<()>;

    /// Remove the document with the given id. Absent ids are a no-op.
    async fn delete_by_id(&self, id: &str) -> Result<()>;

    /// Execute a query and return one page of hits in score order.
    ///
    /// When `highlight` is given, each hit carries fragments for the
    /// requested fields that the query matched.
    async fn search(
        &self,
        query: &SearchQuery,
        page: PageRequest,
        highlight: Option<&Highlight>,
    ) -> Result<Vec<Hit>>;

    /// Remove every document.
    async fn clear(&self) -> Result<()>;

    /// Backend name for diagnostics.
    fn name(&self) -> &str;
}
