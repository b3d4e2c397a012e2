//! Catalog service.
//!
//! The product store is authoritative and is always written first. The
//! search index is a derived view: when mirroring into it fails after the
//! store write succeeded, the operation still succeeds and carries a
//! [`CatalogWarning`]. [`CatalogService::reindex`] rebuilds the view.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shelf_core::schema::fields;
use shelf_core::{
    Error, NewProduct, PageRequest, Product, ProductDocument, ProductId, ProductStore, Result,
    SearchIndex, document_id,
};
use tokio_util::sync::CancellationToken;

use crate::queries::{SUGGEST_SIZE, SearchRequest, search_highlight, search_query, suggest_query};

/// A store write that succeeded while the index did not follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogWarning {
    /// The created product was not mirrored into the index.
    IndexMirror {
        /// Product id.
        id: ProductId,
        /// Index failure.
        message: String,
    },
    /// The deleted product may still be in the index.
    IndexDelete {
        /// Product id.
        id: ProductId,
        /// Index failure.
        message: String,
    },
    /// The request was cancelled while the index write was in flight.
    MirrorCancelled {
        /// Product id.
        id: ProductId,
    },
}

impl CatalogWarning {
    /// Id of the affected product.
    pub fn id(&self) -> ProductId {
        match self {
            CatalogWarning::IndexMirror { id, .. }
            | CatalogWarning::IndexDelete { id, .. }
            | CatalogWarning::MirrorCancelled { id } => *id,
        }
    }
}

impl fmt::Display for CatalogWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogWarning::IndexMirror { id, message } => {
                write!(f, "product {id} was saved but not indexed: {message}")
            }
            CatalogWarning::IndexDelete { id, message } => {
                write!(f, "product {id} was deleted but may remain in the index: {message}")
            }
            CatalogWarning::MirrorCancelled { id } => {
                write!(f, "product {id}: index write cancelled")
            }
        }
    }
}

/// Result of a create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Created {
    /// The persisted product.
    pub product: Product,
    /// Index problems that did not fail the create.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CatalogWarning>,
}

/// Result of a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deleted {
    /// Requested id.
    pub id: ProductId,
    /// Whether the store held a row with that id.
    pub existed: bool,
    /// Index problems that did not fail the delete.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CatalogWarning>,
}

/// Result of a reindex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReindexStats {
    /// Documents written to the index.
    pub documents_indexed: usize,
    /// Store pages read.
    pub pages: usize,
}

/// Orchestrates the product store and the search index.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn ProductStore>,
    index: Arc<dyn SearchIndex>,
}

impl CatalogService {
    /// Create a service over the given adapters.
    pub fn new(store: Arc<dyn ProductStore>, index: Arc<dyn SearchIndex>) -> Self {
        Self { store, index }
    }

    // ------------------------------------------------------------------------
    // Write path
    // ------------------------------------------------------------------------

    /// Validate and persist a product, then mirror it into the index.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if `new` breaks a product invariant
    /// - [`Error::Persistence`] if the store insert fails
    ///
    /// An index failure is reported in [`Created::warnings`].
    pub async fn create(&self, new: NewProduct) -> Result<Created> {
        self.create_cancellable(new, &CancellationToken::new()).await
    }

    /// [`create`](Self::create) that stops when `cancel` fires.
    ///
    /// Cancellation before the store insert completes fails with
    /// [`Error::Cancelled`]. Cancellation after it returns the product with
    /// [`CatalogWarning::MirrorCancelled`]; the index write may still land.
    pub async fn create_cancellable(
        &self,
        new: NewProduct,
        cancel: &CancellationToken,
    ) -> Result<Created> {
        new.validate()?;

        let id = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::cancelled("create")),
            id = self.store.insert(&new) => id?,
        };
        let product = Product::from_new(id, new);
        log::debug!("Stored product {id} in {}", self.store.name());

        let document = product.to_document();
        let mut warnings = Vec::new();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warnings.push(CatalogWarning::MirrorCancelled { id });
            }
            result = self.index.upsert(&document.id, &document) => {
                if let Err(e) = result {
                    warnings.push(CatalogWarning::IndexMirror { id, message: e.to_string() });
                }
            }
        }
        log_warnings(&warnings);

        Ok(Created { product, warnings })
    }

    /// Delete a product from the store, then from the index.
    ///
    /// Both deletes are attempted even if the first fails. Absent ids are a
    /// no-op in both stores.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the store delete fails. An index
    /// failure alone is reported in [`Deleted::warnings`].
    pub async fn delete(&self, id: ProductId) -> Result<Deleted> {
        let stored = self.store.delete_by_id(id).await;
        let indexed = self.index.delete_by_id(&document_id(id)).await;
        self.finish_delete(id, stored, indexed)
    }

    /// [`delete`](Self::delete) that stops when `cancel` fires.
    ///
    /// Cancellation before the store delete completes fails with
    /// [`Error::Cancelled`] and skips the index. Cancellation during the
    /// index delete returns with [`CatalogWarning::MirrorCancelled`].
    pub async fn delete_cancellable(
        &self,
        id: ProductId,
        cancel: &CancellationToken,
    ) -> Result<Deleted> {
        let stored = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::cancelled("delete")),
            stored = self.store.delete_by_id(id) => stored,
        };

        let doc_id = document_id(id);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let warnings = vec![CatalogWarning::MirrorCancelled { id }];
                log_warnings(&warnings);
                Ok(Deleted { id, existed: stored?, warnings })
            }
            indexed = self.index.delete_by_id(&doc_id) => self.finish_delete(id, stored, indexed),
        }
    }

    fn finish_delete(
        &self,
        id: ProductId,
        stored: Result<bool>,
        indexed: Result<()>,
    ) -> Result<Deleted> {
        let mut warnings = Vec::new();
        if let Err(e) = indexed {
            warnings.push(CatalogWarning::IndexDelete {
                id,
                message: e.to_string(),
            });
        }
        log_warnings(&warnings);

        let existed = stored?;
        if !existed {
            log::debug!("Delete of absent product {id}");
        }
        Ok(Deleted {
            id,
            existed,
            warnings,
        })
    }

    // ------------------------------------------------------------------------
    // Read path
    // ------------------------------------------------------------------------

    /// The `page`-th block of `size` products, ordered by id.
    ///
    /// Reads the store only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `page` or `size` is 0.
    pub async fn list(&self, page: usize, size: usize) -> Result<Vec<Product>> {
        let window = PageRequest::of(page, size)?;
        self.store.find_page(window.offset, window.size).await
    }

    /// Up to five product names completing `text`, best first.
    ///
    /// Blank input returns no suggestions without querying the index.
    pub async fn suggest(&self, text: &str) -> Result<Vec<String>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let hits = self
            .index
            .search(&suggest_query(text), PageRequest::first(SUGGEST_SIZE), None)
            .await
            .map_err(query_error)?;

        Ok(hits.into_iter().map(|hit| hit.document.name).collect())
    }

    /// One page of products matching `request`, best first.
    ///
    /// Each returned document's `name` is replaced by its first highlight
    /// fragment, if there is one.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for an invalid page window or price bound
    /// - [`Error::QueryExecution`] if the index fails the query
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<ProductDocument>> {
        let window = request.page_request()?;
        let highlight = search_highlight();

        let hits = self
            .index
            .search(&search_query(request), window, Some(&highlight))
            .await
            .map_err(query_error)?;

        Ok(hits
            .into_iter()
            .map(|hit| {
                let mut document = hit.document;
                if let Some(fragment) = hit.highlights.get(fields::NAME).and_then(|f| f.first()) {
                    document.name.clone_from(fragment);
                }
                document
            })
            .collect())
    }

    // ------------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------------

    /// Clear the index and mirror every stored product into it again.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if `batch_size` is 0
    /// - [`Error::Persistence`] if reading the store fails
    /// - [`Error::Index`] if clearing or writing the index fails
    pub async fn reindex(&self, batch_size: usize) -> Result<ReindexStats> {
        if batch_size == 0 {
            return Err(Error::validation_field("batch_size", "must be greater than 0"));
        }

        log::info!(
            "Reindexing {} from {}",
            self.index.name(),
            self.store.name()
        );
        self.index.clear().await?;

        let mut stats = ReindexStats::default();
        loop {
            let page = self
                .store
                .find_page(stats.documents_indexed, batch_size)
                .await?;
            if page.is_empty() {
                break;
            }
            stats.pages += 1;

            for product in &page {
                let document = product.to_document();
                self.index.upsert(&document.id, &document).await?;
                stats.documents_indexed += 1;
            }
            log::debug!(
                "Reindexed page {} ({} documents so far)",
                stats.pages,
                stats.documents_indexed
            );

            if page.len() < batch_size {
                break;
            }
        }

        log::info!(
            "Reindex complete: {} documents in {} pages",
            stats.documents_indexed,
            stats.pages
        );
        Ok(stats)
    }
}

impl fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogService")
            .field("store", &self.store.name())
            .field("index", &self.index.name())
            .finish()
    }
}

fn log_warnings(warnings: &[CatalogWarning]) {
    for warning in warnings {
        log::warn!("{warning}");
    }
}

/// Surface any index failure on the read path as a query error.
fn query_error(e: Error) -> Error {
    match e {
        Error::QueryExecution { .. } | Error::Cancelled { .. } | Error::Validation { .. } => e,
        other => Error::query_with_source("Search index failed", other),
    }
}

// ============================================================================
// Tests
// ============================================================================
