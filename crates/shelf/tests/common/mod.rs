//! Common test utilities and harness for Shelf integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use shelf::CatalogService;
use shelf_core::{
    Error, Highlight, Hit, NewProduct, PageRequest, Product, ProductDocument, ProductId,
    ProductStore, Result, SearchIndex, SearchQuery,
};
use shelf_fts::{AnalysisSettings, TantivyProductIndex};
use shelf_store::MemoryProductStore;

/// Test harness for integration tests.
///
/// Wires a [`CatalogService`] to an in-memory store and an in-RAM index,
/// keeping handles to both so tests can inspect them directly.
pub struct TestHarness {
    /// Product store
    pub store: Arc<MemoryProductStore>,
    /// Search index
    pub index: Arc<TantivyProductIndex>,
    /// Service under test
    pub service: CatalogService,
}

impl TestHarness {
    /// Creates a harness with working adapters.
    pub fn new() -> Self {
        let store = Arc::new(MemoryProductStore::new());
        let index = Arc::new(
            TantivyProductIndex::create_in_ram(&AnalysisSettings::embedded().unwrap()).unwrap(),
        );
        let service = CatalogService::new(store.clone(), index.clone());
        Self {
            store,
            index,
            service,
        }
    }

    /// Creates a harness whose service writes through a different index.
    ///
    /// `wrap` receives the harness's real index.
    pub fn with_index<F>(wrap: F) -> Self
    where
        F: FnOnce(Arc<TantivyProductIndex>) -> Arc<dyn SearchIndex>,
    {
        let mut harness = Self::new();
        let index = wrap(harness.index.clone());
        harness.service = CatalogService::new(harness.store.clone(), index);
        harness
    }

    /// Creates a harness whose service uses a different store.
    pub fn with_store(store: Arc<dyn ProductStore>) -> Self {
        let mut harness = Self::new();
        harness.service = CatalogService::new(store, harness.index.clone());
        harness
    }

    /// Creates each product, asserting no warnings.
    pub async fn seed(&self, products: Vec<NewProduct>) -> Vec<Product> {
        let mut created = Vec::with_capacity(products.len());
        for product in products {
            let result = self.service.create(product).await.unwrap();
            assert!(result.warnings.is_empty(), "{:?}", result.warnings);
            created.push(result.product);
        }
        created
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper to build a product with a description.
pub fn product(name: &str, description: &str, price: i64, category: &str) -> NewProduct {
    NewProduct::new(name, price, category).description(description)
}

/// The two products of the ranking scenarios.
pub fn red_shoe_and_blue_hat() -> Vec<NewProduct> {
    vec![
        product("Red Shoe", "blue", 100, "shoes"),
        product("Blue Hat", "red shoe", 50, "hats"),
    ]
}

/// Ids of `documents`.
pub fn ids(documents: &[ProductDocument]) -> Vec<String> {
    documents.iter().map(|d| d.id.clone()).collect()
}

// ============================================================================
// Fault-injecting adapters
// ============================================================================

/// Which index calls fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    /// Fail `upsert`
    pub upsert: bool,
    /// Fail `delete_by_id`
    pub delete: bool,
    /// Fail `search`
    pub search: bool,
}

/// Index that delegates to a real one, failing the selected calls.
pub struct FaultyIndex {
    inner: Arc<TantivyProductIndex>,
    faults: Faults,
    /// Number of calls that reached this index
    pub calls: AtomicUsize,
}

impl FaultyIndex {
    /// Wrap `inner`, failing the calls selected by `faults`.
    pub fn new(inner: Arc<TantivyProductIndex>, faults: Faults) -> Arc<Self> {
        Arc::new(Self {
            inner,
            faults,
            calls: AtomicUsize::new(0),
        })
    }

    /// Number of calls seen.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchIndex for FaultyIndex {
    async fn upsert(&self, id: &str, document: &ProductDocument) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.faults.upsert {
            return Err(Error::index("injected upsert failure"));
        }
        self.inner.upsert(id, document).await
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.faults.delete {
            return Err(Error::index("injected delete failure"));
        }
        self.inner.delete_by_id(id).await
    }

    async fn search(
        &self,
        query: &SearchQuery,
        page: PageRequest,
        highlight: Option<&Highlight>,
    ) -> Result<Vec<Hit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.faults.search {
            return Err(Error::index("injected search failure"));
        }
        self.inner.search(query, page, highlight).await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }

    fn name(&self) -> &str {
        "faulty"
    }
}

/// Index whose writes never complete.
pub struct StalledIndex;

#[async_trait]
impl SearchIndex for StalledIndex {
    async fn upsert(&self, _id: &str, _document: &ProductDocument) -> Result<()> {
        std::future::pending().await
    }

    async fn delete_by_id(&self, _id: &str) -> Result<()> {
        std::future::pending().await
    }

    async fn search(
        &self,
        _query: &SearchQuery,
        _page: PageRequest,
        _highlight: Option<&Highlight>,
    ) -> Result<Vec<Hit>> {
        Ok(Vec::new())
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "stalled"
    }
}

/// Store whose calls all fail, or never complete when `stall` is set.
pub struct BrokenStore {
    /// Hang instead of failing
    pub stall: bool,
}

impl BrokenStore {
    async fn fail<T>(&self) -> Result<T> {
        if self.stall {
            std::future::pending::<()>().await;
        }
        Err(Error::persistence("injected store failure"))
    }
}

#[async_trait]
impl ProductStore for BrokenStore {
    async fn insert(&self, _product: &NewProduct) -> Result<ProductId> {
        self.fail().await
    }

    async fn delete_by_id(&self, _id: ProductId) -> Result<bool> {
        self.fail().await
    }

    async fn find_page(&self, _offset: usize, _limit: usize) -> Result<Vec<Product>> {
        self.fail().await
    }

    fn name(&self) -> &str {
        "broken"
    }
}
