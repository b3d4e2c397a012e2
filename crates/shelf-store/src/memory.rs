//! In-memory product store.
//!
//! Behaves like the SQLite store (monotonic ids starting at 1, id-ordered
//! pages) without any I/O. Used by tests and by `--database-url memory`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use shelf_core::{NewProduct, Product, ProductId, ProductStore, Result};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct State {
    last_id: ProductId,
    rows: BTreeMap<ProductId, Product>,
}

/// Product store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryProductStore {
    state: RwLock<State>,
}

impl MemoryProductStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored products.
    pub async fn len(&self) -> usize {
        self.state.read().await.rows.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.rows.is_empty()
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn insert(&self, product: &NewProduct) -> Result<ProductId> {
        let mut state = self.state.write().await;
        state.last_id += 1;
        let id = state.last_id;
        state.rows.insert(id, Product::from_new(id, product.clone()));
        Ok(id)
    }

    async fn delete_by_id(&self, id: ProductId) -> Result<bool> {
        Ok(self.state.write().await.rows.remove(&id).is_some())
    }

    async fn find_page(&self, offset: usize, limit: usize) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        Ok(state.rows.values().skip(offset).take(limit).cloned().collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
