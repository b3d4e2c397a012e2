//! Wiring and one-shot command handlers.
//!
//! Every handler prints its result as pretty JSON on stdout. Index warnings
//! from writes go to stderr so the JSON stays parseable.

use std::sync::Arc;

use serde::Serialize;
use shelf::{CatalogService, CatalogWarning, SearchRequest};
use shelf_core::{NewProduct, ProductId, ProductStore, SearchIndex};
use shelf_fts::{AnalysisSettings, TantivyProductIndex};
use shelf_store::{MemoryProductStore, SqliteProductStore};

use crate::config::ShelfConfig;
use crate::error::Result;

/// Build the catalog service described by `config`.
///
/// The `memory` database pairs with an in-memory index; `index.path` is only
/// used with a SQLite database.
///
/// # Errors
///
/// Fails if the database cannot be opened, the analysis settings cannot be
/// loaded, or an existing index does not match the product schema.
pub async fn open_service(config: &ShelfConfig) -> Result<CatalogService> {
    let store: Arc<dyn ProductStore> = if config.database.is_memory() {
        tracing::info!("Using in-memory product store");
        Arc::new(MemoryProductStore::new())
    } else {
        tracing::info!(url = %config.database.url, "Connecting to product database");
        Arc::new(
            SqliteProductStore::connect(&config.database.url, config.database.max_connections)
                .await?,
        )
    };

    let settings = AnalysisSettings::resolve(config.index.settings.as_deref())?;
    let index = if config.database.is_memory() {
        // Index lifetime follows the store
        tracing::info!("Using in-memory search index");
        TantivyProductIndex::create_in_ram(&settings)?
    } else {
        let index_path = config.index.path.clone();
        tokio::task::spawn_blocking(move || {
            TantivyProductIndex::open_or_create(&index_path, &settings)
        })
        .await
        .map_err(|e| shelf_core::Error::index_with_source("Index startup task failed", e))??
    };
    tracing::info!(
        path = ?index.path(),
        documents = index.num_docs(),
        "Search index ready"
    );
    let index: Arc<dyn SearchIndex> = Arc::new(index);

    Ok(CatalogService::new(store, index))
}

/// `shelf list`
pub async fn list(service: &CatalogService, page: usize, size: usize) -> Result<()> {
    print_json(&service.list(page, size).await?)
}

/// `shelf create`
pub async fn create(service: &CatalogService, new: NewProduct) -> Result<()> {
    let created = service.create(new).await?;
    report_warnings(&created.warnings);
    print_json(&created.product)
}

/// `shelf delete`
pub async fn delete(service: &CatalogService, id: ProductId) -> Result<()> {
    let deleted = service.delete(id).await?;
    report_warnings(&deleted.warnings);
    if !deleted.existed {
        eprintln!("warning: product {id} did not exist");
    }
    print_json(&deleted)
}

/// `shelf suggest`
pub async fn suggest(service: &CatalogService, text: &str) -> Result<()> {
    print_json(&service.suggest(text).await?)
}

/// `shelf search`
pub async fn search(service: &CatalogService, request: &SearchRequest) -> Result<()> {
    print_json(&service.search(request).await?)
}

/// `shelf reindex`
pub async fn reindex(service: &CatalogService, batch_size: usize) -> Result<()> {
    let stats = service.reindex(batch_size).await?;
    tracing::info!(
        documents = stats.documents_indexed,
        pages = stats.pages,
        "Reindex complete"
    );
    print_json(&stats)
}

/// `shelf config`
pub fn show_config(config: &ShelfConfig) -> Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report_warnings(warnings: &[CatalogWarning]) {
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
}

// ============================================================================
// Tests
// ============================================================================
