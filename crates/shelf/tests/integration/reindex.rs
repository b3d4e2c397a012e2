//! Rebuilding the index from the store, and persistent adapters.

use std::sync::Arc;

use shelf::{CatalogService, ReindexStats, SearchRequest};
use shelf_core::{Error, ProductStore, SearchIndex};
use shelf_fts::{AnalysisSettings, TantivyProductIndex};
use shelf_store::SqliteProductStore;

use crate::common::{BrokenStore, FaultyIndex, Faults, TestHarness, ids, product};

#[tokio::test]
async fn test_reindex_repairs_missed_mirrors() {
    let harness = TestHarness::with_index(|index| {
        FaultyIndex::new(
            index,
            Faults {
                upsert: true,
                ..Faults::default()
            },
        )
    });
    for name in ["Red Shoe", "Blue Hat", "Green Scarf", "Apple Pie", "Banana"] {
        let created = harness
            .service
            .create(product(name, "", 10, "misc"))
            .await
            .unwrap();
        assert_eq!(created.warnings.len(), 1);
    }
    assert_eq!(harness.index.num_docs(), 0);

    // Rebuild through a working index over the same store
    let repaired = CatalogService::new(harness.store.clone(), harness.index.clone());
    let stats = repaired.reindex(2).await.unwrap();

    assert_eq!(
        stats,
        ReindexStats {
            documents_indexed: 5,
            pages: 3
        }
    );
    assert_eq!(harness.index.num_docs(), 5);
    assert_eq!(repaired.suggest("ban").await.unwrap(), vec!["Banana"]);
}

#[tokio::test]
async fn test_reindex_drops_orphaned_documents() {
    let harness = TestHarness::new();
    harness.seed(vec![product("Red Shoe", "", 100, "shoes")]).await;
    harness
        .index
        .upsert(
            "999",
            &shelf_core::ProductDocument {
                id: "999".to_string(),
                name: "Ghost".to_string(),
                description: None,
                price: 1,
                rating: None,
                category: "none".to_string(),
            },
        )
        .await
        .unwrap();

    let stats = harness.service.reindex(10).await.unwrap();

    assert_eq!(stats.documents_indexed, 1);
    assert_eq!(stats.pages, 1);
    assert_eq!(harness.index.num_docs(), 1);
}

#[tokio::test]
async fn test_reindex_of_empty_store() {
    let harness = TestHarness::new();
    let stats = harness.service.reindex(10).await.unwrap();
    assert_eq!(stats, ReindexStats::default());
}

#[tokio::test]
async fn test_reindex_store_failure() {
    let harness = TestHarness::with_store(Arc::new(BrokenStore { stall: false }));
    let err = harness.service.reindex(10).await.unwrap_err();
    assert!(matches!(err, Error::Persistence { .. }));
}

#[tokio::test]
async fn test_sqlite_store_with_on_disk_index() {
    let temp_dir = tempfile::tempdir().unwrap();
    let settings = AnalysisSettings::embedded().unwrap();
    let url = format!("sqlite://{}", temp_dir.path().join("shelf.db").display());

    let first_id = {
        let store: Arc<dyn ProductStore> = Arc::new(SqliteProductStore::connect(&url, 2).await.unwrap());
        let index: Arc<dyn SearchIndex> =
            Arc::new(TantivyProductIndex::open_or_create(temp_dir.path(), &settings).unwrap());
        let service = CatalogService::new(store, index);

        let created = service
            .create(product("Red Shoe", "blue", 100, "shoes"))
            .await
            .unwrap();
        service
            .create(product("Blue Hat", "red shoe", 50, "hats"))
            .await
            .unwrap();
        created.product.id
    };

    // Both stores survive a restart
    let store: Arc<dyn ProductStore> = Arc::new(SqliteProductStore::connect(&url, 2).await.unwrap());
    let index: Arc<dyn SearchIndex> =
        Arc::new(TantivyProductIndex::open_or_create(temp_dir.path(), &settings).unwrap());
    let service = CatalogService::new(store, index);

    assert_eq!(service.list(1, 10).await.unwrap().len(), 2);
    let found = service
        .search(&SearchRequest::new("red shoe"))
        .await
        .unwrap();
    assert_eq!(ids(&found)[0], first_id.to_string());
    assert_eq!(found[0].name, "<b>Red</b> <b>Shoe</b>");
}
