//! Store and index failures, warnings, and cancellation.

use std::sync::Arc;
use std::time::Duration;

use shelf::{CatalogService, CatalogWarning, SearchRequest};
use shelf_core::{Error, ProductStore, SearchIndex};
use shelf_store::MemoryProductStore;
use tokio_util::sync::CancellationToken;

use crate::common::{BrokenStore, FaultyIndex, Faults, StalledIndex, TestHarness, product};

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_mirror_failure_is_a_warning() {
    let harness = TestHarness::with_index(|index| {
        FaultyIndex::new(
            index,
            Faults {
                upsert: true,
                ..Faults::default()
            },
        )
    });

    let created = harness
        .service
        .create(product("Red Shoe", "", 100, "shoes"))
        .await
        .expect("create should succeed despite the index");

    assert_eq!(created.warnings.len(), 1);
    let CatalogWarning::IndexMirror { id, message } = &created.warnings[0] else {
        unreachable!("Expected IndexMirror, got {:?}", created.warnings[0]);
    };
    assert_eq!(*id, created.product.id);
    assert!(message.contains("injected upsert failure"));

    // The store kept the product; the index never saw it
    assert_eq!(harness.service.list(1, 10).await.unwrap(), vec![created.product]);
    assert_eq!(harness.index.num_docs(), 0);
}

#[tokio::test]
async fn test_store_failure_fails_create_before_index() {
    let index = FaultyIndex::new(TestHarness::new().index, Faults::default());
    let service = CatalogService::new(Arc::new(BrokenStore { stall: false }), index.clone());

    let err = service
        .create(product("Red Shoe", "", 100, "shoes"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Persistence { .. }));
    assert_eq!(index.call_count(), 0);
}

#[tokio::test]
async fn test_validation_failures() {
    let harness = TestHarness::new();

    let cases = [
        product("", "", 1, "x"),
        product("ok", "", -1, "x"),
        product("ok", "", 1, "x").rating(5.5),
        product("ok", "", 1, "x").rating(f64::NAN),
    ];
    for case in cases {
        let err = harness.service.create(case).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }), "{err}");
    }
    assert!(harness.store.is_empty().await);
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_index_delete_failure_is_a_warning() {
    let harness = TestHarness::with_index(|index| {
        FaultyIndex::new(
            index,
            Faults {
                delete: true,
                ..Faults::default()
            },
        )
    });
    let created = harness
        .service
        .create(product("Red Shoe", "", 100, "shoes"))
        .await
        .unwrap();

    let deleted = harness.service.delete(created.product.id).await.unwrap();

    assert!(deleted.existed);
    assert!(matches!(
        deleted.warnings.as_slice(),
        [CatalogWarning::IndexDelete { .. }]
    ));
    assert!(harness.store.is_empty().await);
    // The stale document is still searchable until a reindex
    assert_eq!(harness.index.num_docs(), 1);
}

#[tokio::test]
async fn test_store_delete_failure_still_deletes_from_index() {
    let harness = TestHarness::new();
    harness.seed(vec![product("Red Shoe", "", 100, "shoes")]).await;
    assert_eq!(harness.index.num_docs(), 1);

    let broken = CatalogService::new(Arc::new(BrokenStore { stall: false }), harness.index.clone());
    let err = broken.delete(1).await.unwrap_err();

    assert!(matches!(err, Error::Persistence { .. }));
    assert_eq!(harness.index.num_docs(), 0);
}

// ============================================================================
// Search and suggest
// ============================================================================

#[tokio::test]
async fn test_index_failure_surfaces_as_query_error() {
    let harness = TestHarness::with_index(|index| {
        FaultyIndex::new(
            index,
            Faults {
                search: true,
                ..Faults::default()
            },
        )
    });

    let err = harness
        .service
        .search(&SearchRequest::new("shoe"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::QueryExecution { .. }));

    let err = harness.service.suggest("sho").await.unwrap_err();
    assert!(matches!(err, Error::QueryExecution { .. }));
}

#[tokio::test]
async fn test_search_never_falls_back_to_store() {
    let harness = TestHarness::with_store(Arc::new(BrokenStore { stall: false }));
    harness
        .index
        .upsert(
            "1",
            &shelf_core::ProductDocument {
                id: "1".to_string(),
                name: "Red Shoe".to_string(),
                description: None,
                price: 100,
                rating: None,
                category: "shoes".to_string(),
            },
        )
        .await
        .unwrap();

    let found = harness
        .service
        .search(&SearchRequest::new("red"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancel_during_mirror_keeps_product() {
    let store = Arc::new(MemoryProductStore::new());
    let service = CatalogService::new(store.clone(), Arc::new(StalledIndex));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let created = service
        .create_cancellable(product("Red Shoe", "", 100, "shoes"), &cancel)
        .await
        .expect("store insert completed before cancellation");

    assert_eq!(
        created.warnings,
        vec![CatalogWarning::MirrorCancelled {
            id: created.product.id
        }]
    );
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_cancel_during_store_insert_fails() {
    let service = CatalogService::new(
        Arc::new(BrokenStore { stall: true }),
        Arc::new(StalledIndex),
    );
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = service
        .create_cancellable(product("Red Shoe", "", 100, "shoes"), &cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_cancel_during_index_delete() {
    let store = Arc::new(MemoryProductStore::new());
    let id = store
        .insert(&product("Red Shoe", "", 100, "shoes"))
        .await
        .unwrap();
    let index: Arc<dyn SearchIndex> = Arc::new(StalledIndex);
    let service = CatalogService::new(store.clone(), index);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let deleted = service.delete_cancellable(id, &cancel).await.unwrap();
    assert!(deleted.existed);
    assert_eq!(deleted.warnings, vec![CatalogWarning::MirrorCancelled { id }]);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_pre_cancelled_delete_skips_both_stores() {
    let harness = TestHarness::new();
    let seeded = harness.seed(vec![product("Red Shoe", "", 100, "shoes")]).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = harness
        .service
        .delete_cancellable(seeded[0].id, &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(harness.store.len().await, 1);
    assert_eq!(harness.index.num_docs(), 1);
}
