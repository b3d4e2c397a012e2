//! Catalog-wide properties checked over small seeded catalogs.

use std::collections::BTreeSet;

use shelf::SearchRequest;
use shelf_core::{Error, MAX_RESULT_WINDOW, NewProduct};

use crate::common::{TestHarness, ids, product};

fn mixed_catalog() -> Vec<NewProduct> {
    vec![
        product("Trail Running Shoe", "light and grippy", 120, "shoes").rating(4.7),
        product("Leather Dress Shoe", "polished", 240, "shoes"),
        product("Canvas Shoe", "summer shoe", 45, "Shoes").rating(3.1),
        product("Shoe Horn", "for any shoe", 8, "accessories").rating(4.2),
        product("Shoe Polish", "black shoe polish", 12, "accessories").rating(1.0),
        product("Hiking Boot", "waterproof, not a shoe", 180, "boots").rating(4.9),
    ]
}

#[tokio::test]
async fn test_created_products_are_listed_and_searchable() {
    let harness = TestHarness::new();
    let seeded = harness.seed(mixed_catalog()).await;

    let listed = harness.service.list(1, 100).await.unwrap();
    assert_eq!(listed, seeded);

    for product in &seeded {
        let found = harness
            .service
            .search(&SearchRequest::new(product.name.as_str()).page(1, 100))
            .await
            .unwrap();
        assert!(
            ids(&found).contains(&product.id.to_string()),
            "{} not found by its name",
            product.name
        );
    }
}

#[tokio::test]
async fn test_deleted_product_disappears_everywhere() {
    let harness = TestHarness::new();
    let seeded = harness
        .seed(vec![
            product("Apple Pie", "", 5, "food"),
            product("Apple Juice", "", 3, "food"),
        ])
        .await;
    let pie = &seeded[0];

    let deleted = harness.service.delete(pie.id).await.unwrap();
    assert!(deleted.existed);
    assert!(deleted.warnings.is_empty());

    let listed = harness.service.list(1, 10).await.unwrap();
    assert!(listed.iter().all(|p| p.id != pie.id));

    let found = harness
        .service
        .search(&SearchRequest::new("apple pie"))
        .await
        .unwrap();
    assert!(!ids(&found).contains(&pie.id.to_string()));

    let names = harness.service.suggest("app").await.unwrap();
    assert_eq!(names, vec!["Apple Juice"]);
}

#[tokio::test]
async fn test_delete_of_absent_id_is_noop() {
    let harness = TestHarness::new();
    harness.seed(vec![product("Hat", "", 1, "hats")]).await;

    let deleted = harness.service.delete(404).await.unwrap();
    assert!(!deleted.existed);
    assert!(deleted.warnings.is_empty());
    assert_eq!(harness.service.list(1, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_results_respect_price_and_category_filters() {
    let harness = TestHarness::new();
    harness.seed(mixed_catalog()).await;

    let windows = [(0.0, 50.0), (10.0, 130.0), (45.0, 45.0), (100.0, 1000.0), (0.5, 7.9)];
    for (min, max) in windows {
        for category in ["", "shoes", "accessories", "Shoes"] {
            let found = harness
                .service
                .search(
                    &SearchRequest::new("shoe")
                        .category(category)
                        .price_between(min, max)
                        .page(1, 100),
                )
                .await
                .unwrap();

            for document in &found {
                let price = document.price as f64;
                assert!(min <= price && price <= max, "{price} outside [{min}, {max}]");
                if !category.is_empty() {
                    assert_eq!(document.category, category);
                }
            }
        }
    }
}

#[tokio::test]
async fn test_inverted_price_window_matches_nothing() {
    let harness = TestHarness::new();
    harness.seed(mixed_catalog()).await;

    let found = harness
        .service
        .search(&SearchRequest::new("shoe").price_between(500.0, 10.0))
        .await
        .unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_rating_preference_never_excludes() {
    let harness = TestHarness::new();
    let seeded = harness
        .seed(vec![
            product("Red Shoe", "", 100, "shoes"),
            product("Red Shoe", "", 100, "shoes").rating(1.0),
            product("Red Shoe", "", 100, "shoes").rating(4.0),
            product("Red Shoe", "", 100, "shoes").rating(4.5),
        ])
        .await;

    let found = harness
        .service
        .search(&SearchRequest::new("red shoe"))
        .await
        .unwrap();

    let expected: BTreeSet<String> = seeded.iter().map(|p| p.id.to_string()).collect();
    let actual: BTreeSet<String> = ids(&found).into_iter().collect();
    assert_eq!(actual, expected);
    // Only the rating above 4.0 is boosted
    assert_eq!(found[0].id, seeded[3].id.to_string());
}

#[tokio::test]
async fn test_pages_concatenate_to_one_large_page() {
    let harness = TestHarness::new();
    harness.seed(mixed_catalog()).await;

    let size = 2;
    let pages = 3;
    let mut concatenated = Vec::new();
    for page in 1..=pages {
        let found = harness
            .service
            .search(&SearchRequest::new("shoe").page(page, size))
            .await
            .unwrap();
        concatenated.extend(ids(&found));
    }

    let whole = harness
        .service
        .search(&SearchRequest::new("shoe").page(1, size * pages))
        .await
        .unwrap();

    let mut concatenated_sorted = concatenated.clone();
    concatenated_sorted.sort();
    let mut whole_sorted = ids(&whole);
    whole_sorted.sort();
    assert_eq!(concatenated_sorted, whole_sorted);
}

#[tokio::test]
async fn test_oversized_result_window_is_rejected() {
    let harness = TestHarness::new();
    harness.seed(mixed_catalog()).await;

    let err = harness
        .service
        .search(&SearchRequest::new("shoe").page(1, 1 << 40))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));

    let err = harness
        .service
        .search(&SearchRequest::new("shoe").page(MAX_RESULT_WINDOW, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));

    let err = harness.service.list(1, MAX_RESULT_WINDOW + 1).await.unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));

    // The last allowed window still answers
    let found = harness
        .service
        .search(&SearchRequest::new("shoe").page(MAX_RESULT_WINDOW / 10, 10))
        .await
        .unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_rated_product_outranks_otherwise_tied_products() {
    let harness = TestHarness::new();
    let seeded = harness
        .seed(vec![
            product("Blue Hat", "", 50, "hats").rating(3.9),
            product("Blue Hat", "", 50, "hats"),
            product("Blue Hat", "", 50, "hats").rating(4.6),
        ])
        .await;

    let found = harness
        .service
        .search(&SearchRequest::new("blue hat"))
        .await
        .unwrap();

    assert_eq!(found.len(), 3);
    assert_eq!(found[0].id, seeded[2].id.to_string());
    assert_eq!(found[0].rating, Some(4.6));
}

#[tokio::test]
async fn test_list_pages_in_id_order() {
    let harness = TestHarness::new();
    let seeded = harness.seed(mixed_catalog()).await;

    let first = harness.service.list(1, 4).await.unwrap();
    let second = harness.service.list(2, 4).await.unwrap();
    let beyond = harness.service.list(3, 4).await.unwrap();

    assert_eq!(first, seeded[..4]);
    assert_eq!(second, seeded[4..]);
    assert!(beyond.is_empty());
}

#[tokio::test]
async fn test_suggest_is_capped_at_five() {
    let harness = TestHarness::new();
    let flavours = ["Pie", "Juice", "Cider", "Crumble", "Tart", "Sauce", "Chips"];
    harness
        .seed(
            flavours
                .iter()
                .map(|f| product(&format!("Apple {f}"), "", 1, "food"))
                .collect(),
        )
        .await;

    let names = harness.service.suggest("app").await.unwrap();
    assert_eq!(names.len(), 5);
    assert!(names.iter().all(|n| n.starts_with("Apple ")));
}
