//! End-to-end catalog scenarios.

use shelf::SearchRequest;
use shelf_core::NewProduct;

use crate::common::{TestHarness, ids, product, red_shoe_and_blue_hat};

#[tokio::test]
async fn test_created_product_is_listed() {
    let harness = TestHarness::new();

    let created = harness
        .service
        .create(
            NewProduct::new("iPhone 15", 1200, "phones")
                .description("Latest model")
                .rating(4.8),
        )
        .await
        .expect("create should succeed");

    assert!(created.product.id > 0);
    assert!(created.warnings.is_empty());

    let listed = harness.service.list(1, 10).await.unwrap();
    assert_eq!(listed, vec![created.product.clone()]);
    assert_eq!(listed[0].name, "iPhone 15");
    assert_eq!(listed[0].description.as_deref(), Some("Latest model"));
    assert_eq!(listed[0].rating, Some(4.8));
}

#[tokio::test]
async fn test_name_match_ranks_above_description_match() {
    let harness = TestHarness::new();
    let seeded = harness.seed(red_shoe_and_blue_hat()).await;

    let found = harness
        .service
        .search(&SearchRequest::new("red shoe").price_between(0.0, 100_000.0))
        .await
        .unwrap();

    assert_eq!(
        ids(&found),
        vec![seeded[0].id.to_string(), seeded[1].id.to_string()]
    );
}

#[tokio::test]
async fn test_category_filter_is_exact() {
    let harness = TestHarness::new();
    let mut products = red_shoe_and_blue_hat();
    products.push(product("Red Shoe", "", 80, "clearance"));
    let seeded = harness.seed(products).await;

    let found = harness
        .service
        .search(
            &SearchRequest::new("red shoe")
                .category("shoes")
                .price_between(0.0, 100_000.0),
        )
        .await
        .unwrap();

    assert_eq!(ids(&found), vec![seeded[0].id.to_string()]);
    assert_eq!(found[0].category, "shoes");
}

#[tokio::test]
async fn test_price_bounds_are_inclusive() {
    let harness = TestHarness::new();
    let seeded = harness
        .seed(vec![
            product("Red Shoe", "", 99, "shoes"),
            product("Red Shoe", "", 100, "shoes"),
            product("Red Shoe", "", 101, "shoes"),
        ])
        .await;

    let found = harness
        .service
        .search(&SearchRequest::new("shoe").price_between(100.0, 100.0))
        .await
        .unwrap();

    assert_eq!(ids(&found), vec![seeded[1].id.to_string()]);
    assert_eq!(found[0].price, 100);
}

#[tokio::test]
async fn test_name_is_replaced_by_highlight() {
    let harness = TestHarness::new();
    harness.seed(vec![product("Red Shoe", "", 100, "shoes")]).await;

    let found = harness
        .service
        .search(&SearchRequest::new("red"))
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "<b>Red</b> Shoe");
}

#[tokio::test]
async fn test_name_without_fragment_is_kept() {
    let harness = TestHarness::new();
    harness
        .seed(vec![product("Blue Hat", "red felt", 50, "hats")])
        .await;

    let found = harness
        .service
        .search(&SearchRequest::new("red"))
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Blue Hat");
}

#[tokio::test]
async fn test_suggest_completes_prefix() {
    let harness = TestHarness::new();
    harness
        .seed(vec![
            product("Apple Pie", "", 5, "food"),
            product("Apple Juice", "", 3, "food"),
            product("Banana", "", 1, "food"),
        ])
        .await;

    let mut names = harness.service.suggest("app").await.unwrap();
    names.sort();

    assert_eq!(names, vec!["Apple Juice", "Apple Pie"]);
}

#[tokio::test]
async fn test_suggest_multi_word_prefers_longer_match() {
    let harness = TestHarness::new();
    harness
        .seed(vec![
            product("Apple Pie", "", 5, "food"),
            product("Apple Juice", "", 3, "food"),
        ])
        .await;

    let names = harness.service.suggest("apple ju").await.unwrap();
    assert_eq!(names[0], "Apple Juice");
}
