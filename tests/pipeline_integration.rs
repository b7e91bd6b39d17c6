//! Integration tests for full pipeline runs: mock upstream through HTTP
//! fetch, parse, and persistence.

use std::time::Duration;

use pricewatch_core::fetch::{HttpFetcher, HttpSession, RetryPolicy};
use pricewatch_core::pipeline::{CategoryTarget, Pipeline};
use pricewatch_core::store::{PriceQuery, PriceStore};
use pricewatch_core::{Database, build_default_parser_registry};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn in_memory_store() -> PriceStore {
    PriceStore::new(Database::new_in_memory().await.expect("in-memory db"))
}

fn http_pipeline() -> Pipeline {
    let session = HttpSession::new(None, Duration::from_secs(5)).expect("session builds");
    Pipeline::new(
        Box::new(HttpFetcher::new(session, RetryPolicy::default())),
        build_default_parser_registry(),
    )
}

/// Reference scenario: "Café" returns one valid item, "Leche" is served an
/// HTML block page. Exactly one record is persisted, under source "Café".
#[tokio::test]
async fn test_run_persists_cafe_and_skips_blocked_leche() {
    let server = MockServer::start().await;
    let cafe = r#"[
        {"productName": "Café X",
         "items": [{"sellers": [{"commertialOffer": {"Price": "1200.50"}}]}]}
    ]"#;
    Mock::given(method("GET"))
        .and(path("/search/cafe"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(cafe, "application/json"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/leche"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html>CAPTCHA</html>", "text/html"),
        )
        .mount(&server)
        .await;

    let targets = [
        CategoryTarget::new("Café", format!("{}/search/cafe", server.uri())),
        CategoryTarget::new("Leche", format!("{}/search/leche", server.uri())),
    ];
    let store = in_memory_store().await;

    let stats = http_pipeline()
        .run_and_store(&targets, &store)
        .await
        .expect("storage reachable");

    assert_eq!(stats.persisted, 1);
    assert_eq!(stats.failed_categories, 1);

    let all = store.query(&PriceQuery::default()).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].product_name, "Café X");
    assert_eq!(all[0].source, "Café");
    assert!((all[0].price - 1200.50).abs() < f64::EPSILON);

    let leche = store
        .query(&PriceQuery {
            source: Some("Leche".to_string()),
            ..PriceQuery::default()
        })
        .await
        .unwrap();
    assert!(leche.is_empty(), "blocked category contributes zero records");
}

#[tokio::test]
async fn test_run_with_all_categories_failing_reports_no_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>blocked</html>", "text/html"))
        .mount(&server)
        .await;

    let targets = [
        CategoryTarget::new("Café", format!("{}/search/cafe", server.uri())),
        CategoryTarget::new("Leche", format!("{}/search/leche", server.uri())),
    ];
    let store = in_memory_store().await;

    let stats = http_pipeline()
        .run_and_store(&targets, &store)
        .await
        .expect("empty run is not an error");

    assert_eq!(stats.persisted, 0);
    assert_eq!(stats.failed_categories, 2);
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_run_drops_malformed_items_and_keeps_valid_ones() {
    let server = MockServer::start().await;
    let mixed = r#"[
        {"productName": "Café Bueno",
         "items": [{"sellers": [{"commertialOffer": {"Price": 100.0}}]}]},
        {"productName": ""},
        {"productName": "Sin Precio", "items": []},
        {"productName": "Café Caro",
         "items": [{"sellers": [{"commertialOffer": {"Price": 250.0}}]}]}
    ]"#;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(mixed, "application/json"))
        .mount(&server)
        .await;

    let targets = [CategoryTarget::new(
        "Café",
        format!("{}/search/cafe", server.uri()),
    )];
    let store = in_memory_store().await;

    let stats = http_pipeline()
        .run_and_store(&targets, &store)
        .await
        .unwrap();

    assert_eq!(stats.persisted, 2);
    assert_eq!(stats.rejected, 2);

    let rows = store.query(&PriceQuery::default()).await.unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r.product_name.as_str()).collect();
    assert!(names.contains(&"Café Bueno"));
    assert!(names.contains(&"Café Caro"));
}

#[tokio::test]
async fn test_repeated_runs_accumulate_time_series_rows() {
    let server = MockServer::start().await;
    let body = r#"[
        {"productName": "Café X",
         "items": [{"sellers": [{"commertialOffer": {"Price": 100.0}}]}]}
    ]"#;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(&server)
        .await;

    let targets = [CategoryTarget::new(
        "Café",
        format!("{}/search/cafe", server.uri()),
    )];
    let store = in_memory_store().await;
    let pipeline = http_pipeline();

    pipeline.run_and_store(&targets, &store).await.unwrap();
    pipeline.run_and_store(&targets, &store).await.unwrap();

    // No dedup: each run appends its own observation.
    assert_eq!(store.count().await.unwrap(), 2);
}
