// Integration tests for the cached data-read path

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use mockito::{Matcher, Server};
use std::sync::Arc;
use tower::ServiceExt;

use shoplink::api::{self, AppState};
use shoplink::cache::ResponseCache;
use shoplink::config::AppConfig;
use shoplink::push::SubscriptionStore;
use shoplink::records::RecordStoreClient;

fn test_app(records_url: &str) -> Router {
    let state = AppState {
        config: Arc::new(AppConfig::default()),
        records: Arc::new(RecordStoreClient::new(records_url, None)),
        cache: Arc::new(ResponseCache::new()),
        subscriptions: Arc::new(SubscriptionStore::new()),
        push: None,
    };
    api::router(state)
}

fn inline_uri(kind: &str, store_url: &str) -> String {
    format!(
        "/api/data/{}?store_url={}&consumer_key=ck_test&consumer_secret=cs_test",
        kind,
        urlencoding::encode(store_url)
    )
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_orders_read_serves_second_request_from_cache() {
    let records = Server::new_async().await;
    let mut upstream = Server::new_async().await;
    let listing = upstream
        .mock("GET", "/wp-json/wc/v3/orders")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id": 7, "total": "120.00"}]"#)
        .expect(1)
        .create_async()
        .await;

    let app = test_app(&records.url());
    let uri = inline_uri("orders", &upstream.url());

    for _ in 0..2 {
        let response = app.clone().oneshot(get(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json[0]["id"], 7);
    }

    // Exactly one upstream hit: the second read came from the cache
    listing.assert_async().await;
}

#[tokio::test]
async fn test_report_summarizes_orders() {
    let records = Server::new_async().await;
    let mut upstream = Server::new_async().await;
    let _listing = upstream
        .mock("GET", "/wp-json/wc/v3/orders")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id": 1, "total": "100.00"}, {"id": 2, "total": "20.50"}]"#)
        .create_async()
        .await;

    let app = test_app(&records.url());
    let response = app
        .oneshot(get(&inline_uri("report", &upstream.url())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["order_count"], 2);
    assert_eq!(json["total_sales"], 120.5);
}

#[tokio::test]
async fn test_unknown_kind_is_400() {
    let records = Server::new_async().await;
    let app = test_app(&records.url());

    let response = app
        .oneshot(get(&inline_uri("coupons", "https://shop.example.com")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_incomplete_inline_credentials_is_400() {
    let records = Server::new_async().await;
    let app = test_app(&records.url());

    let response = app
        .oneshot(get("/api/data/orders?store_url=https%3A%2F%2Fshop.example.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stored_hint_unknown_handle_is_404() {
    let mut records = Server::new_async().await;
    let _lookup = records
        .mock("GET", "/api/stores")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"records": []}"#)
        .create_async()
        .await;

    let app = test_app(&records.url());
    let request = Request::builder()
        .uri("/api/data/orders")
        .header("authorization", "Bearer ghost")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stored_hint_unconnected_store_is_400() {
    let mut records = Server::new_async().await;
    let _lookup = records
        .mock("GET", "/api/stores")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"records": [{"id": 9, "app_user_id": "user7"}]}"#)
        .create_async()
        .await;

    let app = test_app(&records.url());
    let request = Request::builder()
        .uri("/api/data/orders")
        .header("authorization", "Bearer user7")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stored_hint_uses_persisted_credentials() {
    let mut upstream = Server::new_async().await;
    let listing = upstream
        .mock("GET", "/wp-json/wc/v3/products")
        .match_header("authorization", Matcher::Regex("Basic .+".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id": 3, "name": "Tea"}]"#)
        .expect(1)
        .create_async()
        .await;

    let mut records = Server::new_async().await;
    let _lookup = records
        .mock("GET", "/api/stores")
        .match_query(Matcher::UrlEncoded("app_user_id".into(), "user7".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"records": [{{
                "id": 9,
                "app_user_id": "user7",
                "store_url": "{}",
                "consumer_key": "ck_live_abc",
                "consumer_secret": "cs_live_def"
            }}]}}"#,
            upstream.url()
        ))
        .create_async()
        .await;

    let app = test_app(&records.url());
    let request = Request::builder()
        .uri("/api/data/products")
        .header("authorization", "Bearer user7")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json[0]["name"], "Tea");
    listing.assert_async().await;
}
