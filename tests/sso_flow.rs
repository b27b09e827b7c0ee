// Integration tests for the store-identity handshake

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
    let mut config = AppConfig::default();
    config.server.public_base_url = "https://api.example.com".to_string();

    let state = AppState {
        config: Arc::new(config),
        records: Arc::new(RecordStoreClient::new(records_url, None)),
        cache: Arc::new(ResponseCache::new()),
        subscriptions: Arc::new(SubscriptionStore::new()),
        push: None,
    };
    api::router(state)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn store_lookup_mock(server: &mut Server, handle: &str, body: &str) -> mockito::Mock {
    server
        .mock("GET", "/api/stores")
        .match_query(Matcher::UrlEncoded("app_user_id".into(), handle.into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
}

#[tokio::test]
async fn test_start_returns_auth_url() {
    let mut records = Server::new_async().await;
    let _lookup = store_lookup_mock(
        &mut records,
        "user7",
        r#"{"records": [{"id": 7, "app_user_id": "user7"}]}"#,
    )
    .create_async()
    .await;

    let app = test_app(&records.url());
    let response = app
        .oneshot(post_json(
            "/sso/start",
            r#"{"store_url": "https://shop.example.com", "app_user_id": "user7"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let auth_url = json["authUrl"].as_str().unwrap();
    assert!(auth_url.starts_with("https://shop.example.com/wc-auth/v1/authorize?"));
    assert!(auth_url.contains("user_id=user7__shop.example.com"));
    assert!(auth_url.contains("scope=read_write"));
}

#[tokio::test]
async fn test_start_unknown_handle_is_404() {
    let mut records = Server::new_async().await;
    let _lookup = store_lookup_mock(&mut records, "ghost", r#"{"records": []}"#)
        .create_async()
        .await;

    let app = test_app(&records.url());
    let response = app
        .oneshot(post_json(
            "/sso/start",
            r#"{"store_url": "https://shop.example.com", "app_user_id": "ghost"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_start_missing_fields_is_400() {
    let records = Server::new_async().await;
    let app = test_app(&records.url());

    let response = app
        .oneshot(post_json(
            "/sso/start",
            r#"{"store_url": "https://shop.example.com"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_callback_empty_consumer_secret_is_400_without_mutation() {
    let mut records = Server::new_async().await;
    let patch = records
        .mock("PATCH", Matcher::Regex(r"^/api/stores/\d+$".to_string()))
        .expect(0)
        .create_async()
        .await;

    let app = test_app(&records.url());
    let response = app
        .oneshot(post_json(
            "/sso/callback",
            r#"{
                "key_id": 7,
                "user_id": "user7__shop.example.com",
                "consumer_key": "ck_live_abc",
                "consumer_secret": ""
            }"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    patch.assert_async().await;
}

#[tokio::test]
async fn test_callback_undecodable_token_is_400() {
    let records = Server::new_async().await;
    let app = test_app(&records.url());

    let response = app
        .oneshot(post_json(
            "/sso/callback",
            r#"{
                "key_id": 7,
                "user_id": "garbage",
                "consumer_key": "ck",
                "consumer_secret": "cs"
            }"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_callback_unknown_handle_is_404() {
    let mut records = Server::new_async().await;
    let _lookup = store_lookup_mock(&mut records, "ghost", r#"{"records": []}"#)
        .create_async()
        .await;

    let app = test_app(&records.url());
    let response = app
        .oneshot(post_json(
            "/sso/callback",
            r#"{
                "key_id": 7,
                "user_id": "ghost__shop.example.com",
                "consumer_key": "ck",
                "consumer_secret": "cs"
            }"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_callback_persists_credentials_even_when_provisioning_fails() {
    let mut records = Server::new_async().await;
    let _lookup = store_lookup_mock(
        &mut records,
        "user7",
        r#"{"records": [{"id": 7, "app_user_id": "user7"}]}"#,
    )
    .create_async()
    .await;
    let patch = records
        .mock("PATCH", "/api/stores/7")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "consumer_key": "ck_live_abc",
            "consumer_secret": "cs_live_def",
            "key_id": "7"
        })))
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    // The token's domain points nowhere, so webhook provisioning fails fast;
    // the callback must still succeed once credentials are persisted.
    let app = test_app(&records.url());
    let response = app
        .oneshot(post_json(
            "/sso/callback",
            r#"{
                "key_id": 7,
                "user_id": "user7__127.0.0.1:1",
                "consumer_key": "ck_live_abc",
                "consumer_secret": "cs_live_def"
            }"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["store_id"], 7);
    assert_eq!(json["app_user_id"], "user7");
    assert_eq!(json["store_url"], "https://127.0.0.1:1");
    patch.assert_async().await;
}
