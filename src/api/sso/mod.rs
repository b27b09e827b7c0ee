//! Store-identity handshake.
//!
//! The flow:
//! 1. Client asks to connect a store → `POST /sso/start` returns the upstream
//!    authorization URL carrying the correlation token.
//! 2. The operator authorizes on the store's own site.
//! 3. The store posts the issued key pair to `POST /sso/callback`; the token
//!    re-identifies the store record, credentials are persisted, and order
//!    webhooks are provisioned.
//!
//! There is no per-handshake state object: progress is implicit in what has
//! been written to the store record, and a failed step restarts the flow.

pub mod token;

use axum::{
    extract::State,
    response::Json,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::AppState;
use crate::cache::normalize_store_identity;
use crate::credentials::UpstreamCredentials;
use crate::error::Error;
use crate::records::StorePatch;
use crate::upstream::site_base_url;
use crate::webhooks;

/// Application name shown on the upstream authorization screen.
const APP_NAME: &str = "Shoplink";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sso/start", post(sso_start))
        .route("/sso/callback", post(sso_callback))
}

#[derive(Deserialize)]
struct StartRequest {
    #[serde(default)]
    store_url: String,
    #[serde(default)]
    app_user_id: String,
}

#[derive(Serialize)]
struct StartResponse {
    #[serde(rename = "authUrl")]
    auth_url: String,
}

/// POST /sso/start
///
/// Verifies the correlation handle and returns the authorization redirect.
/// Nothing is persisted yet.
async fn sso_start(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartRequest>,
) -> Result<Json<StartResponse>, Error> {
    if request.store_url.is_empty() || request.app_user_id.is_empty() {
        return Err(Error::Validation(
            "store_url and app_user_id are required".to_string(),
        ));
    }

    let store = state
        .records
        .find_store_by_handle(&request.app_user_id)
        .await?
        .ok_or_else(|| Error::NotFound("unknown store handle".to_string()))?;

    let domain = normalize_store_identity(&request.store_url);
    let correlation = token::encode(&request.app_user_id, &domain);
    let auth_url = build_authorize_url(
        &request.store_url,
        &correlation,
        &state.config.server.public_base_url,
    );

    info!(store_id = store.id, domain = %domain, "issuing store authorization redirect");

    Ok(Json(StartResponse { auth_url }))
}

fn build_authorize_url(store_url: &str, correlation: &str, public_base_url: &str) -> String {
    let base = site_base_url(store_url);
    let public = public_base_url.trim_end_matches('/');
    format!(
        "{}/wc-auth/v1/authorize?app_name={}&scope=read_write&user_id={}&return_url={}&callback_url={}",
        base,
        urlencoding::encode(APP_NAME),
        urlencoding::encode(correlation),
        urlencoding::encode(&format!("{}/connected", public)),
        urlencoding::encode(&format!("{}/sso/callback", public)),
    )
}

#[derive(Deserialize)]
struct CallbackRequest {
    #[serde(default, deserialize_with = "string_or_number")]
    key_id: String,
    /// The correlation token issued at /sso/start
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    consumer_key: String,
    #[serde(default)]
    consumer_secret: String,
}

/// The upstream store posts `key_id` as a JSON number.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

#[derive(Serialize)]
struct CallbackResponse {
    ok: bool,
    store_id: i64,
    app_user_id: String,
    store_url: String,
}

/// POST /sso/callback
///
/// Persists the issued credential pair, then provisions order webhooks.
/// Provisioning failures are logged and do not fail the callback: a store
/// with working credentials but missing webhooks still supports manual
/// refresh.
async fn sso_callback(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CallbackRequest>,
) -> Result<Json<CallbackResponse>, Error> {
    let required = [
        ("key_id", &request.key_id),
        ("user_id", &request.user_id),
        ("consumer_key", &request.consumer_key),
        ("consumer_secret", &request.consumer_secret),
    ];
    for (name, value) in required {
        if value.is_empty() {
            return Err(Error::Validation(format!(
                "missing required field '{}'",
                name
            )));
        }
    }

    let decoded = token::decode(&request.user_id)?;
    let store = state
        .records
        .find_store_by_handle(&decoded.handle)
        .await?
        .ok_or_else(|| Error::NotFound("correlation token does not match a store".to_string()))?;

    let store_url = format!("https://{}", decoded.domain);
    let patch = StorePatch {
        store_url: Some(store_url.clone()),
        consumer_key: Some(request.consumer_key.clone()),
        consumer_secret: Some(request.consumer_secret.clone()),
        key_id: Some(request.key_id.clone()),
        ..Default::default()
    };
    state.records.update_store(store.id, &patch).await?;

    info!(store_id = store.id, store_url = %store_url, "store credentials persisted");

    let credentials = UpstreamCredentials {
        store_url: store_url.clone(),
        consumer_key: request.consumer_key,
        consumer_secret: request.consumer_secret,
    };
    let outcome = webhooks::provision(
        &state.records,
        &credentials,
        store.id,
        &state.config.server.public_base_url,
    )
    .await;
    if !outcome.is_complete() {
        warn!(
            store_id = store.id,
            failed = ?outcome.failed,
            "webhook provisioning incomplete, manual refresh remains available"
        );
    }

    Ok(Json(CallbackResponse {
        ok: true,
        store_id: store.id,
        app_user_id: store.app_user_id,
        store_url,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_authorize_url() {
        let url = build_authorize_url(
            "https://shop.example.com/",
            "user7__shop.example.com",
            "https://api.example.com/",
        );

        assert!(url.starts_with("https://shop.example.com/wc-auth/v1/authorize?"));
        assert!(url.contains("app_name=Shoplink"));
        assert!(url.contains("scope=read_write"));
        assert!(url.contains("user_id=user7__shop.example.com"));
        assert!(url.contains(&format!(
            "callback_url={}",
            urlencoding::encode("https://api.example.com/sso/callback")
        )));
    }

    #[test]
    fn test_callback_request_accepts_numeric_key_id() {
        let json = r#"{
            "key_id": 7,
            "user_id": "user7__shop.example.com",
            "consumer_key": "ck_live_abc",
            "consumer_secret": "cs_live_def"
        }"#;
        let request: CallbackRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.key_id, "7");
    }

    #[test]
    fn test_callback_request_accepts_string_key_id() {
        let json = r#"{"key_id": "7", "user_id": "t", "consumer_key": "a", "consumer_secret": "b"}"#;
        let request: CallbackRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.key_id, "7");
    }

    #[test]
    fn test_callback_request_defaults_missing_fields() {
        let request: CallbackRequest = serde_json::from_str("{}").unwrap();
        assert!(request.key_id.is_empty());
        assert!(request.user_id.is_empty());
    }
}
