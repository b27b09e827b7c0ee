//! Secondary (Razorpay) credential endpoints.
//!
//! The key secret is encrypted before it reaches the record store; the plain
//! value never lands in a row. All three endpoints authenticate with the
//! bearer correlation handle.

use axum::{
    extract::State,
    http::HeaderMap,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::api::{extract_bearer_handle, AppState, OkResponse};
use crate::credentials::{cipher, resolve_secondary};
use crate::error::Error;
use crate::records::{StorePatch, StoreRecord};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/secondary-credentials", get(status))
        .route("/secondary-credentials/connect", post(connect))
        .route("/secondary-credentials/skip", post(skip))
}

async fn resolve_store(state: &AppState, headers: &HeaderMap) -> Result<StoreRecord, Error> {
    let handle = extract_bearer_handle(headers)?;
    state
        .records
        .find_store_by_handle(&handle)
        .await?
        .ok_or_else(|| Error::NotFound("unknown store handle".to_string()))
}

#[derive(Deserialize)]
struct ConnectRequest {
    #[serde(default)]
    key_id: String,
    #[serde(default)]
    key_secret: String,
}

/// POST /secondary-credentials/connect
async fn connect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ConnectRequest>,
) -> Result<Json<OkResponse>, Error> {
    if request.key_id.is_empty() || request.key_secret.is_empty() {
        return Err(Error::Validation(
            "key_id and key_secret are required".to_string(),
        ));
    }

    let store = resolve_store(&state, &headers).await?;
    let key = cipher::load_key(state.config.secrets.cipher_key.as_deref())?;
    let blob = cipher::encrypt(&request.key_secret, &key)?;

    let patch = StorePatch {
        razorpay_key_id: Some(request.key_id),
        razorpay_key_secret_enc: Some(blob),
        razorpay_skipped: Some(false),
        ..Default::default()
    };
    state.records.update_store(store.id, &patch).await?;

    info!(store_id = store.id, "secondary credentials connected");

    Ok(Json(OkResponse { ok: true }))
}

/// POST /secondary-credentials/skip
async fn skip(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<OkResponse>, Error> {
    let store = resolve_store(&state, &headers).await?;

    let patch = StorePatch {
        razorpay_skipped: Some(true),
        ..Default::default()
    };
    state.records.update_store(store.id, &patch).await?;

    info!(store_id = store.id, "secondary credentials skipped");

    Ok(Json(OkResponse { ok: true }))
}

#[derive(Serialize)]
struct StatusResponse {
    connected: bool,
    skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_id: Option<String>,
}

/// GET /secondary-credentials
///
/// Verifies the stored blob still decrypts under the configured key, so key
/// rotation breakage surfaces as an integrity failure instead of staying
/// silent until the pair is next used.
async fn status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StatusResponse>, Error> {
    let store = resolve_store(&state, &headers).await?;

    if !store.has_secondary() {
        return Ok(Json(StatusResponse {
            connected: false,
            skipped: store.razorpay_skipped,
            key_id: None,
        }));
    }

    let key = cipher::load_key(state.config.secrets.cipher_key.as_deref())?;
    let secondary = resolve_secondary(&store, &key)?;

    Ok(Json(StatusResponse {
        connected: true,
        skipped: store.razorpay_skipped,
        key_id: Some(secondary.key_id),
    }))
}
