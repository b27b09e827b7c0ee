//! HTTP API surface.

pub mod events;
pub mod reads;
pub mod secondary;
pub mod sso;

use axum::http::HeaderMap;
use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::cache::ResponseCache;
use crate::config::AppConfig;
use crate::error::Error;
use crate::push::{PushDispatcher, SubscriptionStore};
use crate::records::RecordStoreClient;

/// Shared application state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub records: Arc<RecordStoreClient>,
    pub cache: Arc<ResponseCache>,
    pub subscriptions: Arc<SubscriptionStore>,
    /// Present only when push signing keys are configured
    pub push: Option<PushDispatcher>,
}

/// Generic success body.
#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Assemble the full API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(sso::router())
        .merge(events::router())
        .merge(secondary::router())
        .merge(reads::router())
        .with_state(Arc::new(state))
        .layer(CorsLayer::permissive())
}

/// Extract the correlation handle from a bearer Authorization header.
///
/// The handle is the opaque per-store credential issued at signup; requests
/// without one cannot be attributed to a store.
pub fn extract_bearer_handle(headers: &HeaderMap) -> Result<String, Error> {
    let header = headers
        .get("authorization")
        .ok_or_else(|| Error::Validation("missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| Error::Validation("malformed Authorization header".to_string()))?;

    let mut parts = header.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(Error::Validation(
            "expected 'Bearer <handle>' Authorization header".to_string(),
        ));
    }

    Ok(token.to_string())
}
