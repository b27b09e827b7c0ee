//! Inbound store-event webhooks and push subscription registration.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
    routing::post,
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::{AppState, OkResponse};
use crate::error::Error;
use crate::push::{PushJob, PushMessage, PushSubscription};
use crate::records::NotificationEvent;

/// Topics that trigger a push notification.
const NOTIFY_TOPICS: [&str; 2] = ["order.created", "order.updated"];

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/webhooks/store-events/:store_id", post(ingest_store_event))
        .route("/push/subscribe", post(subscribe))
}

/// POST /webhooks/store-events/{store_id}
///
/// The only gate is the unguessable per-store delivery URL; there is no
/// signature verification of the inbound call. Responds success once event
/// persistence has been attempted, regardless of push outcome, so the
/// upstream store never enters a retry storm.
async fn ingest_store_event(
    State(state): State<Arc<AppState>>,
    Path(store_id): Path<i64>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<OkResponse>, Error> {
    let topic = header_value(&headers, "x-wc-webhook-topic");
    let resource = header_value(&headers, "x-wc-webhook-resource");
    let event = header_value(&headers, "x-wc-webhook-event");

    // The payload is opaque; a non-JSON body is kept verbatim as a string
    let payload: Value = serde_json::from_slice(&body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()));

    debug!(store_id, topic = %topic, resource = %resource, "store event received");

    let row = NotificationEvent {
        store_id,
        topic: topic.clone(),
        resource,
        event,
        payload: payload.clone(),
        created_at: Utc::now().to_rfc3339(),
    };
    if let Err(err) = state.records.insert_notification_event(&row).await {
        // History storage is best-effort; the operator still gets the push
        warn!(store_id, error = %err, "event persistence failed, continuing to fan-out");
    }

    if NOTIFY_TOPICS.contains(&topic.as_str()) {
        if let Some(dispatcher) = &state.push {
            let subscriptions = state.subscriptions.for_store(store_id);
            if !subscriptions.is_empty() {
                let message = build_push_message(store_id, &topic, &payload);
                match serde_json::to_string(&message) {
                    Ok(encoded) => {
                        let count = subscriptions.len();
                        for subscription in subscriptions {
                            dispatcher.enqueue(PushJob {
                                subscription,
                                payload: encoded.clone(),
                            });
                        }
                        info!(store_id, topic = %topic, count, "push notifications queued");
                    }
                    Err(err) => {
                        warn!(store_id, error = %err, "failed to encode push payload");
                    }
                }
            }
        }
    }

    Ok(Json(OkResponse { ok: true }))
}

fn header_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Template the notification from whatever the event payload carries.
fn build_push_message(store_id: i64, topic: &str, payload: &Value) -> PushMessage {
    let order_id = payload
        .get("number")
        .or_else(|| payload.get("id"))
        .map(json_scalar_to_string);

    let title = match (topic, &order_id) {
        ("order.created", Some(id)) => format!("New order #{}", id),
        ("order.created", None) => "New order".to_string(),
        (_, Some(id)) => format!("Order #{} updated", id),
        (_, None) => "Order updated".to_string(),
    };

    let billing_name = payload.get("billing").map(|billing| {
        let first = billing
            .get("first_name")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let last = billing
            .get("last_name")
            .and_then(Value::as_str)
            .unwrap_or_default();
        format!("{} {}", first, last).trim().to_string()
    });
    let billing_name = billing_name.filter(|name| !name.is_empty());
    let total = payload
        .get("total")
        .map(json_scalar_to_string)
        .filter(|t| !t.is_empty());

    let body = match (billing_name, total) {
        (Some(name), Some(total)) => format!("{}, total {}", name, total),
        (Some(name), None) => name,
        (None, Some(total)) => format!("Total {}", total),
        (None, None) => "Open the app for details.".to_string(),
    };

    PushMessage {
        title,
        body,
        order_id,
        store_id,
        topic: topic.to_string(),
    }
}

fn json_scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Deserialize)]
struct SubscribeRequest {
    store_id: i64,
    subscription: PushSubscription,
}

/// POST /push/subscribe
///
/// Idempotent by construction: an identical subscription is stored once.
async fn subscribe(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubscribeRequest>,
) -> Result<Json<OkResponse>, Error> {
    if request.subscription.endpoint.is_empty() {
        return Err(Error::Validation(
            "subscription endpoint is required".to_string(),
        ));
    }

    let added = state
        .subscriptions
        .add(request.store_id, request.subscription);
    debug!(store_id = request.store_id, added, "push subscription registered");

    Ok(Json(OkResponse { ok: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_for_full_order_payload() {
        let payload = json!({
            "id": 77,
            "number": "1077",
            "total": "120.00",
            "billing": {"first_name": "Jane", "last_name": "Doe"}
        });

        let message = build_push_message(42, "order.created", &payload);
        assert_eq!(message.title, "New order #1077");
        assert_eq!(message.body, "Jane Doe, total 120.00");
        assert_eq!(message.order_id.as_deref(), Some("1077"));
        assert_eq!(message.store_id, 42);
        assert_eq!(message.topic, "order.created");
    }

    #[test]
    fn test_message_for_updated_topic() {
        let payload = json!({"id": 9, "total": "5.00"});
        let message = build_push_message(42, "order.updated", &payload);
        assert_eq!(message.title, "Order #9 updated");
        assert_eq!(message.body, "Total 5.00");
    }

    #[test]
    fn test_message_falls_back_to_generic_body() {
        let payload = json!({"id": 9});
        let message = build_push_message(42, "order.created", &payload);
        assert_eq!(message.title, "New order #9");
        assert_eq!(message.body, "Open the app for details.");
    }

    #[test]
    fn test_message_without_order_id() {
        let payload = json!({});
        let message = build_push_message(42, "order.created", &payload);
        assert_eq!(message.title, "New order");
        assert!(message.order_id.is_none());
    }

    #[test]
    fn test_billing_name_with_single_field() {
        let payload = json!({"id": 1, "billing": {"first_name": "Jane"}});
        let message = build_push_message(42, "order.created", &payload);
        assert_eq!(message.body, "Jane");
    }
}
