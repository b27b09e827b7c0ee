//! Push notification fan-out.
//!
//! Client devices register Web Push subscriptions per store; inbound order
//! events fan out to every registered endpoint through a bounded dispatch
//! queue. Subscriptions live in process memory only and are lost on restart.

mod dispatch;
mod webpush;

pub use dispatch::{PushDispatcher, PushJob};
pub use webpush::WebPushSender;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Web Push subscription keys as supplied by the client device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// One Web Push delivery endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

/// In-process table of push subscriptions per store.
///
/// Deduplicated by structural equality; entries are never pruned
/// automatically, even after a delivery failure signals permanent rejection.
pub struct SubscriptionStore {
    subscriptions: DashMap<i64, Vec<PushSubscription>>,
}

impl SubscriptionStore {
    pub fn new() -> Self {
        Self {
            subscriptions: DashMap::new(),
        }
    }

    /// Append a subscription unless an identical one is already registered.
    /// Returns false for a duplicate.
    pub fn add(&self, store_id: i64, subscription: PushSubscription) -> bool {
        let mut entry = self.subscriptions.entry(store_id).or_default();
        if entry.contains(&subscription) {
            return false;
        }
        entry.push(subscription);
        true
    }

    /// All subscriptions registered for a store.
    pub fn for_store(&self, store_id: i64) -> Vec<PushSubscription> {
        self.subscriptions
            .get(&store_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }
}

impl Default for SubscriptionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Payload delivered to the client device.
#[derive(Clone, Debug, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
    #[serde(rename = "storeId")]
    pub store_id: i64,
    pub topic: String,
}

/// Per-send failure classification.
#[derive(Debug, thiserror::Error)]
pub enum PushSendError {
    /// The endpoint rejected the subscription permanently (gone or invalid)
    #[error("endpoint rejected permanently: {0}")]
    Rejected(String),
    /// Transient or unclassified delivery failure
    #[error("delivery failed: {0}")]
    Failed(String),
}

/// Seam between the dispatcher and the Web Push protocol, so tests run
/// against a recording double instead of the network.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, subscription: &PushSubscription, payload: &str)
        -> Result<(), PushSendError>;
}
