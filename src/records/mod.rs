//! Row types owned by the external record store.
//!
//! The record store is an opaque HTTP service; this subsystem only reads and
//! writes rows through its REST interface and never sees its internals.

mod client;

pub use client::RecordStoreClient;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One connected (or connecting) store.
///
/// Created at signup outside this subsystem; mutated here by the handshake
/// callback (primary pair) and the secondary connect/skip endpoints; never
/// deleted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreRecord {
    pub id: i64,
    #[serde(default)]
    pub username: String,
    /// Opaque correlation handle, unique per store
    pub app_user_id: String,
    #[serde(default)]
    pub store_url: String,
    #[serde(default)]
    pub consumer_key: String,
    #[serde(default)]
    pub consumer_secret: String,
    /// Key id issued by the upstream store during the handshake
    #[serde(default)]
    pub key_id: String,
    #[serde(default)]
    pub razorpay_key_id: String,
    /// Encrypted at rest: base64(nonce || tag || ciphertext)
    #[serde(default)]
    pub razorpay_key_secret_enc: String,
    #[serde(default)]
    pub razorpay_skipped: bool,
}

impl StoreRecord {
    /// Connected iff both primary credential fields are non-empty.
    pub fn is_connected(&self) -> bool {
        !self.consumer_key.is_empty() && !self.consumer_secret.is_empty()
    }

    /// Razorpay connected iff both secondary fields are non-empty.
    pub fn has_secondary(&self) -> bool {
        !self.razorpay_key_id.is_empty() && !self.razorpay_key_secret_enc.is_empty()
    }
}

/// Partial update for a store row; only set fields are written.
#[derive(Clone, Debug, Default, Serialize)]
pub struct StorePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_key_secret_enc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_skipped: Option<bool>,
}

/// One upstream webhook registered for a store topic.
///
/// Rows append per successful handshake and are not deduplicated against
/// earlier runs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebhookRegistration {
    pub store_id: i64,
    /// Upstream-assigned webhook id
    pub webhook_id: i64,
    pub topic: String,
    pub delivery_url: String,
    pub status: String,
}

/// One inbound store event, append-only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub store_id: i64,
    pub topic: String,
    pub resource: String,
    pub event: String,
    pub payload: Value,
    /// RFC 3339 creation timestamp
    pub created_at: String,
}
