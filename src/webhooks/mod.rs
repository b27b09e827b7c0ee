//! Webhook provisioning against the upstream store.
//!
//! Runs once per completed handshake over a fixed topic set. Each topic is
//! independent: a failed registration or row insert is logged and the loop
//! moves on, leaving that event type undelivered until the handshake is
//! repeated. There is no automatic retry.

use tracing::{info, warn};

use crate::credentials::UpstreamCredentials;
use crate::error::Error;
use crate::records::{RecordStoreClient, WebhookRegistration};
use crate::upstream::StoreApiClient;

/// Topics registered for every connected store.
pub const PROVISIONED_TOPICS: [&str; 2] = ["order.created", "order.updated"];

/// Delivery URL the upstream store calls back on.
pub fn delivery_url(public_base_url: &str, store_id: i64) -> String {
    format!(
        "{}/webhooks/store-events/{}",
        public_base_url.trim_end_matches('/'),
        store_id
    )
}

/// Per-topic result of one provisioning run.
#[derive(Debug, Default)]
pub struct ProvisionOutcome {
    pub provisioned: Vec<String>,
    pub failed: Vec<String>,
}

impl ProvisionOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Register the topic set upstream and record each registration.
pub async fn provision(
    records: &RecordStoreClient,
    credentials: &UpstreamCredentials,
    store_id: i64,
    public_base_url: &str,
) -> ProvisionOutcome {
    let client = StoreApiClient::new(credentials);
    let url = delivery_url(public_base_url, store_id);
    let mut outcome = ProvisionOutcome::default();

    for topic in PROVISIONED_TOPICS {
        match provision_topic(records, &client, store_id, topic, &url).await {
            Ok(webhook_id) => {
                info!(store_id, topic, webhook_id, "webhook provisioned");
                outcome.provisioned.push(topic.to_string());
            }
            Err(err) => {
                warn!(store_id, topic, error = %err, "webhook provisioning failed for topic");
                outcome.failed.push(topic.to_string());
            }
        }
    }

    outcome
}

async fn provision_topic(
    records: &RecordStoreClient,
    client: &StoreApiClient,
    store_id: i64,
    topic: &str,
    delivery_url: &str,
) -> Result<i64, Error> {
    let webhook = client.create_webhook(topic, delivery_url).await?;
    let registration = WebhookRegistration {
        store_id,
        webhook_id: webhook.id,
        topic: topic.to_string(),
        delivery_url: delivery_url.to_string(),
        status: if webhook.status.is_empty() {
            "active".to_string()
        } else {
            webhook.status
        },
    };
    records.insert_webhook_registration(&registration).await?;
    Ok(registration.webhook_id)
}
