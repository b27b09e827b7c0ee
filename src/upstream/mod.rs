//! HTTP client for the upstream e-commerce store REST API.
//!
//! Authenticates every call with the store's consumer key pair over basic
//! auth. Non-2xx responses surface as [`Error::Upstream`] with the status
//! code preserved.

use anyhow::Context;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::credentials::UpstreamCredentials;
use crate::error::Error;

/// Webhook created upstream.
#[derive(Debug, Deserialize)]
pub struct UpstreamWebhook {
    pub id: i64,
    #[serde(default)]
    pub status: String,
}

/// Client for one store's REST API.
pub struct StoreApiClient {
    base_url: String,
    consumer_key: String,
    consumer_secret: String,
    http_client: Client,
}

/// Normalize a stored site URL into a request base: default to https when the
/// scheme is missing, drop trailing slashes.
pub fn site_base_url(store_url: &str) -> String {
    let trimmed = store_url.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

impl StoreApiClient {
    pub fn new(credentials: &UpstreamCredentials) -> Self {
        let http_client = Client::builder()
            .user_agent("shoplink/0.1")
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            base_url: site_base_url(&credentials.store_url),
            consumer_key: credentials.consumer_key.clone(),
            consumer_secret: credentials.consumer_secret.clone(),
            http_client,
        }
    }

    /// Register a webhook for a topic pointing at `delivery_url`.
    pub async fn create_webhook(
        &self,
        topic: &str,
        delivery_url: &str,
    ) -> Result<UpstreamWebhook, Error> {
        let url = format!("{}/wp-json/wc/v3/webhooks", self.base_url);
        let body = serde_json::json!({
            "name": format!("shoplink {}", topic),
            "topic": topic,
            "delivery_url": delivery_url,
        });

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
            .json(&body)
            .send()
            .await
            .context("Failed to send webhook registration request")?;

        let response = check_status(response).await?;
        response
            .json::<UpstreamWebhook>()
            .await
            .context("Failed to parse webhook registration response")
            .map_err(Error::from)
    }

    /// Fetch a resource listing (`orders`, `products`, `customers`).
    pub async fn fetch_list(&self, resource: &str) -> Result<Value, Error> {
        let url = format!("{}/wp-json/wc/v3/{}", self.base_url, resource);
        let response = self
            .http_client
            .get(&url)
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
            .send()
            .await
            .with_context(|| format!("Failed to send {} listing request", resource))?;

        let response = check_status(response).await?;
        response
            .json::<Value>()
            .await
            .with_context(|| format!("Failed to parse {} listing response", resource))
            .map_err(Error::from)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let detail = response.text().await.unwrap_or_default();
    Err(Error::Upstream {
        status: status.as_u16(),
        detail,
    })
}
