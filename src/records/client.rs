//! HTTP client for the external record store.

use anyhow::{anyhow, Context};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{NotificationEvent, StorePatch, StoreRecord, WebhookRegistration};
use crate::error::Error;

/// Record-store REST client.
///
/// Authenticates with a bearer token when one is configured. The base URL is
/// injectable so tests can point at a mock server.
pub struct RecordStoreClient {
    base_url: String,
    token: Option<String>,
    http_client: Client,
}

#[derive(Deserialize)]
struct RecordsEnvelope {
    records: Vec<StoreRecord>,
}

impl RecordStoreClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        let http_client = Client::builder()
            .user_agent("shoplink/0.1")
            .build()
            .expect("Failed to build HTTP client");
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            http_client,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .http_client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Look up a store by its correlation handle.
    pub async fn find_store_by_handle(&self, app_user_id: &str) -> Result<Option<StoreRecord>, Error> {
        let response = self
            .request(reqwest::Method::GET, "/api/stores")
            .query(&[("app_user_id", app_user_id)])
            .send()
            .await
            .context("Failed to query record store for store handle")?;

        let response = check_status(response, "store lookup").await?;
        let envelope: RecordsEnvelope = response
            .json()
            .await
            .context("Failed to parse store lookup response")?;
        Ok(envelope.records.into_iter().next())
    }

    /// Fetch a store row by id. Returns `Ok(None)` on 404.
    pub async fn get_store(&self, store_id: i64) -> Result<Option<StoreRecord>, Error> {
        let response = self
            .request(reqwest::Method::GET, &format!("/api/stores/{}", store_id))
            .send()
            .await
            .context("Failed to fetch store record")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response, "store fetch").await?;
        let record = response
            .json()
            .await
            .context("Failed to parse store record")?;
        Ok(Some(record))
    }

    /// Apply a partial update to a store row.
    pub async fn update_store(&self, store_id: i64, patch: &StorePatch) -> Result<(), Error> {
        let response = self
            .request(reqwest::Method::PATCH, &format!("/api/stores/{}", store_id))
            .json(patch)
            .send()
            .await
            .context("Failed to update store record")?;

        check_status(response, "store update").await?;
        Ok(())
    }

    /// Append a webhook registration row.
    pub async fn insert_webhook_registration(
        &self,
        registration: &WebhookRegistration,
    ) -> Result<(), Error> {
        let response = self
            .request(reqwest::Method::POST, "/api/webhook-registrations")
            .json(registration)
            .send()
            .await
            .context("Failed to insert webhook registration")?;

        check_status(response, "webhook registration insert").await?;
        Ok(())
    }

    /// Append a notification event row.
    pub async fn insert_notification_event(&self, event: &NotificationEvent) -> Result<(), Error> {
        let response = self
            .request(reqwest::Method::POST, "/api/notification-events")
            .json(event)
            .send()
            .await
            .context("Failed to insert notification event")?;

        check_status(response, "notification event insert").await?;
        Ok(())
    }
}

/// The record store is infrastructure this deployment owns, so non-2xx
/// responses surface as internal errors rather than upstream ones.
async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Internal(anyhow!(
        "record store {} failed with status {}: {}",
        what,
        status,
        body
    )))
}
