use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use shoplink::api::{self, AppState};
use shoplink::cache::ResponseCache;
use shoplink::config::AppConfig;
use shoplink::push::{PushDispatcher, SubscriptionStore, WebPushSender};
use shoplink::records::RecordStoreClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shoplink=info".into()),
        )
        .init();

    let config = AppConfig::load()?;
    info!(records = %config.records.base_url, "shoplink starting");

    let records = Arc::new(RecordStoreClient::new(
        &config.records.base_url,
        config.secrets.records_token.clone(),
    ));

    let push = match &config.secrets.vapid_private_key {
        Some(private_key) => {
            let sender =
                WebPushSender::new(private_key.clone(), config.secrets.push_contact.clone())?;
            Some(PushDispatcher::spawn(
                Arc::new(sender),
                config.push.concurrency,
                config.push.queue_depth,
                Duration::from_secs(config.push.send_timeout_seconds),
            ))
        }
        None => {
            info!("push signing keys absent, notification fan-out disabled");
            None
        }
    };

    let bind_addr = config.server.bind_addr.clone();
    let state = AppState {
        config: Arc::new(config),
        records,
        cache: Arc::new(ResponseCache::new()),
        subscriptions: Arc::new(SubscriptionStore::new()),
        push,
    };

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
