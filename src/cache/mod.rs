//! Short-TTL response cache for upstream reads.
//!
//! Entries are keyed by resource kind and a normalized store identity, each
//! kind with its own TTL. Write paths never invalidate the cache: push is the
//! real-time channel, the cache serves bulk reads. Concurrent misses on one
//! key coalesce into a single upstream fetch.

use dashmap::DashMap;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::CacheConfig;
use crate::error::Error;

/// Cached resource kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Orders,
    Products,
    Customers,
    Report,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Orders => "orders",
            ResourceKind::Products => "products",
            ResourceKind::Customers => "customers",
            ResourceKind::Report => "report",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "orders" => Some(ResourceKind::Orders),
            "products" => Some(ResourceKind::Products),
            "customers" => Some(ResourceKind::Customers),
            "report" => Some(ResourceKind::Report),
            _ => None,
        }
    }

    pub fn ttl(&self, config: &CacheConfig) -> Duration {
        let seconds = match self {
            ResourceKind::Orders => config.orders_ttl_seconds,
            ResourceKind::Products => config.products_ttl_seconds,
            ResourceKind::Customers => config.customers_ttl_seconds,
            ResourceKind::Report => config.report_ttl_seconds,
        };
        Duration::from_secs(seconds)
    }
}

/// Normalize a store identity for cache keying: scheme-stripped,
/// trailing-slash-stripped.
pub fn normalize_store_identity(url: &str) -> String {
    let s = url.trim();
    let s = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"))
        .unwrap_or(s);
    s.trim_end_matches('/').to_string()
}

struct CacheEntry {
    payload: Value,
    stored_at: Instant,
}

type CacheKey = (ResourceKind, String);

/// Per-resource, per-store response cache.
pub struct ResponseCache {
    entries: DashMap<CacheKey, CacheEntry>,
    in_flight: DashMap<CacheKey, Arc<Mutex<()>>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            in_flight: DashMap::new(),
        }
    }

    /// Return the cached payload while it is younger than `ttl`; a stale
    /// entry is evicted and reported as a miss.
    pub fn get(&self, kind: ResourceKind, identity: &str, ttl: Duration) -> Option<Value> {
        let key = (kind, identity.to_string());
        let stale = match self.entries.get(&key) {
            Some(entry) => {
                if entry.stored_at.elapsed() < ttl {
                    return Some(entry.payload.clone());
                }
                true
            }
            None => false,
        };
        if stale {
            self.entries.remove(&key);
        }
        None
    }

    /// Unconditionally overwrite the entry for a key.
    pub fn set(&self, kind: ResourceKind, identity: &str, payload: Value) {
        self.entries.insert(
            (kind, identity.to_string()),
            CacheEntry {
                payload,
                stored_at: Instant::now(),
            },
        );
    }

    /// Cached read with miss coalescing: at most one concurrent fetch runs
    /// per key; waiters re-check the cache once the fetch completes. Fetch
    /// errors propagate to the caller that ran the fetch and leave the cache
    /// untouched.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        kind: ResourceKind,
        identity: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<Value, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, Error>>,
    {
        if let Some(payload) = self.get(kind, identity, ttl) {
            return Ok(payload);
        }

        let key = (kind, identity.to_string());
        let gate = {
            let entry = self.in_flight.entry(key).or_default();
            Arc::clone(entry.value())
        };
        let _guard = gate.lock().await;

        // Another task may have filled the entry while we waited for the gate
        if let Some(payload) = self.get(kind, identity, ttl) {
            return Ok(payload);
        }

        let payload = fetch().await?;
        self.set(kind, identity, payload.clone());
        Ok(payload)
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}
