// HTTP API: handshake, webhooks, push subscribe, data reads
pub mod api;

// Short-TTL response cache for upstream reads
pub mod cache;

// Configuration (TOML file + environment secrets)
pub mod config;

// Credential resolution and encryption at rest
pub mod credentials;

// Error taxonomy
pub mod error;

// Push subscriptions and notification fan-out
pub mod push;

// External record store client
pub mod records;

// Upstream store API client
pub mod upstream;

// Webhook provisioning
pub mod webhooks;
