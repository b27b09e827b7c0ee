use serde::Deserialize;

/// Complete shoplink configuration.
///
/// File-backed sections come from a TOML file (every field has a default, so
/// the file is optional). Secrets are read from the environment and never
/// from the file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub records: RecordStoreConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(skip)]
    pub secrets: Secrets,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Public base URL used to template callback and webhook delivery URLs
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            public_base_url: default_public_base_url(),
        }
    }
}

/// External record store configuration (token comes from the environment)
#[derive(Debug, Clone, Deserialize)]
pub struct RecordStoreConfig {
    #[serde(default = "default_records_base_url")]
    pub base_url: String,
}

fn default_records_base_url() -> String {
    "http://localhost:8090".to_string()
}

impl Default for RecordStoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_records_base_url(),
        }
    }
}

/// Per-resource cache TTLs (seconds). Orders refresh fastest, reports sit in
/// between, products and customers are slow-changing.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_orders_ttl")]
    pub orders_ttl_seconds: u64,
    #[serde(default = "default_products_ttl")]
    pub products_ttl_seconds: u64,
    #[serde(default = "default_customers_ttl")]
    pub customers_ttl_seconds: u64,
    #[serde(default = "default_report_ttl")]
    pub report_ttl_seconds: u64,
}

fn default_orders_ttl() -> u64 {
    60
}

fn default_products_ttl() -> u64 {
    300
}

fn default_customers_ttl() -> u64 {
    300
}

fn default_report_ttl() -> u64 {
    120
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            orders_ttl_seconds: default_orders_ttl(),
            products_ttl_seconds: default_products_ttl(),
            customers_ttl_seconds: default_customers_ttl(),
            report_ttl_seconds: default_report_ttl(),
        }
    }
}

/// Push dispatcher tuning
#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// Maximum queued send jobs; enqueue drops (with a warning) beyond this
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
    /// Concurrent in-flight sends
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Per-send timeout (seconds); affects only the timed-out send
    #[serde(default = "default_send_timeout")]
    pub send_timeout_seconds: u64,
}

fn default_queue_depth() -> usize {
    256
}

fn default_concurrency() -> usize {
    8
}

fn default_send_timeout() -> u64 {
    10
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            queue_depth: default_queue_depth(),
            concurrency: default_concurrency(),
            send_timeout_seconds: default_send_timeout(),
        }
    }
}

/// Secrets read from the environment at startup.
///
/// All of them are optional: each dependent feature reports a configuration
/// error when invoked without its key, and the rest of the service keeps
/// running.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    /// Cipher key for the secondary credential pair (64-char hex or base64)
    pub cipher_key: Option<String>,
    /// VAPID public key handed to subscribing clients
    pub vapid_public_key: Option<String>,
    /// VAPID private key used to sign push sends
    pub vapid_private_key: Option<String>,
    /// Contact address carried in the VAPID `sub` claim
    pub push_contact: Option<String>,
    /// Bearer token for the record store
    pub records_token: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            cipher_key: std::env::var("SHOPLINK_CIPHER_KEY").ok(),
            vapid_public_key: std::env::var("SHOPLINK_VAPID_PUBLIC_KEY").ok(),
            vapid_private_key: std::env::var("SHOPLINK_VAPID_PRIVATE_KEY").ok(),
            push_contact: std::env::var("SHOPLINK_PUSH_CONTACT").ok(),
            records_token: std::env::var("SHOPLINK_RECORDS_TOKEN").ok(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            records: RecordStoreConfig::default(),
            cache: CacheConfig::default(),
            push: PushConfig::default(),
            secrets: Secrets::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration: TOML file named by `SHOPLINK_CONFIG` (defaults
    /// apply when unset or partial), then secrets from the environment.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match std::env::var("SHOPLINK_CONFIG") {
            Ok(path) => {
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| anyhow::anyhow!("failed to read config file {}: {}", path, e))?;
                toml::from_str(&contents)
                    .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {}", path, e))?
            }
            Err(_) => AppConfig::default(),
        };
        config.secrets = Secrets::from_env();
        Ok(config)
    }

    /// True when the push-signing material is present.
    pub fn push_configured(&self) -> bool {
        self.secrets.vapid_private_key.is_some()
    }
}
