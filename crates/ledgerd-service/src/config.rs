//! Service configuration.

use ledgerd_core::{PlanCatalog, PricingConfig};

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/ledgerd").
    pub data_dir: String,

    /// Service API key for service-to-service auth.
    pub service_api_key: Option<String>,

    /// Image generator backend URL (optional; image edits are rejected
    /// without it).
    pub generator_url: Option<String>,

    /// Image generator API key (optional).
    pub generator_api_key: Option<String>,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Model pricing catalog.
    pub pricing: PricingConfig,

    /// Plan credit allowances.
    pub plans: PlanCatalog,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/ledgerd".into()),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            generator_url: std::env::var("GENERATOR_URL").ok(),
            generator_api_key: std::env::var("GENERATOR_API_KEY").ok(),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            pricing: PricingConfig::default(),
            plans: PlanCatalog::default(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/ledgerd".into(),
            service_api_key: None,
            generator_url: None,
            generator_api_key: None,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            pricing: PricingConfig::default(),
            plans: PlanCatalog::default(),
        }
    }
}
