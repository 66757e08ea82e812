//! HTTP server configuration.

use serde::{Deserialize, Serialize};

/// Settings for the HTTP API listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind, `host:port`.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Origins allowed by CORS. Empty means same-origin only.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Serve static sample rows from listing endpoints when the store is down.
    #[serde(default = "default_true")]
    pub fallback_to_mock_data: bool,

    /// How long a cached admin listing stays fresh, in seconds. 0 disables caching.
    #[serde(default = "default_cache_ttl")]
    pub listing_cache_ttl_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_origins: Vec::new(),
            fallback_to_mock_data: true,
            listing_cache_ttl_seconds: default_cache_ttl(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    60
}
