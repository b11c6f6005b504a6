//! Configuration for the synthesis worker client

use serde::{Deserialize, Serialize};

/// Configuration for the synthesis worker connection
#[derive(Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Base URL of the synthesis worker
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Shared secret sent as a bearer token
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Timeout for the liveness probe in milliseconds
    #[serde(default = "default_health_timeout_ms")]
    pub health_timeout_ms: u64,

    /// Seconds between artifact eviction runs (0 disables the task)
    #[serde(default = "default_eviction_interval_secs")]
    pub eviction_interval_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:6000".to_string()
}

const fn default_timeout_ms() -> u64 {
    120_000 // synthesis of a long reply can take close to two minutes
}

const fn default_health_timeout_ms() -> u64 {
    3_000
}

const fn default_eviction_interval_secs() -> u64 {
    600
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_token: None,
            timeout_ms: default_timeout_ms(),
            health_timeout_ms: default_health_timeout_ms(),
            eviction_interval_secs: default_eviction_interval_secs(),
        }
    }
}

impl std::fmt::Debug for SpeechConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechConfig")
            .field("base_url", &self.base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_ms", &self.timeout_ms)
            .field("health_timeout_ms", &self.health_timeout_ms)
            .field("eviction_interval_secs", &self.eviction_interval_secs)
            .finish()
    }
}
