//! Readiness aggregation service
//!
//! Checks the reasoning service and the synthesis worker concurrently,
//! each under its own timeout, and reports per-backend status.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::ports::{ReasoningPort, SynthesisPort};

/// Default timeout for each backend check in seconds
const DEFAULT_HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

pub const REASONING: &str = "reasoning";
pub const SYNTHESIS: &str = "synthesis";

/// Configuration for readiness checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Timeout for each check in seconds (default: 5)
    #[serde(default = "default_global_timeout")]
    pub global_timeout_secs: u64,

    /// Per-backend overrides in seconds
    #[serde(default)]
    pub service_timeouts: HashMap<String, u64>,
}

const fn default_global_timeout() -> u64 {
    DEFAULT_HEALTH_CHECK_TIMEOUT_SECS
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            global_timeout_secs: default_global_timeout(),
            service_timeouts: HashMap::new(),
        }
    }
}

impl HealthConfig {
    #[must_use]
    pub fn timeout_for_service(&self, service: &str) -> Duration {
        let secs = self
            .service_timeouts
            .get(service)
            .copied()
            .unwrap_or(self.global_timeout_secs);
        Duration::from_secs(secs)
    }
}

/// Status of one backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceHealth {
    #[must_use]
    pub const fn healthy() -> Self {
        Self {
            healthy: true,
            response_time_ms: None,
            error: None,
        }
    }

    #[must_use]
    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            healthy: false,
            response_time_ms: None,
            error: Some(error.into()),
        }
    }

    #[must_use]
    pub fn timeout() -> Self {
        Self::unhealthy("Health check timed out")
    }

    #[must_use]
    pub const fn with_response_time(mut self, ms: u64) -> Self {
        self.response_time_ms = Some(ms);
        self
    }
}

/// Readiness of all backends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessReport {
    /// True only if every backend is healthy
    pub ready: bool,
    pub services: HashMap<String, ServiceHealth>,
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

impl ReadinessReport {
    #[must_use]
    pub fn new(services: HashMap<String, ServiceHealth>) -> Self {
        let ready = services.values().all(|s| s.healthy);
        Self {
            ready,
            services,
            checked_at: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn service_status(&self, name: &str) -> Option<&ServiceHealth> {
        self.services.get(name)
    }
}

/// Aggregates readiness checks across the reasoning and synthesis backends
pub struct HealthService {
    config: HealthConfig,
    reasoning: Arc<dyn ReasoningPort>,
    synthesis: Arc<dyn SynthesisPort>,
}

impl std::fmt::Debug for HealthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HealthService {
    #[must_use]
    pub fn new(reasoning: Arc<dyn ReasoningPort>, synthesis: Arc<dyn SynthesisPort>) -> Self {
        Self {
            config: HealthConfig::default(),
            reasoning,
            synthesis,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: HealthConfig) -> Self {
        self.config = config;
        self
    }

    /// Check every backend concurrently
    #[instrument(skip(self))]
    pub async fn check_all(&self) -> ReadinessReport {
        let (reasoning, synthesis) = tokio::join!(self.check_reasoning(), self.check_synthesis());

        let mut services = HashMap::new();
        services.insert(REASONING.to_string(), reasoning);
        services.insert(SYNTHESIS.to_string(), synthesis);
        ReadinessReport::new(services)
    }

    pub async fn check_reasoning(&self) -> ServiceHealth {
        self.probe(REASONING, self.reasoning.is_healthy()).await
    }

    pub async fn check_synthesis(&self) -> ServiceHealth {
        self.probe(SYNTHESIS, self.synthesis.is_available()).await
    }

    async fn probe(&self, service: &str, check: impl Future<Output = bool>) -> ServiceHealth {
        let start = Instant::now();
        let Ok(healthy) = timeout(self.config.timeout_for_service(service), check).await else {
            warn!(service, "Health check timed out");
            return ServiceHealth::timeout();
        };

        #[allow(clippy::cast_possible_truncation)]
        let response_time = start.elapsed().as_millis() as u64;
        if healthy {
            debug!(service, response_time_ms = response_time, "Backend healthy");
            ServiceHealth::healthy().with_response_time(response_time)
        } else {
            warn!(service, response_time_ms = response_time, "Backend unhealthy");
            ServiceHealth::unhealthy(format!("{service} backend unavailable"))
                .with_response_time(response_time)
        }
    }
}
