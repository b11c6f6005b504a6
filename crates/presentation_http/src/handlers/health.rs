//! Health check handlers

use application::ReadinessReport;
use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Liveness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// Liveness check - is the server running?
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "alive".to_string(),
        message: "Still breathing!".to_string(),
    })
}

/// Readiness check - can the reasoning service and synthesis worker be reached?
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<ReadinessReport>) {
    let report = state.health.check_all().await;
    let status = if report.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

/// Endpoint listing served at `/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub status: String,
    pub version: String,
    pub endpoints: Endpoints,
    pub voices: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    pub generate: String,
    pub health: String,
    pub ready: String,
}

pub async fn service_status(State(state): State<AppState>) -> Json<ServiceStatus> {
    let mut voices: Vec<String> = state.voices.names().map(ToString::to_string).collect();
    voices.sort();

    Json(ServiceStatus {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: Endpoints {
            generate: "POST /generate (alias POST /audio)".to_string(),
            health: "GET /health".to_string(),
            ready: "GET /ready".to_string(),
        },
        voices,
        message: "All systems operational!".to_string(),
    })
}
