//! Route definitions

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use infrastructure::ServerConfig;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;

use crate::{
    error::ApiError,
    handlers,
    middleware::{ProcessTimeLayer, RequestIdLayer},
    state::AppState,
};

/// Create the main router with all routes
///
/// Tracing and CORS are added by the binary; everything that shapes the
/// response contract lives here so tests see it.
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(handlers::health::service_status))
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/generate", post(handlers::generate::generate))
        .route("/audio", post(handlers::generate::generate))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state)
        .layer(DefaultBodyLimit::max(server.max_body_bytes))
        .layer(RequestBodyLimitLayer::new(server.max_body_bytes))
        // One semaphore shared by every route
        .layer(GlobalConcurrencyLimitLayer::new(server.max_concurrent_requests))
        .layer(ProcessTimeLayer::new())
        .layer(RequestIdLayer::new())
}

async fn not_found() -> ApiError {
    ApiError::NotFound("This endpoint does not exist.".to_string())
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
