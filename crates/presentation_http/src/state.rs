//! Application state shared across handlers

use std::sync::Arc;

use application::{HealthService, RequestOrchestrator, VoiceCatalog};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Runs generation requests end to end
    pub orchestrator: Arc<RequestOrchestrator>,
    /// Readiness checks for the reasoning service and synthesis worker
    pub health: Arc<HealthService>,
    /// Voice presets, used to tell preset names from inline audio
    pub voices: Arc<VoiceCatalog>,
}
