//! Application services - Use case implementations

pub mod health_service;
pub mod intent_refiner;
pub mod orchestrator;
pub mod paralinguistics;
pub mod pipeline_router;
pub mod pipelines;
pub mod scratch_space;
pub mod speech_input;
pub mod timing;
pub mod voice_resolver;

pub use health_service::{HealthConfig, HealthService, ReadinessReport, ServiceHealth};
pub use intent_refiner::IntentRefiner;
pub use orchestrator::{GenerationOutcome, OrchestratorDeps, RequestOrchestrator};
pub use pipeline_router::{PipelineRouter, RouterState, RoutingContext, RoutingDecision};
pub use pipelines::{PipelineExecutor, PipelineInputs};
pub use scratch_space::{ScratchRoot, ScratchSpace};
pub use speech_input::{SpeechInputPreparer, ValidatedSpeech};
pub use timing::TimingStats;
pub use voice_resolver::{ValidatedVoice, VoiceCatalog, VoiceResolver};
