//! Infrastructure layer - Adapters for external systems
//!
//! Implements ports defined in the application layer: the reasoning
//! service, the synthesis worker, FFmpeg conversion and the artifact
//! directory. Also owns configuration loading and logging setup.

pub mod adapters;
pub mod cache;
pub mod config;
pub mod telemetry;
pub mod voices;

pub use adapters::*;
pub use cache::FileArtifactStore;
pub use config::{
    AppConfig, CacheConfig, RouterConfig, ScratchConfig, ServerConfig, SpeechInputConfig,
    VoicesConfig,
};
pub use telemetry::{LogFormat, TelemetryConfig, TelemetryError, init_telemetry};
pub use voices::load_voice_catalog;
