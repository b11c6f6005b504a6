//! Application configuration
//!
//! Loaded in layers: built-in defaults, then an optional `config.toml`,
//! then `VOICEGATE_*` environment variables with `__` separating nested
//! keys (e.g. `VOICEGATE_SERVER__PORT=9000`).

mod server;
mod storage;

use ai_core::InferenceConfig;
use ai_speech::SpeechConfig;
use serde::{Deserialize, Serialize};

pub use server::ServerConfig;
pub use storage::{CacheConfig, RouterConfig, ScratchConfig, SpeechInputConfig, VoicesConfig};

const ENV_PREFIX: &str = "VOICEGATE";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Reasoning service
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Synthesis worker
    #[serde(default)]
    pub speech: SpeechConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub scratch: ScratchConfig,

    #[serde(default)]
    pub voices: VoicesConfig,

    #[serde(default)]
    pub router: RouterConfig,

    #[serde(default)]
    pub speech_input: SpeechInputConfig,
}

impl AppConfig {
    /// Load configuration from `config.toml` (optional) and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the result is invalid.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::finish(builder)
    }

    /// Parse configuration from a TOML document
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be parsed or the result is invalid.
    pub fn from_toml(document: &str) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(document, config::FileFormat::Toml));
        Self::finish(builder)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, config::ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` naming the offending key.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let invalid = |msg: &str| Err(config::ConfigError::Message(msg.to_string()));

        if self.server.max_concurrent_requests == 0 {
            return invalid("server.max_concurrent_requests must be at least 1");
        }
        if self.router.max_rounds == 0 {
            return invalid("router.max_rounds must be at least 1");
        }
        if self.voices.default_voice.trim().is_empty() {
            return invalid("voices.default_voice must not be empty");
        }
        if !matches!(self.server.log_format.as_str(), "text" | "json") {
            return invalid("server.log_format must be \"text\" or \"json\"");
        }
        Ok(())
    }
}
