//! Domain-level errors

use thiserror::Error;

/// Errors that can occur in the domain layer
#[derive(Debug, Error)]
pub enum DomainError {
    /// Audio payload could not be decoded
    #[error("Invalid audio: {0}")]
    InvalidAudio(String),

    /// Audio decoded but its duration is outside the accepted window
    #[error("Audio duration {duration_ms}ms outside allowed range {min_ms}-{max_ms}ms")]
    DurationOutOfBounds {
        duration_ms: u64,
        min_ms: u64,
        max_ms: u64,
    },

    /// Cache key is not a filesystem-safe digest
    #[error("Invalid cache key: {0}")]
    InvalidCacheKey(String),

    /// Tool name does not map to a known pipeline
    #[error("Unknown pipeline: {0}")]
    UnknownPipeline(String),

    /// Tool arguments do not match the pipeline schema
    #[error("Invalid pipeline arguments for {pipeline}: {reason}")]
    InvalidPipelineArguments { pipeline: String, reason: String },

    /// Entity not found
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    /// Validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

impl DomainError {
    /// Create a not found error
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Create an argument-schema error for a pipeline
    pub fn invalid_arguments(pipeline: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPipelineArguments {
            pipeline: pipeline.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error concerns a supplied audio payload
    pub const fn is_audio_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidAudio(_) | Self::DurationOutOfBounds { .. }
        )
    }
}
