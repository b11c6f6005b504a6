//! Application-level errors

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Malformed or missing request fields
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A voice reference could not be decoded, measured or located
    #[error("Invalid voice: {0}")]
    VoiceResolution(String),

    /// Reasoning service unreachable or returned something unusable
    #[error("Reasoning service error: {0}")]
    UpstreamReasoning(String),

    /// Reasoning service did not answer in time
    #[error("Reasoning service timed out after {0}ms")]
    ReasoningTimeout(u64),

    /// Synthesis worker failure
    #[error("Synthesis failed: {message}")]
    Synthesis { message: String, retryable: bool },

    /// Transcription failure, usually malformed speech input
    #[error("Transcription failed: {0}")]
    Transcription(String),

    /// The router returned no usable tool call
    #[error("No pipeline was executed")]
    NoPipelineExecuted,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Synthesis failure the worker marked as transient
    pub fn synthesis(message: impl Into<String>, retryable: bool) -> Self {
        Self::Synthesis {
            message: message.into(),
            retryable,
        }
    }

    /// Check if this error is retryable by the caller
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Synthesis { retryable: true, .. })
    }

    /// Whether the error stems from client input rather than a collaborator
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::VoiceResolution(_))
    }

    /// Whether the reasoning collaborator failed
    pub const fn is_reasoning_failure(&self) -> bool {
        matches!(self, Self::UpstreamReasoning(_) | Self::ReasoningTimeout(_))
    }
}

impl From<DomainError> for ApplicationError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidAudio(_) | DomainError::DurationOutOfBounds { .. } => {
                Self::VoiceResolution(err.to_string())
            },
            DomainError::ValidationError(msg) => Self::Validation(msg),
            DomainError::InvalidCacheKey(_) => Self::Synthesis {
                message: err.to_string(),
                retryable: false,
            },
            DomainError::UnknownPipeline(_)
            | DomainError::InvalidPipelineArguments { .. }
            | DomainError::NotFound { .. } => Self::Internal(err.to_string()),
        }
    }
}
