//! Speech processing errors

use thiserror::Error;

/// Errors that can occur talking to the synthesis worker or converting audio
#[derive(Debug, Error)]
pub enum SpeechError {
    /// Failed to connect to the synthesis worker
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request to the synthesis worker failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Invalid audio format or corrupted data
    #[error("Invalid audio: {0}")]
    InvalidAudio(String),

    /// Transcription failed
    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    /// Synthesis failed
    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    /// Invalid response from the worker
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Timeout during processing
    #[error("Speech processing timeout after {0}ms")]
    Timeout(u64),

    /// Worker is processing another call
    #[error("Synthesis worker busy: {0}")]
    WorkerBusy(String),

    /// Worker ran out of memory or accelerator capacity
    #[error("Synthesis worker resources exhausted: {0}")]
    ResourceExhausted(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Service unavailable
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Audio processing/conversion failed
    #[error("Audio processing failed: {0}")]
    AudioProcessing(String),

    /// Tool not available (not installed or configured)
    #[error("Provider not available: {0}")]
    NotAvailable(String),
}

impl SpeechError {
    /// Whether a caller could reasonably try the same call again later
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::WorkerBusy(_)
                | Self::ResourceExhausted(_)
                | Self::Timeout(_)
                | Self::ServiceUnavailable(_)
        )
    }

    /// Map a transport error, reporting the configured timeout on expiry
    pub fn from_transport(err: &reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout_ms)
        } else if err.is_connect() {
            Self::ConnectionFailed(err.to_string())
        } else {
            Self::RequestFailed(err.to_string())
        }
    }
}

impl From<reqwest::Error> for SpeechError {
    fn from(err: reqwest::Error) -> Self {
        Self::from_transport(&err, 30000)
    }
}
