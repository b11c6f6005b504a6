//! Synthesis port - Interface to the persistent synthesis worker
//!
//! The worker keeps model weights resident and is shared by every request.
//! Implementations add no locking of their own; "busy" comes back as a
//! retryable [`ApplicationError::Synthesis`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use domain::PcmAudio;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Everything the worker needs for one synthesis call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechSynthesisRequest {
    /// Text to speak, possibly with paralinguistic markers
    pub content: String,
    /// Reference voice file on the worker's filesystem
    pub voice_path: PathBuf,
    /// Delivery style wrapped for the model
    pub style_instruction: Option<String>,
    /// Transcript of the reference voice, improves cloning
    pub clone_text: Option<String>,
    pub request_id: String,
}

/// Port for the synthesis worker RPC surface
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SynthesisPort: Send + Sync {
    /// Digest of a canonical string, used as the cache key
    async fn cache_name(&self, canonical: &str) -> Result<String, ApplicationError>;

    /// Transcribe a WAV file in request scratch space
    async fn transcribe(&self, audio_path: &Path, request_id: &str)
    -> Result<String, ApplicationError>;

    /// Synthesize speech
    async fn speech_synthesis(
        &self,
        request: SpeechSynthesisRequest,
    ) -> Result<PcmAudio, ApplicationError>;

    /// Remove expired artifacts; returns how many were deleted
    async fn evict_stale_artifacts(&self) -> Result<u64, ApplicationError>;

    /// Check if the worker answers its liveness probe
    async fn is_available(&self) -> bool;
}
