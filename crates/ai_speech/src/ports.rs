//! Port definitions for the synthesis worker
//!
//! Defines the trait that synthesis worker adapters must implement.

use async_trait::async_trait;
use domain::PcmAudio;
use std::path::Path;

use crate::error::SpeechError;
use crate::types::{SynthesisRequest, Transcription};

/// Port for the persistent synthesis worker
///
/// The worker owns the speech models; every call is a blocking RPC from the
/// caller's point of view. Implementations must not assume calls are
/// serialized: several requests may be in flight at once.
///
/// # Example
///
/// ```ignore
/// use ai_speech::{SynthesisService, SynthesisRequest};
///
/// async fn speak(worker: &impl SynthesisService, text: &str) -> Result<Vec<u8>, SpeechError> {
///     let pcm = worker
///         .speech_synthesis(SynthesisRequest::new(text, "voices/alloy.wav"))
///         .await?;
///     Ok(pcm.to_wav()?)
/// }
/// ```
#[async_trait]
pub trait SynthesisService: Send + Sync {
    /// Derive the cache key for a canonical field string
    ///
    /// # Arguments
    ///
    /// * `canonical` - Canonical fields joined by the unit separator
    ///
    /// # Returns
    ///
    /// Returns a filesystem-safe digest. The same input always yields the
    /// same digest.
    ///
    /// # Errors
    ///
    /// Returns `SpeechError` if the worker cannot be reached.
    async fn cache_name(&self, canonical: &str) -> Result<String, SpeechError>;

    /// Transcribe a WAV file on the shared filesystem
    ///
    /// # Arguments
    ///
    /// * `audio_path` - Path of the WAV file, readable by the worker
    /// * `request_id` - Request the call belongs to
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::TranscriptionFailed` for malformed audio.
    async fn transcribe(
        &self,
        audio_path: &Path,
        request_id: &str,
    ) -> Result<Transcription, SpeechError>;

    /// Synthesize speech in the given reference voice
    ///
    /// # Returns
    ///
    /// Returns mono floating-point samples and their sample rate.
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::WorkerBusy`/`ResourceExhausted` for transient
    /// capacity problems and `SynthesisFailed` otherwise.
    async fn speech_synthesis(&self, request: SynthesisRequest) -> Result<PcmAudio, SpeechError>;

    /// Remove stale artifacts from the shared artifact directory
    ///
    /// # Returns
    ///
    /// Returns the number of artifacts removed.
    async fn evict_stale_artifacts(&self) -> Result<u64, SpeechError>;

    /// Check if the worker is reachable and ready
    async fn is_available(&self) -> bool;
}
