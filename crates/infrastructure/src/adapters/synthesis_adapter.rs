//! Synthesis adapter - Implements SynthesisPort using the ai_speech worker client

use std::path::Path;
use std::sync::Arc;

use ai_speech::{RemoteWorkerClient, SpeechConfig, SpeechError, SynthesisRequest, SynthesisService};
use application::error::ApplicationError;
use application::ports::{SpeechSynthesisRequest, SynthesisPort};
use async_trait::async_trait;
use domain::PcmAudio;
use tracing::{debug, instrument};

/// Adapter for the persistent synthesis worker
pub struct SynthesisAdapter {
    worker: Arc<dyn SynthesisService>,
}

impl std::fmt::Debug for SynthesisAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisAdapter").finish_non_exhaustive()
    }
}

impl SynthesisAdapter {
    /// Create an adapter talking to the worker described by `config`
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Configuration` if the HTTP client cannot be built.
    pub fn new(config: SpeechConfig) -> Result<Self, ApplicationError> {
        let worker = RemoteWorkerClient::new(config)
            .map_err(|e| ApplicationError::Configuration(e.to_string()))?;
        Ok(Self::with_service(Arc::new(worker)))
    }

    pub fn with_service(worker: Arc<dyn SynthesisService>) -> Self {
        Self { worker }
    }

    fn map_error(err: SpeechError) -> ApplicationError {
        let retryable = err.is_retryable();
        match err {
            SpeechError::Configuration(e) => ApplicationError::Configuration(e),
            SpeechError::TranscriptionFailed(e) => ApplicationError::Transcription(e),
            SpeechError::InvalidAudio(e) => {
                ApplicationError::Validation(format!("invalid speech audio: {e}"))
            },
            other => ApplicationError::synthesis(other.to_string(), retryable),
        }
    }
}

#[async_trait]
impl SynthesisPort for SynthesisAdapter {
    async fn cache_name(&self, canonical: &str) -> Result<String, ApplicationError> {
        self.worker
            .cache_name(canonical)
            .await
            .map_err(Self::map_error)
    }

    #[instrument(skip(self))]
    async fn transcribe(
        &self,
        audio_path: &Path,
        request_id: &str,
    ) -> Result<String, ApplicationError> {
        let transcription = self
            .worker
            .transcribe(audio_path, request_id)
            .await
            .map_err(Self::map_error)?;
        debug!(
            language = ?transcription.language,
            chars = transcription.text.len(),
            "Transcription received"
        );
        Ok(transcription.text)
    }

    #[instrument(skip_all, fields(request_id = %request.request_id))]
    async fn speech_synthesis(
        &self,
        request: SpeechSynthesisRequest,
    ) -> Result<PcmAudio, ApplicationError> {
        let mut wire = SynthesisRequest::new(request.content, &request.voice_path)
            .with_clone_text(request.clone_text)
            .with_request_id(request.request_id);
        if let Some(style) = request.style_instruction {
            wire = wire.with_style(style);
        }

        self.worker
            .speech_synthesis(wire)
            .await
            .map_err(Self::map_error)
    }

    async fn evict_stale_artifacts(&self) -> Result<u64, ApplicationError> {
        self.worker
            .evict_stale_artifacts()
            .await
            .map_err(Self::map_error)
    }

    async fn is_available(&self) -> bool {
        self.worker.is_available().await
    }
}
