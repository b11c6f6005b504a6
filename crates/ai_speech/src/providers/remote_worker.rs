//! Remote synthesis worker client
//!
//! Talks JSON over HTTP to the long-lived process that keeps the speech
//! models loaded. Each operation is `POST {base_url}/rpc/{operation}`.
//!
//! # Error envelope
//!
//! Failures come back as `{"error": {"kind": "...", "message": "..."}}` with
//! a non-2xx status. Kinds `busy` and `resource_exhausted` are transient;
//! `malformed_audio` marks unusable input for transcription.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use domain::PcmAudio;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::SpeechConfig;
use crate::error::SpeechError;
use crate::ports::SynthesisService;
use crate::types::{SynthesisRequest, Transcription};

/// HTTP client for the synthesis worker
#[derive(Clone)]
pub struct RemoteWorkerClient {
    client: Client,
    config: SpeechConfig,
}

impl std::fmt::Debug for RemoteWorkerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteWorkerClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Which operation a failure belongs to, for mapping untyped errors
#[derive(Debug, Clone, Copy)]
enum Operation {
    CacheName,
    Transcribe,
    SpeechSynthesis,
    EvictStaleArtifacts,
}

impl Operation {
    const fn path(self) -> &'static str {
        match self {
            Self::CacheName => "cache_name",
            Self::Transcribe => "transcribe",
            Self::SpeechSynthesis => "speech_synthesis",
            Self::EvictStaleArtifacts => "evict_stale_artifacts",
        }
    }

    fn failure(self, message: String) -> SpeechError {
        match self {
            Self::Transcribe => SpeechError::TranscriptionFailed(message),
            Self::SpeechSynthesis => SpeechError::SynthesisFailed(message),
            Self::CacheName | Self::EvictStaleArtifacts => SpeechError::RequestFailed(message),
        }
    }
}

impl RemoteWorkerClient {
    /// Create a new worker client
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Configuration` if the base URL is empty or the
    /// HTTP client cannot be built.
    pub fn new(config: SpeechConfig) -> Result<Self, SpeechError> {
        if config.base_url.trim().is_empty() {
            return Err(SpeechError::Configuration(
                "synthesis worker base_url is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| {
                SpeechError::Configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self { client, config })
    }

    fn rpc_url(&self, operation: Operation) -> String {
        format!(
            "{}/rpc/{}",
            self.config.base_url.trim_end_matches('/'),
            operation.path()
        )
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.config.base_url.trim_end_matches('/'))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth_token {
            Some(token) if !token.is_empty() => builder.bearer_auth(token),
            _ => builder,
        }
    }

    async fn call<B, R>(&self, operation: Operation, body: &B) -> Result<R, SpeechError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .authorize(self.client.post(self.rpc_url(operation)))
            .json(body)
            .send()
            .await
            .map_err(|e| SpeechError::from_transport(&e, self.config.timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(operation = operation.path(), status = %status, "Synthesis worker call failed");
            return Err(map_worker_error(operation, status, &error_body));
        }

        response
            .json()
            .await
            .map_err(|e| SpeechError::InvalidResponse(format!("Failed to parse response: {e}")))
    }
}

/// Worker error envelope
#[derive(Debug, Deserialize)]
struct WorkerError {
    error: WorkerErrorDetail,
}

#[derive(Debug, Deserialize)]
struct WorkerErrorDetail {
    #[serde(default)]
    kind: Option<String>,
    message: String,
}

fn map_worker_error(operation: Operation, status: StatusCode, body: &str) -> SpeechError {
    if let Ok(envelope) = serde_json::from_str::<WorkerError>(body) {
        let message = envelope.error.message;
        return match envelope.error.kind.as_deref() {
            Some("busy") => SpeechError::WorkerBusy(message),
            Some("resource_exhausted") => SpeechError::ResourceExhausted(message),
            Some("malformed_audio") => SpeechError::TranscriptionFailed(message),
            Some("unavailable") => SpeechError::ServiceUnavailable(message),
            _ => operation.failure(message),
        };
    }

    match status {
        StatusCode::TOO_MANY_REQUESTS => SpeechError::WorkerBusy(format!("HTTP {status}")),
        StatusCode::SERVICE_UNAVAILABLE => {
            SpeechError::ServiceUnavailable(format!("HTTP {status}: {body}"))
        },
        _ => operation.failure(format!("HTTP {status}: {body}")),
    }
}

#[derive(Debug, Serialize)]
struct CacheNameRequest<'a> {
    canonical: &'a str,
}

#[derive(Debug, Deserialize)]
struct CacheNameResponse {
    digest: String,
}

#[derive(Debug, Serialize)]
struct TranscribeRequest<'a> {
    audio_path: &'a Path,
    request_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct SynthesisResponse {
    samples_b64: String,
    sample_rate: u32,
}

#[derive(Debug, Serialize)]
struct EvictRequest {}

#[derive(Debug, Deserialize)]
struct EvictResponse {
    #[serde(default)]
    removed: u64,
}

/// Decode little-endian `f32` samples
fn decode_samples(encoded: &str) -> Result<Vec<f32>, SpeechError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| SpeechError::InvalidResponse(format!("samples are not base64: {e}")))?;

    if bytes.len() % 4 != 0 {
        return Err(SpeechError::InvalidResponse(format!(
            "sample buffer length {} is not a multiple of 4",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

#[async_trait]
impl SynthesisService for RemoteWorkerClient {
    #[instrument(skip(self, canonical), fields(canonical_len = canonical.len()))]
    async fn cache_name(&self, canonical: &str) -> Result<String, SpeechError> {
        let response: CacheNameResponse = self
            .call(Operation::CacheName, &CacheNameRequest { canonical })
            .await?;

        let digest = response.digest.trim().to_string();
        if digest.is_empty() {
            return Err(SpeechError::InvalidResponse("empty cache digest".to_string()));
        }

        debug!(digest = %digest, "Derived cache name");
        Ok(digest)
    }

    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe(
        &self,
        audio_path: &Path,
        request_id: &str,
    ) -> Result<Transcription, SpeechError> {
        let transcription: Transcription = self
            .call(
                Operation::Transcribe,
                &TranscribeRequest {
                    audio_path,
                    request_id,
                },
            )
            .await?;

        debug!(chars = transcription.text.len(), "Transcription complete");
        Ok(transcription)
    }

    #[instrument(skip(self, request), fields(
        content_len = request.content.len(),
        voice = %request.voice_path.display()
    ))]
    async fn speech_synthesis(&self, request: SynthesisRequest) -> Result<PcmAudio, SpeechError> {
        let response: SynthesisResponse = self.call(Operation::SpeechSynthesis, &request).await?;

        if response.sample_rate == 0 {
            return Err(SpeechError::InvalidResponse("sample_rate is zero".to_string()));
        }

        let samples = decode_samples(&response.samples_b64)?;
        if samples.is_empty() {
            return Err(SpeechError::SynthesisFailed(
                "worker returned no audio".to_string(),
            ));
        }

        debug!(
            samples = samples.len(),
            sample_rate = response.sample_rate,
            "Synthesis complete"
        );
        Ok(PcmAudio::new(samples, response.sample_rate))
    }

    #[instrument(skip(self))]
    async fn evict_stale_artifacts(&self) -> Result<u64, SpeechError> {
        let response: EvictResponse = self
            .call(Operation::EvictStaleArtifacts, &EvictRequest {})
            .await?;
        Ok(response.removed)
    }

    async fn is_available(&self) -> bool {
        let response = self
            .authorize(self.client.get(self.health_url()))
            .timeout(Duration::from_millis(self.config.health_timeout_ms))
            .send()
            .await;

        match response {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Synthesis worker health check failed");
                false
            },
        }
    }
}
