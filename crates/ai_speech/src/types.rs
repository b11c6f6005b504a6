//! Types exchanged with the synthesis worker

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// What to synthesize and in whose voice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    /// Text to speak, possibly with paralinguistic markers
    pub content: String,
    /// Local path of the reference voice WAV
    pub voice_path: PathBuf,
    /// Delivery style handed to the model as a scene description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_instruction: Option<String>,
    /// Transcript of the reference clip, improves cloning when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone_text: Option<String>,
    /// Request the call belongs to, for worker-side logging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl SynthesisRequest {
    #[must_use]
    pub fn new(content: impl Into<String>, voice_path: impl AsRef<Path>) -> Self {
        Self {
            content: content.into(),
            voice_path: voice_path.as_ref().to_path_buf(),
            style_instruction: None,
            clone_text: None,
            request_id: None,
        }
    }

    /// Set the delivery style
    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style_instruction = Some(style.into());
        self
    }

    /// Set the reference transcript
    #[must_use]
    pub fn with_clone_text(mut self, clone_text: Option<String>) -> Self {
        self.clone_text = clone_text.filter(|t| !t.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// Result of speech-to-text transcription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcription {
    /// Transcribed text
    pub text: String,
    /// Detected language (ISO 639-1 code)
    #[serde(default)]
    pub language: Option<String>,
    /// Duration of the audio in milliseconds
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl Transcription {
    /// Create a simple transcription with just text
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: None,
            duration_ms: None,
        }
    }

    /// Set the detected language
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Set the duration
    #[must_use]
    pub const fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Check if transcription is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
