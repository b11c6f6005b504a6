//! Audio conversion adapter - Implements AudioConversionPort with FFmpeg

use std::path::Path;

use ai_speech::{AudioConverter, SpeechError};
use application::error::ApplicationError;
use application::ports::AudioConversionPort;
use async_trait::async_trait;
use domain::AudioFormat;

/// Converts uploaded speech to WAV through the ai_speech FFmpeg wrapper
#[derive(Debug, Clone, Default)]
pub struct AudioConversionAdapter {
    converter: AudioConverter,
}

impl AudioConversionAdapter {
    pub fn new(ffmpeg_path: Option<&str>) -> Self {
        let converter = ffmpeg_path.map_or_else(AudioConverter::new, AudioConverter::with_ffmpeg_path);
        Self { converter }
    }

    /// Whether FFmpeg can be executed
    pub async fn is_available(&self) -> bool {
        self.converter.is_available().await
    }
}

#[async_trait]
impl AudioConversionPort for AudioConversionAdapter {
    async fn convert_to_wav(
        &self,
        data: &[u8],
        format: AudioFormat,
        output: &Path,
    ) -> Result<(), ApplicationError> {
        self.converter
            .convert_to_wav_file(data, format, output)
            .await
            .map_err(|e| match e {
                SpeechError::InvalidAudio(msg) | SpeechError::AudioProcessing(msg) => {
                    ApplicationError::Validation(format!("invalid speech audio: {msg}"))
                },
                SpeechError::NotAvailable(msg) => ApplicationError::Configuration(msg),
                other => ApplicationError::Internal(other.to_string()),
            })
    }
}
