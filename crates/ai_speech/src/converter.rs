//! Audio format converter for uploaded speech
//!
//! Speech input arrives in whatever container the client recorded (MP3,
//! OGG/Opus, WebM, ...). Duration checks and the synthesis worker both need
//! WAV, so non-WAV input is transcoded with FFmpeg first.

use std::path::Path;
use std::process::Stdio;

use domain::AudioFormat;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::SpeechError;

/// Sample rate of normalised speech input
pub const SPEECH_SAMPLE_RATE: u32 = 16_000;

/// Audio converter for transforming uploaded speech into WAV
///
/// Uses FFmpeg for audio conversion. FFmpeg must be installed on the system.
#[derive(Debug, Clone, Default)]
pub struct AudioConverter {
    /// FFmpeg binary path (defaults to "ffmpeg" in PATH)
    ffmpeg_path: Option<String>,
}

impl AudioConverter {
    /// Create a new audio converter with default settings
    #[must_use]
    pub const fn new() -> Self {
        Self { ffmpeg_path: None }
    }

    /// Create a new audio converter with a custom FFmpeg path
    #[must_use]
    pub fn with_ffmpeg_path(path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: Some(path.into()),
        }
    }

    /// Get the FFmpeg binary path
    fn ffmpeg_path(&self) -> &str {
        self.ffmpeg_path.as_deref().unwrap_or("ffmpeg")
    }

    /// Check if FFmpeg is available on the system
    #[instrument(skip(self))]
    pub async fn is_available(&self) -> bool {
        Command::new(self.ffmpeg_path())
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .is_ok_and(|status| status.success())
    }

    /// Transcode audio to 16 kHz mono 16-bit WAV and write it to `output`
    ///
    /// The output goes to a seekable file rather than a pipe so FFmpeg can
    /// patch the RIFF chunk sizes after encoding.
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::NotAvailable` if FFmpeg cannot be started and
    /// `SpeechError::AudioProcessing` if it rejects the input.
    #[instrument(skip(self, data), fields(input_format = %format, size = data.len()))]
    pub async fn convert_to_wav_file(
        &self,
        data: &[u8],
        format: AudioFormat,
        output: &Path,
    ) -> Result<(), SpeechError> {
        if data.is_empty() {
            return Err(SpeechError::InvalidAudio("Audio data is empty".to_string()));
        }

        let mut cmd = Command::new(self.ffmpeg_path());
        cmd.arg("-loglevel")
            .arg("error")
            .arg("-f")
            .arg(Self::format_to_ffmpeg(format))
            .arg("-i")
            .arg("pipe:0")
            .args(Self::wav_output_options())
            .arg("-y")
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| SpeechError::NotAvailable(format!("Failed to spawn FFmpeg: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(data).await.map_err(|e| {
                SpeechError::AudioProcessing(format!("Failed to write to FFmpeg stdin: {e}"))
            })?;
            // Drop stdin to signal EOF
            drop(stdin);
        }

        let result = child
            .wait_with_output()
            .await
            .map_err(|e| SpeechError::AudioProcessing(format!("Failed to wait for FFmpeg: {e}")))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(SpeechError::AudioProcessing(format!(
                "FFmpeg conversion failed: {stderr}"
            )));
        }

        let written = tokio::fs::metadata(output)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if written == 0 {
            return Err(SpeechError::AudioProcessing(
                "FFmpeg produced empty output".to_string(),
            ));
        }

        debug!(bytes = written, "Conversion to WAV successful");
        Ok(())
    }

    /// Get the FFmpeg demuxer name for an input format
    const fn format_to_ffmpeg(format: AudioFormat) -> &'static str {
        match format {
            AudioFormat::Opus | AudioFormat::Ogg => "ogg",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
            AudioFormat::Webm => "webm",
            AudioFormat::M4a => "mov", // FFmpeg demuxes m4a through the mov demuxer
        }
    }

    /// PCM 16-bit, mono, 16kHz for speech processing
    const fn wav_output_options() -> [&'static str; 8] {
        [
            "-codec:a",
            "pcm_s16le",
            "-ar",
            "16000",
            "-ac",
            "1",
            "-f",
            "wav",
        ]
    }
}
