//! Speech input preparation
//!
//! Every upload is measured before the request touches a remote service.
//! Containers other than WAV are transcoded into a short-lived temporary
//! file first; the normalized WAV is later copied into scratch space.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use domain::{AudioFormat, DecodedAudio, DomainError, DurationBounds, SpeechInput, strip_data_url};
use tracing::{debug, instrument};

use crate::error::ApplicationError;
use crate::ports::AudioConversionPort;
use crate::services::scratch_space::ScratchSpace;

/// File name of the normalized speech input inside scratch space
pub const SPEECH_FILE_NAME: &str = "speech.wav";

/// Speech input as WAV, decoded and within the input window
#[derive(Debug)]
pub struct ValidatedSpeech(DecodedAudio);

impl ValidatedSpeech {
    pub fn audio(&self) -> &DecodedAudio {
        &self.0
    }
}

/// Validates and materializes uploaded speech
pub struct SpeechInputPreparer {
    converter: Arc<dyn AudioConversionPort>,
}

impl fmt::Debug for SpeechInputPreparer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechInputPreparer").finish_non_exhaustive()
    }
}

impl SpeechInputPreparer {
    pub fn new(converter: Arc<dyn AudioConversionPort>) -> Self {
        Self { converter }
    }

    /// Decode the payload, transcode it if needed, and check its duration
    ///
    /// Only the local converter runs here; nothing is written to scratch.
    #[instrument(skip(self, speech), fields(format = %speech.format()))]
    pub async fn validate(&self, speech: &SpeechInput) -> Result<ValidatedSpeech, ApplicationError> {
        if speech.format() == AudioFormat::Wav {
            return speech
                .decode_wav()
                .map(ValidatedSpeech)
                .map_err(invalid_speech);
        }

        let compact: String = strip_data_url(speech.encoded())
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let bytes = STANDARD.decode(compact.as_bytes()).map_err(|e| {
            ApplicationError::Validation(format!("invalid speech audio: base64 decode failed: {e}"))
        })?;
        if bytes.is_empty() {
            return Err(ApplicationError::Validation("invalid speech audio: empty payload".into()));
        }

        let output = tempfile::Builder::new()
            .prefix("voicegate-speech-")
            .suffix(".wav")
            .tempfile()
            .map_err(|e| ApplicationError::Internal(format!("no temp file for conversion: {e}")))?;
        self.converter
            .convert_to_wav(&bytes, speech.format(), output.path())
            .await?;
        let wav = tokio::fs::read(output.path()).await.map_err(|e| {
            ApplicationError::Internal(format!("converted speech unreadable: {e}"))
        })?;

        let audio = DecodedAudio::from_wav_bytes(wav).map_err(invalid_speech)?;
        audio
            .ensure_within(DurationBounds::speech_input())
            .map_err(invalid_speech)?;
        debug!(format = %speech.format(), duration_ms = audio.duration_ms(), "Converted speech input");
        Ok(ValidatedSpeech(audio))
    }

    /// Write the speech into scratch space and return its path
    pub async fn materialize(
        &self,
        validated: ValidatedSpeech,
        scratch: &ScratchSpace,
    ) -> Result<PathBuf, ApplicationError> {
        scratch.write_file(SPEECH_FILE_NAME, validated.0.bytes()).await
    }
}

fn invalid_speech(err: DomainError) -> ApplicationError {
    ApplicationError::Validation(format!("invalid speech audio: {err}"))
}

#[cfg(test)]
mod tests {
    use domain::{PcmAudio, RequestId};

    use super::*;
    use crate::ports::MockAudioConversionPort;
    use crate::services::scratch_space::ScratchRoot;

    fn wav_b64(ms: u64) -> String {
        STANDARD.encode(PcmAudio::silence(ms, 16_000).to_wav().unwrap())
    }

    #[tokio::test]
    async fn wav_within_window_validates() {
        let preparer = SpeechInputPreparer::new(Arc::new(MockAudioConversionPort::new()));
        let speech = SpeechInput::new(wav_b64(2_000), AudioFormat::Wav);
        let validated = preparer.validate(&speech).await.unwrap();
        assert_eq!(validated.audio().duration_ms(), 2_000);
    }

    #[tokio::test]
    async fn overlong_wav_is_rejected() {
        let preparer = SpeechInputPreparer::new(Arc::new(MockAudioConversionPort::new()));
        let speech = SpeechInput::new(wav_b64(60_001), AudioFormat::Wav);
        assert!(matches!(
            preparer.validate(&speech).await.unwrap_err(),
            ApplicationError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn bad_base64_is_rejected_for_any_format() {
        let mut converter = MockAudioConversionPort::new();
        converter.expect_convert_to_wav().never();
        let preparer = SpeechInputPreparer::new(Arc::new(converter));
        let speech = SpeechInput::new("%%%", AudioFormat::Mp3);
        assert!(preparer.validate(&speech).await.is_err());
    }

    #[tokio::test]
    async fn non_wav_is_converted_and_measured() {
        let mut converter = MockAudioConversionPort::new();
        converter
            .expect_convert_to_wav()
            .times(1)
            .withf(|data, format, _| data == b"ID3fake" && *format == AudioFormat::Mp3)
            .returning(|_, _, output| {
                std::fs::write(output, PcmAudio::silence(1_500, 16_000).to_wav().unwrap()).unwrap();
                Ok(())
            });
        let preparer = SpeechInputPreparer::new(Arc::new(converter));

        let validated = preparer
            .validate(&SpeechInput::new(STANDARD.encode(b"ID3fake"), AudioFormat::Mp3))
            .await
            .unwrap();
        assert_eq!(validated.audio().duration_ms(), 1_500);

        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchRoot::new(tmp.path()).create(RequestId::new()).await.unwrap();
        let path = preparer.materialize(validated, &scratch).await.unwrap();

        assert_eq!(path, scratch.file_path(SPEECH_FILE_NAME));
        assert!(std::fs::read(&path).unwrap().starts_with(b"RIFF"));
    }

    #[tokio::test]
    async fn overlong_non_wav_is_rejected_after_conversion() {
        let mut converter = MockAudioConversionPort::new();
        converter.expect_convert_to_wav().times(1).returning(|_, _, output| {
            std::fs::write(output, PcmAudio::silence(61_000, 8_000).to_wav().unwrap()).unwrap();
            Ok(())
        });
        let preparer = SpeechInputPreparer::new(Arc::new(converter));

        let err = preparer
            .validate(&SpeechInput::new(STANDARD.encode(b"OggS..."), AudioFormat::Ogg))
            .await
            .unwrap_err();

        assert!(matches!(err, ApplicationError::Validation(_)));
    }

    #[tokio::test]
    async fn wav_is_written_verbatim() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchRoot::new(tmp.path()).create(RequestId::new()).await.unwrap();
        let preparer = SpeechInputPreparer::new(Arc::new(MockAudioConversionPort::new()));
        let encoded = wav_b64(1_000);

        let validated = preparer
            .validate(&SpeechInput::new(encoded.clone(), AudioFormat::Wav))
            .await
            .unwrap();
        let path = preparer.materialize(validated, &scratch).await.unwrap();

        assert_eq!(std::fs::read(path).unwrap(), STANDARD.decode(encoded).unwrap());
    }
}
