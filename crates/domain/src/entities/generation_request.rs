//! Normalized generation request and its cache-relevant fields

use serde::{Deserialize, Serialize};

use crate::entities::audio::{DecodedAudio, payload_digest};
use crate::entities::voice::VoiceDescriptor;
use crate::errors::DomainError;
use crate::value_objects::{AudioFormat, DurationBounds, RequestId};

/// Seed used when the client sends none
pub const DEFAULT_SEED: u64 = 42;

/// Separator between canonical fields (ASCII unit separator)
const FIELD_SEPARATOR: char = '\u{1f}';

/// Speech supplied with a request for STS or STT
#[derive(Clone, PartialEq, Eq)]
pub struct SpeechInput {
    encoded: String,
    format: AudioFormat,
}

impl SpeechInput {
    pub fn new(encoded: impl Into<String>, format: AudioFormat) -> Self {
        Self {
            encoded: encoded.into(),
            format,
        }
    }

    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    pub const fn format(&self) -> AudioFormat {
        self.format
    }

    /// Content digest of the decoded audio
    pub fn digest(&self) -> String {
        payload_digest(&self.encoded).to_hex().to_string()
    }

    /// Decode as WAV and check the input-speech window
    ///
    /// Only valid for WAV payloads; other formats are transcoded first.
    pub fn decode_wav(&self) -> Result<DecodedAudio, DomainError> {
        let audio = DecodedAudio::from_base64(&self.encoded)?;
        audio.ensure_within(DurationBounds::speech_input())?;
        Ok(audio)
    }
}

impl std::fmt::Debug for SpeechInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechInput")
            .field("encoded_len", &self.encoded.len())
            .field("format", &self.format)
            .finish()
    }
}

/// A request after normalization, scoped to one orchestration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    id: RequestId,
    text: String,
    system_instruction: Option<String>,
    voice: VoiceDescriptor,
    speech_input: Option<SpeechInput>,
    seed: u64,
}

impl GenerationRequest {
    /// Create a request for the given text with default voice and seed
    pub fn new(text: impl Into<String>) -> Result<Self, DomainError> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(DomainError::ValidationError(
                "text must not be empty".to_string(),
            ));
        }

        Ok(Self {
            id: RequestId::new(),
            text,
            system_instruction: None,
            voice: VoiceDescriptor::default(),
            speech_input: None,
            seed: DEFAULT_SEED,
        })
    }

    /// Set the system instruction; blank strings count as absent
    #[must_use]
    pub fn with_system_instruction(mut self, system: Option<String>) -> Self {
        self.system_instruction = system
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }

    #[must_use]
    pub fn with_voice(mut self, voice: VoiceDescriptor) -> Self {
        self.voice = voice;
        self
    }

    #[must_use]
    pub fn with_speech_input(mut self, speech: SpeechInput) -> Self {
        self.speech_input = Some(speech);
        self
    }

    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub const fn with_id(mut self, id: RequestId) -> Self {
        self.id = id;
        self
    }

    pub const fn id(&self) -> RequestId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn system_instruction(&self) -> Option<&str> {
        self.system_instruction.as_deref()
    }

    pub const fn voice(&self) -> &VoiceDescriptor {
        &self.voice
    }

    pub const fn speech_input(&self) -> Option<&SpeechInput> {
        self.speech_input.as_ref()
    }

    pub const fn has_speech_input(&self) -> bool {
        self.speech_input.is_some()
    }

    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// The fields the cache key is derived from
    pub fn canonical_fields(&self) -> CanonicalFields {
        CanonicalFields {
            text: self.text.clone(),
            system_instruction: self.system_instruction.clone().unwrap_or_default(),
            voice_identifier: self.voice.identifier(),
            seed: self.seed,
            speech_digest: self.speech_input.as_ref().map(SpeechInput::digest),
        }
    }
}

/// Cache-relevant projection of a request
///
/// Contains no request id, timestamp or randomness, so two requests with the
/// same fields always produce the same canonical string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalFields {
    pub text: String,
    pub system_instruction: String,
    pub voice_identifier: String,
    pub seed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_digest: Option<String>,
}

impl CanonicalFields {
    /// Join the fields into the string handed to the key derivation
    pub fn canonical_string(&self) -> String {
        let mut out = String::with_capacity(
            self.text.len() + self.system_instruction.len() + self.voice_identifier.len() + 96,
        );
        out.push_str(&self.text);
        out.push(FIELD_SEPARATOR);
        out.push_str(&self.system_instruction);
        out.push(FIELD_SEPARATOR);
        out.push_str(&self.voice_identifier);
        out.push(FIELD_SEPARATOR);
        out.push_str(&self.seed.to_string());
        if let Some(digest) = &self.speech_digest {
            out.push(FIELD_SEPARATOR);
            out.push_str(digest);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_text_and_applies_defaults() {
        let req = GenerationRequest::new("  hello there ").unwrap();
        assert_eq!(req.text(), "hello there");
        assert_eq!(req.seed(), 42);
        assert_eq!(req.voice(), &VoiceDescriptor::preset("alloy"));
        assert!(req.system_instruction().is_none());
        assert!(!req.has_speech_input());
    }

    #[test]
    fn blank_text_rejected() {
        assert!(GenerationRequest::new("   \n").is_err());
    }

    #[test]
    fn blank_system_instruction_is_absent() {
        let req = GenerationRequest::new("hi")
            .unwrap()
            .with_system_instruction(Some("   ".into()));
        assert!(req.system_instruction().is_none());
    }

    #[test]
    fn canonical_fields_ignore_request_id() {
        let a = GenerationRequest::new("hi").unwrap();
        let b = GenerationRequest::new("hi").unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(
            a.canonical_fields().canonical_string(),
            b.canonical_fields().canonical_string()
        );
    }

    #[test]
    fn canonical_string_changes_with_each_field() {
        let base = GenerationRequest::new("hi").unwrap();
        let s = |r: &GenerationRequest| r.canonical_fields().canonical_string();

        let other_seed = base.clone().with_seed(7);
        let other_voice = base.clone().with_voice(VoiceDescriptor::preset("nova"));
        let other_system = base
            .clone()
            .with_system_instruction(Some("be brief".into()));
        let with_speech = base
            .clone()
            .with_speech_input(SpeechInput::new("UklGRg==", AudioFormat::Wav));

        assert_ne!(s(&base), s(&other_seed));
        assert_ne!(s(&base), s(&other_voice));
        assert_ne!(s(&base), s(&other_system));
        assert_ne!(s(&base), s(&with_speech));
    }

    #[test]
    fn separator_prevents_field_bleed() {
        let a = CanonicalFields {
            text: "ab".into(),
            system_instruction: "c".into(),
            voice_identifier: "alloy".into(),
            seed: 1,
            speech_digest: None,
        };
        let b = CanonicalFields {
            text: "a".into(),
            system_instruction: "bc".into(),
            ..a.clone()
        };
        assert_ne!(a.canonical_string(), b.canonical_string());
    }

    #[test]
    fn speech_digest_ignores_data_url_prefix() {
        let a = SpeechInput::new("UklGRg==", AudioFormat::Wav);
        let b = SpeechInput::new("data:audio/wav;base64,UklGRg==", AudioFormat::Wav);
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn speech_digest_ignores_line_wrapping() {
        let a = SpeechInput::new("SUQzBAAAAAAAI1RTU0UAAAAPAAADTGF2ZjU4", AudioFormat::Mp3);
        let b = SpeechInput::new("SUQzBAAAAAAAI1RT\nU0UAAAAPAAADTGF2\nZjU4", AudioFormat::Mp3);
        assert_eq!(a.digest(), b.digest());
    }
}
