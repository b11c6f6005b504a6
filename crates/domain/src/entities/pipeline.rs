//! Pipeline selection, validated tool calls and pipeline outcomes

use serde::{Deserialize, Serialize};

use crate::entities::{Artifact, DecodedAudio};
use crate::errors::DomainError;

/// The four processing pipelines a request can be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PipelineSelection {
    /// Text in, speech out
    Tts,
    /// Text in, text out
    Ttt,
    /// Speech in, speech out
    Sts,
    /// Speech in, text out
    Stt,
}

impl PipelineSelection {
    pub const ALL: [Self; 4] = [Self::Tts, Self::Ttt, Self::Sts, Self::Stt];

    /// Function name exposed to the reasoning service
    pub const fn tool_name(&self) -> &'static str {
        match self {
            Self::Tts => "generate_tts",
            Self::Ttt => "generate_ttt",
            Self::Sts => "generate_sts",
            Self::Stt => "generate_stt",
        }
    }

    pub fn from_tool_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.tool_name() == name)
    }

    /// Whether the pipeline consumes input speech
    pub const fn requires_speech_input(&self) -> bool {
        matches!(self, Self::Sts | Self::Stt)
    }

    /// Whether the pipeline produces audio
    pub const fn produces_audio(&self) -> bool {
        matches!(self, Self::Tts | Self::Sts)
    }
}

impl std::fmt::Display for PipelineSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Tts => "TTS",
            Self::Ttt => "TTT",
            Self::Sts => "STS",
            Self::Stt => "STT",
        };
        f.write_str(label)
    }
}

/// Arguments of `generate_tts`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TtsArgs {
    pub text: String,
    #[serde(rename = "requestID")]
    pub request_id: String,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub clone_text: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
}

/// Arguments of `generate_ttt`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TttArgs {
    pub text: String,
    #[serde(rename = "requestID")]
    pub request_id: String,
    #[serde(default)]
    pub system: Option<String>,
}

/// Arguments of `generate_sts`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StsArgs {
    pub text: String,
    pub synthesis_audio_path: String,
    #[serde(rename = "requestID")]
    pub request_id: String,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub clone_text: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
}

/// Arguments of `generate_stt`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SttArgs {
    pub text: String,
    pub synthesis_audio_path: String,
    #[serde(rename = "requestID")]
    pub request_id: String,
    #[serde(default)]
    pub system: Option<String>,
}

/// A tool call that matched one pipeline's argument schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineCall {
    Tts(TtsArgs),
    Ttt(TttArgs),
    Sts(StsArgs),
    Stt(SttArgs),
}

impl PipelineCall {
    /// Validate a tool name and its JSON-encoded arguments
    pub fn from_tool_call(name: &str, arguments: &str) -> Result<Self, DomainError> {
        let selection = PipelineSelection::from_tool_name(name)
            .ok_or_else(|| DomainError::UnknownPipeline(name.to_string()))?;

        let arguments = if arguments.trim().is_empty() {
            "{}"
        } else {
            arguments
        };
        let schema_err = |e: serde_json::Error| DomainError::invalid_arguments(name, e.to_string());

        let call = match selection {
            PipelineSelection::Tts => Self::Tts(serde_json::from_str(arguments).map_err(schema_err)?),
            PipelineSelection::Ttt => Self::Ttt(serde_json::from_str(arguments).map_err(schema_err)?),
            PipelineSelection::Sts => Self::Sts(serde_json::from_str(arguments).map_err(schema_err)?),
            PipelineSelection::Stt => Self::Stt(serde_json::from_str(arguments).map_err(schema_err)?),
        };

        if call.text().trim().is_empty() {
            return Err(DomainError::invalid_arguments(name, "text must not be empty"));
        }

        Ok(call)
    }

    pub const fn selection(&self) -> PipelineSelection {
        match self {
            Self::Tts(_) => PipelineSelection::Tts,
            Self::Ttt(_) => PipelineSelection::Ttt,
            Self::Sts(_) => PipelineSelection::Sts,
            Self::Stt(_) => PipelineSelection::Stt,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Tts(a) => &a.text,
            Self::Ttt(a) => &a.text,
            Self::Sts(a) => &a.text,
            Self::Stt(a) => &a.text,
        }
    }

    pub fn request_id(&self) -> &str {
        match self {
            Self::Tts(a) => &a.request_id,
            Self::Ttt(a) => &a.request_id,
            Self::Sts(a) => &a.request_id,
            Self::Stt(a) => &a.request_id,
        }
    }
}

/// Outcome of one successful orchestration run
///
/// Failures travel as the `Err` arm of the orchestrator's `Result`, so a
/// request always ends in exactly one of audio, text or an error.
#[derive(Clone, PartialEq, Eq)]
pub enum PipelineResult {
    /// Synthesized speech as a WAV file
    Audio { wav: Vec<u8>, sample_rate: u32 },
    /// Generated or transcribed text
    Text(String),
}

impl PipelineResult {
    /// Rebuild a result from a cached artifact
    ///
    /// Audio artifacts are parsed so a truncated file surfaces as an error
    /// instead of being served.
    pub fn from_artifact(artifact: Artifact) -> Result<Self, DomainError> {
        match artifact {
            Artifact::Text(text) => Ok(Self::Text(text)),
            Artifact::Audio(bytes) => {
                let decoded = DecodedAudio::from_wav_bytes(bytes)?;
                let sample_rate = decoded.sample_rate();
                Ok(Self::Audio {
                    wav: decoded.into_bytes(),
                    sample_rate,
                })
            },
        }
    }

    /// The artifact persisted for this result
    pub fn to_artifact(&self) -> Artifact {
        match self {
            Self::Audio { wav, .. } => Artifact::Audio(wav.clone()),
            Self::Text(text) => Artifact::Text(text.clone()),
        }
    }

    pub const fn is_audio(&self) -> bool {
        matches!(self, Self::Audio { .. })
    }
}

impl std::fmt::Debug for PipelineResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Audio { wav, sample_rate } => f
                .debug_struct("Audio")
                .field("len", &wav.len())
                .field("sample_rate", sample_rate)
                .finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names_round_trip() {
        for p in PipelineSelection::ALL {
            assert_eq!(PipelineSelection::from_tool_name(p.tool_name()), Some(p));
        }
        assert_eq!(PipelineSelection::from_tool_name("generate_music"), None);
    }

    #[test]
    fn modality_flags() {
        assert!(PipelineSelection::Sts.requires_speech_input());
        assert!(PipelineSelection::Stt.requires_speech_input());
        assert!(!PipelineSelection::Tts.requires_speech_input());
        assert!(PipelineSelection::Tts.produces_audio());
        assert!(!PipelineSelection::Stt.produces_audio());
    }

    #[test]
    fn parses_tts_call() {
        let call = PipelineCall::from_tool_call(
            "generate_tts",
            r#"{"text":"hi","requestID":"r1","voice":"alloy","system":null}"#,
        )
        .unwrap();
        assert_eq!(call.selection(), PipelineSelection::Tts);
        assert_eq!(call.text(), "hi");
        assert_eq!(call.request_id(), "r1");
        match call {
            PipelineCall::Tts(args) => {
                assert_eq!(args.voice.as_deref(), Some("alloy"));
                assert!(args.system.is_none());
            },
            _ => unreachable!("Expected TTS call"),
        }
    }

    #[test]
    fn unknown_tool_rejected() {
        let err = PipelineCall::from_tool_call("generate_music", "{}").unwrap_err();
        assert!(matches!(err, DomainError::UnknownPipeline(_)));
    }

    #[test]
    fn unknown_fields_rejected() {
        let err = PipelineCall::from_tool_call(
            "generate_ttt",
            r#"{"text":"hi","requestID":"r1","voice":"alloy"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidPipelineArguments { .. }));
    }

    #[test]
    fn missing_required_field_rejected() {
        let err = PipelineCall::from_tool_call("generate_sts", r#"{"text":"hi","requestID":"r1"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("synthesis_audio_path"));
    }

    #[test]
    fn empty_text_rejected() {
        assert!(
            PipelineCall::from_tool_call("generate_tts", r#"{"text":"  ","requestID":"r1"}"#)
                .is_err()
        );
    }

    #[test]
    fn malformed_json_rejected() {
        assert!(PipelineCall::from_tool_call("generate_tts", "{not json").is_err());
    }

    #[test]
    fn result_debug_omits_audio_bytes() {
        let result = PipelineResult::Audio {
            wav: vec![1, 2, 3],
            sample_rate: 24_000,
        };
        assert_eq!(format!("{result:?}"), "Audio { len: 3, sample_rate: 24000 }");
        assert!(result.is_audio());
    }

    #[test]
    fn cached_audio_round_trips_through_artifact() {
        let wav = crate::entities::PcmAudio::silence(100, 16_000).to_wav().unwrap();
        let result = PipelineResult::from_artifact(Artifact::Audio(wav.clone())).unwrap();
        assert_eq!(
            result,
            PipelineResult::Audio {
                wav,
                sample_rate: 16_000
            }
        );
    }

    #[test]
    fn truncated_cached_audio_is_rejected() {
        assert!(PipelineResult::from_artifact(Artifact::Audio(b"RIFF".to_vec())).is_err());
    }

    #[test]
    fn cached_audio_missing_its_tail_is_rejected() {
        let mut wav = crate::entities::PcmAudio::silence(1_000, 16_000).to_wav().unwrap();
        wav.truncate(wav.len() - 1_000);
        assert!(PipelineResult::from_artifact(Artifact::Audio(wav)).is_err());
    }
}
