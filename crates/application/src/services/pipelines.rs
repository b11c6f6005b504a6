//! The four processing pipelines
//!
//! Each pipeline receives the router's validated call unchanged. Voice
//! arguments are re-resolved without any fallback: a bad reference at this
//! point is a [`ApplicationError::VoiceResolution`], never a silent default.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use domain::{
    DurationBounds, GenerationRequest, PipelineCall, PipelineResult, ResolvedVoiceRef, StsArgs,
    SttArgs, TtsArgs, TttArgs,
};
use tracing::{debug, info, instrument, warn};

use crate::error::ApplicationError;
use crate::ports::{ReasoningPort, SpeechSynthesisRequest, SynthesisPort};
use crate::services::intent_refiner::IntentRefiner;
use crate::services::scratch_space::ScratchSpace;
use crate::services::timing::{TimingStats, stage};
use crate::services::voice_resolver::VoiceResolver;

/// Delivery style used when the request carries no system instruction
pub const DEFAULT_STYLE: &str = "Neutral tone, clear articulation, natural pacing.";

/// Token budget for text replies
pub const TEXT_REPLY_MAX_TOKENS: u32 = 300;

const SCENE_START: &str = "<|scene_desc_start|>";
const SCENE_END: &str = "<|scene_desc_end|>";
const SPONSOR_MARKER: &str = "**Sponsor**";

const REPLY_INSTRUCTION: &str = "You are a friendly, natural conversational assistant.\n\
Keep replies short and casual unless the user explicitly asks for longer content.\n\
Write plain text only: no emojis, markdown or special characters.\n\
One minute of speech is roughly 160 tokens; when the user asks for a duration, \
write about minutes * 160 tokens and never exceed the token limit.\n\
Return only the reply itself, with no preamble.";

/// Request-scoped inputs shared by all pipelines
#[derive(Debug, Clone, Copy)]
pub struct PipelineInputs<'a> {
    pub request: &'a GenerationRequest,
    /// Voice resolved from the request before routing
    pub voice: &'a ResolvedVoiceRef,
    /// WAV speech input inside scratch space
    pub speech_path: Option<&'a Path>,
    pub scratch: &'a ScratchSpace,
}

/// Runs the pipeline chosen by the router
pub struct PipelineExecutor {
    reasoning: Arc<dyn ReasoningPort>,
    synthesis: Arc<dyn SynthesisPort>,
    refiner: IntentRefiner,
    voices: VoiceResolver,
}

impl fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("voices", &self.voices)
            .finish_non_exhaustive()
    }
}

impl PipelineExecutor {
    pub fn new(
        reasoning: Arc<dyn ReasoningPort>,
        synthesis: Arc<dyn SynthesisPort>,
        voices: VoiceResolver,
    ) -> Self {
        Self {
            refiner: IntentRefiner::new(Arc::clone(&reasoning)),
            reasoning,
            synthesis,
            voices,
        }
    }

    /// Execute `call` and return its single result
    #[instrument(skip_all, fields(pipeline = %call.selection(), request_id = %inputs.request.id()))]
    pub async fn execute(
        &self,
        call: PipelineCall,
        inputs: PipelineInputs<'_>,
        timing: &mut TimingStats,
    ) -> Result<PipelineResult, ApplicationError> {
        match call {
            PipelineCall::Tts(args) => self.tts(args, inputs, timing).await,
            PipelineCall::Ttt(args) => self.ttt(args, timing).await,
            PipelineCall::Sts(args) => self.sts(args, inputs, timing).await,
            PipelineCall::Stt(args) => self.stt(&args, inputs, timing).await,
        }
    }

    async fn tts(
        &self,
        args: TtsArgs,
        inputs: PipelineInputs<'_>,
        timing: &mut TimingStats,
    ) -> Result<PipelineResult, ApplicationError> {
        let voice = self.voice_for(args.voice.as_deref(), inputs).await?;

        let refined = timing
            .measure(
                stage::INTENT_REFINEMENT,
                self.refiner.classify(&args.text, args.system.as_deref()),
            )
            .await;
        debug!(intent = ?refined.intent, "TTS content refined");

        let request = SpeechSynthesisRequest {
            content: refined.content,
            voice_path: voice.local_path().to_path_buf(),
            style_instruction: Some(wrap_style(refined.style_instruction.as_deref())),
            clone_text: args.clone_text,
            request_id: args.request_id,
        };
        self.synthesize(request, timing).await
    }

    async fn ttt(
        &self,
        args: TttArgs,
        timing: &mut TimingStats,
    ) -> Result<PipelineResult, ApplicationError> {
        let prompt = format!(
            "Prompt: {} & System: {}",
            args.text,
            args.system.as_deref().unwrap_or("None")
        );

        let reply = timing
            .measure(
                stage::TEXT_GENERATION,
                self.reasoning
                    .complete_text(REPLY_INSTRUCTION, &prompt, TEXT_REPLY_MAX_TOKENS),
            )
            .await;

        match reply {
            Ok(text) => Ok(PipelineResult::Text(strip_sponsor_footer(&text))),
            Err(ApplicationError::ReasoningTimeout(ms)) => {
                warn!(timeout_ms = ms, "Text reply timed out, returning the prompt");
                Ok(PipelineResult::Text(args.text))
            },
            Err(e) => Err(e),
        }
    }

    async fn sts(
        &self,
        args: StsArgs,
        inputs: PipelineInputs<'_>,
        timing: &mut TimingStats,
    ) -> Result<PipelineResult, ApplicationError> {
        let voice = self.voice_for(args.voice.as_deref(), inputs).await?;
        let transcript = self
            .transcribe(&args.synthesis_audio_path, &args.request_id, inputs, timing)
            .await?;

        let prompt = format!(
            "This is the prompt and {} and this is the audio transcript {transcript}",
            args.text
        );
        let refined = timing
            .measure(
                stage::INTENT_REFINEMENT,
                self.refiner.classify(&prompt, args.system.as_deref()),
            )
            .await;

        let request = SpeechSynthesisRequest {
            content: refined.content,
            voice_path: voice.local_path().to_path_buf(),
            style_instruction: Some(wrap_style(refined.style_instruction.as_deref())),
            clone_text: args.clone_text,
            request_id: args.request_id,
        };
        self.synthesize(request, timing).await
    }

    async fn stt(
        &self,
        args: &SttArgs,
        inputs: PipelineInputs<'_>,
        timing: &mut TimingStats,
    ) -> Result<PipelineResult, ApplicationError> {
        let transcript = self
            .transcribe(&args.synthesis_audio_path, &args.request_id, inputs, timing)
            .await?;
        Ok(PipelineResult::Text(transcript))
    }

    /// Voice named in the tool arguments, or the one resolved for the request
    async fn voice_for(
        &self,
        requested: Option<&str>,
        inputs: PipelineInputs<'_>,
    ) -> Result<ResolvedVoiceRef, ApplicationError> {
        match requested.map(str::trim).filter(|v| !v.is_empty()) {
            Some(raw) if Path::new(raw) == inputs.voice.local_path() => Ok(inputs.voice.clone()),
            Some(raw) => {
                self.voices
                    .resolve_reference(raw, DurationBounds::cloning_reference(), inputs.scratch)
                    .await
            },
            None => Ok(inputs.voice.clone()),
        }
    }

    /// Transcribe the request's own speech input
    ///
    /// The path from the tool arguments is only accepted when it names the
    /// file this request materialized.
    async fn transcribe(
        &self,
        argument_path: &str,
        request_id: &str,
        inputs: PipelineInputs<'_>,
        timing: &mut TimingStats,
    ) -> Result<String, ApplicationError> {
        let speech = inputs.speech_path.ok_or_else(|| {
            ApplicationError::Validation("this pipeline needs speech input".to_string())
        })?;
        if Path::new(argument_path) != speech {
            warn!(
                argument = argument_path,
                actual = %speech.display(),
                "Ignoring speech path from tool arguments"
            );
        }

        let transcript = timing
            .measure(
                stage::TRANSCRIPTION,
                self.synthesis.transcribe(speech, request_id),
            )
            .await?;
        info!(chars = transcript.len(), "Speech transcribed");
        Ok(transcript)
    }

    async fn synthesize(
        &self,
        request: SpeechSynthesisRequest,
        timing: &mut TimingStats,
    ) -> Result<PipelineResult, ApplicationError> {
        let pcm = timing
            .measure(stage::AUDIO_GENERATION, self.synthesis.speech_synthesis(request))
            .await?;
        let wav = pcm.to_wav()?;
        info!(bytes = wav.len(), sample_rate = pcm.sample_rate(), "Speech synthesized");
        Ok(PipelineResult::Audio {
            wav,
            sample_rate: pcm.sample_rate(),
        })
    }
}

/// Wrap a style in scene-description tags unless it already has them
pub fn wrap_style(style: Option<&str>) -> String {
    let style = style.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(DEFAULT_STYLE);
    if style.contains(SCENE_START) && style.contains(SCENE_END) {
        style.to_string()
    } else {
        format!("Generate audio following instruction.\n{SCENE_START}\n{style}\n{SCENE_END}")
    }
}

/// Drop a trailing `---` section that carries a sponsor block
pub fn strip_sponsor_footer(reply: &str) -> String {
    match reply.find("---") {
        Some(start) if reply[start..].contains(SPONSOR_MARKER) => reply[..start].trim().to_string(),
        _ => reply.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use domain::{PcmAudio, RequestId, VoiceOrigin};

    use super::*;
    use crate::ports::{MockReasoningPort, MockSynthesisPort};
    use crate::services::scratch_space::ScratchRoot;
    use crate::services::voice_resolver::VoiceCatalog;

    struct Harness {
        _root: tempfile::TempDir,
        scratch: ScratchSpace,
        request: GenerationRequest,
        voice: ResolvedVoiceRef,
        timing: TimingStats,
    }

    async fn harness() -> Harness {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchRoot::new(root.path()).create(RequestId::new()).await.unwrap();
        let request = GenerationRequest::new("Hello").unwrap();
        let timing = TimingStats::new(request.id());
        Harness {
            _root: root,
            scratch,
            request,
            voice: ResolvedVoiceRef::new(
                PathBuf::from("/voices/alloy.wav"),
                VoiceOrigin::Preset("alloy".into()),
            ),
            timing,
        }
    }

    fn resolver() -> VoiceResolver {
        let catalog = VoiceCatalog::new("/voices").with_preset("alloy", "/voices/alloy.wav");
        VoiceResolver::new(Arc::new(catalog), "/tmp/voicegate-scratch")
    }

    fn direct_classifier(mock: &mut MockReasoningPort) {
        mock.expect_classify_json().returning(|_, user| {
            let content = user.trim_start_matches("Prompt: ").to_string();
            Ok(serde_json::json!({"intent": "DIRECT", "content": content}).to_string())
        });
    }

    #[tokio::test]
    async fn tts_synthesizes_with_default_style() {
        let mut h = harness().await;
        let mut reasoning = MockReasoningPort::new();
        direct_classifier(&mut reasoning);
        let mut synthesis = MockSynthesisPort::new();
        synthesis
            .expect_speech_synthesis()
            .times(1)
            .withf(|req| {
                req.content == "Hello"
                    && req.voice_path == Path::new("/voices/alloy.wav")
                    && req
                        .style_instruction
                        .as_deref()
                        .is_some_and(|s| s.contains(DEFAULT_STYLE) && s.contains(SCENE_START))
            })
            .returning(|_| Ok(PcmAudio::new(vec![0.0, 0.5, -0.5], 24_000)));
        let executor = PipelineExecutor::new(Arc::new(reasoning), Arc::new(synthesis), resolver());

        let call = PipelineCall::from_tool_call(
            "generate_tts",
            r#"{"text":"Hello","requestID":"r1","voice":"alloy"}"#,
        )
        .unwrap();
        let inputs = PipelineInputs {
            request: &h.request,
            voice: &h.voice,
            speech_path: None,
            scratch: &h.scratch,
        };
        let result = executor.execute(call, inputs, &mut h.timing).await.unwrap();

        match result {
            PipelineResult::Audio { wav, sample_rate } => {
                assert_eq!(sample_rate, 24_000);
                assert!(wav.starts_with(b"RIFF"));
            },
            other => panic!("expected audio, got {other:?}"),
        }
        assert!(h.timing.record().get(stage::AUDIO_GENERATION).is_some());
    }

    #[tokio::test]
    async fn tts_rejects_unknown_voice_argument() {
        let mut h = harness().await;
        let reasoning = MockReasoningPort::new();
        let mut synthesis = MockSynthesisPort::new();
        synthesis.expect_speech_synthesis().never();
        let executor = PipelineExecutor::new(Arc::new(reasoning), Arc::new(synthesis), resolver());

        let call = PipelineCall::from_tool_call(
            "generate_tts",
            r#"{"text":"Hello","requestID":"r1","voice":"not-a-voice"}"#,
        )
        .unwrap();
        let inputs = PipelineInputs {
            request: &h.request,
            voice: &h.voice,
            speech_path: None,
            scratch: &h.scratch,
        };
        let err = executor.execute(call, inputs, &mut h.timing).await.unwrap_err();

        assert!(matches!(err, ApplicationError::VoiceResolution(_)));
    }

    #[tokio::test]
    async fn busy_worker_surfaces_as_retryable() {
        let mut h = harness().await;
        let mut reasoning = MockReasoningPort::new();
        direct_classifier(&mut reasoning);
        let mut synthesis = MockSynthesisPort::new();
        synthesis
            .expect_speech_synthesis()
            .returning(|_| Err(ApplicationError::synthesis("worker busy", true)));
        let executor = PipelineExecutor::new(Arc::new(reasoning), Arc::new(synthesis), resolver());

        let call =
            PipelineCall::from_tool_call("generate_tts", r#"{"text":"Hello","requestID":"r1"}"#)
                .unwrap();
        let inputs = PipelineInputs {
            request: &h.request,
            voice: &h.voice,
            speech_path: None,
            scratch: &h.scratch,
        };
        let err = executor.execute(call, inputs, &mut h.timing).await.unwrap_err();

        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn ttt_strips_sponsor_footer() {
        let mut h = harness().await;
        let mut reasoning = MockReasoningPort::new();
        reasoning
            .expect_complete_text()
            .withf(|_, user, max| user == "Prompt: Write a haiku & System: None" && *max == 300)
            .returning(|_, _, _| {
                Ok("Leaves fall slowly\n\n---\n**Sponsor**\nBuy things".to_string())
            });
        let executor = PipelineExecutor::new(
            Arc::new(reasoning),
            Arc::new(MockSynthesisPort::new()),
            resolver(),
        );

        let call = PipelineCall::from_tool_call(
            "generate_ttt",
            r#"{"text":"Write a haiku","requestID":"r1"}"#,
        )
        .unwrap();
        let inputs = PipelineInputs {
            request: &h.request,
            voice: &h.voice,
            speech_path: None,
            scratch: &h.scratch,
        };
        let result = executor.execute(call, inputs, &mut h.timing).await.unwrap();

        assert_eq!(result, PipelineResult::Text("Leaves fall slowly".into()));
    }

    #[tokio::test]
    async fn ttt_timeout_returns_prompt() {
        let mut h = harness().await;
        let mut reasoning = MockReasoningPort::new();
        reasoning
            .expect_complete_text()
            .returning(|_, _, _| Err(ApplicationError::ReasoningTimeout(30_000)));
        let executor = PipelineExecutor::new(
            Arc::new(reasoning),
            Arc::new(MockSynthesisPort::new()),
            resolver(),
        );

        let call = PipelineCall::from_tool_call(
            "generate_ttt",
            r#"{"text":"Write a haiku","requestID":"r1"}"#,
        )
        .unwrap();
        let inputs = PipelineInputs {
            request: &h.request,
            voice: &h.voice,
            speech_path: None,
            scratch: &h.scratch,
        };
        let result = executor.execute(call, inputs, &mut h.timing).await.unwrap();

        assert_eq!(result, PipelineResult::Text("Write a haiku".into()));
    }

    #[tokio::test]
    async fn stt_returns_transcript_of_request_speech() {
        let mut h = harness().await;
        let speech = h.scratch.file_path("speech.wav");
        let expected = speech.clone();
        let mut synthesis = MockSynthesisPort::new();
        synthesis
            .expect_transcribe()
            .times(1)
            .withf(move |path, id| path == expected && id == "r1")
            .returning(|_, _| Ok("hello world".to_string()));
        synthesis.expect_speech_synthesis().never();
        let executor = PipelineExecutor::new(
            Arc::new(MockReasoningPort::new()),
            Arc::new(synthesis),
            resolver(),
        );

        let call = PipelineCall::from_tool_call(
            "generate_stt",
            &serde_json::json!({
                "text": "transcribe",
                "synthesis_audio_path": speech.display().to_string(),
                "requestID": "r1"
            })
            .to_string(),
        )
        .unwrap();
        let inputs = PipelineInputs {
            request: &h.request,
            voice: &h.voice,
            speech_path: Some(&speech),
            scratch: &h.scratch,
        };
        let result = executor.execute(call, inputs, &mut h.timing).await.unwrap();

        assert_eq!(result, PipelineResult::Text("hello world".into()));
    }

    #[tokio::test]
    async fn sts_refines_prompt_with_transcript() {
        let mut h = harness().await;
        let speech = h.scratch.file_path("speech.wav");
        let mut reasoning = MockReasoningPort::new();
        reasoning
            .expect_classify_json()
            .withf(|_, user| user.contains("this is the audio transcript how are you"))
            .returning(|_, _| Ok(r#"{"intent":"REPLY","content":"I am great, thanks."}"#.into()));
        let mut synthesis = MockSynthesisPort::new();
        synthesis
            .expect_transcribe()
            .returning(|_, _| Ok("how are you".to_string()));
        synthesis
            .expect_speech_synthesis()
            .withf(|req| req.content == "I am great, thanks.")
            .returning(|_| Ok(PcmAudio::new(vec![0.1; 10], 16_000)));
        let executor = PipelineExecutor::new(Arc::new(reasoning), Arc::new(synthesis), resolver());

        let call = PipelineCall::from_tool_call(
            "generate_sts",
            &serde_json::json!({
                "text": "answer me",
                "synthesis_audio_path": speech.display().to_string(),
                "requestID": "r1"
            })
            .to_string(),
        )
        .unwrap();
        let inputs = PipelineInputs {
            request: &h.request,
            voice: &h.voice,
            speech_path: Some(&speech),
            scratch: &h.scratch,
        };
        let result = executor.execute(call, inputs, &mut h.timing).await.unwrap();

        assert!(result.is_audio());
    }

    #[test]
    fn style_wrapping() {
        let wrapped = wrap_style(Some("whisper"));
        assert!(wrapped.contains("<|scene_desc_start|>\nwhisper\n<|scene_desc_end|>"));
        let already = "<|scene_desc_start|>calm<|scene_desc_end|>";
        assert_eq!(wrap_style(Some(already)), already);
        assert!(wrap_style(None).contains(DEFAULT_STYLE));
    }

    #[test]
    fn sponsor_footer_only_stripped_with_marker() {
        assert_eq!(strip_sponsor_footer("a --- b"), "a --- b");
        assert_eq!(strip_sponsor_footer("text\n---\n**Sponsor** x"), "text");
    }
}
