//! Request orchestrator - runs one generation request end to end
//!
//! Order of work:
//! 1. validate voice and speech input; only local transcoding, no remote calls
//! 2. derive the cache key and return a cached artifact if present
//! 3. resolve the voice and materialize speech in scratch space
//! 4. route to one pipeline and execute it
//! 5. store the artifact
//!
//! The scratch directory is removed on every exit path.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use domain::{
    CacheKey, GenerationRequest, PipelineResult, PipelineSelection, RequestId, ResolvedVoiceRef,
    TimingRecord,
};
use tracing::{info, instrument, warn};

use crate::error::ApplicationError;
use crate::ports::{ArtifactStore, AudioConversionPort, ReasoningPort, SynthesisPort};
use crate::services::pipeline_router::{PipelineRouter, RouterState, RoutingContext};
use crate::services::pipelines::{PipelineExecutor, PipelineInputs};
use crate::services::scratch_space::{ScratchRoot, ScratchSpace};
use crate::services::speech_input::{SpeechInputPreparer, ValidatedSpeech};
use crate::services::timing::{TimingStats, stage};
use crate::services::voice_resolver::{ValidatedVoice, VoiceResolver};

/// Result of a successful orchestration
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub request_id: RequestId,
    pub cache_key: CacheKey,
    pub result: PipelineResult,
    /// Served from the artifact store without routing or synthesis
    pub from_cache: bool,
    /// Pipeline that produced the result; `None` for cache hits
    pub selection: Option<PipelineSelection>,
    pub timing: TimingRecord,
}

/// Collaborators the orchestrator is built from
pub struct OrchestratorDeps {
    pub reasoning: Arc<dyn ReasoningPort>,
    pub synthesis: Arc<dyn SynthesisPort>,
    pub store: Arc<dyn ArtifactStore>,
    pub converter: Arc<dyn AudioConversionPort>,
    pub voices: VoiceResolver,
    pub scratch_root: ScratchRoot,
    pub max_rounds: u32,
}

/// Runs generation requests
pub struct RequestOrchestrator {
    synthesis: Arc<dyn SynthesisPort>,
    store: Arc<dyn ArtifactStore>,
    voices: VoiceResolver,
    speech: SpeechInputPreparer,
    router: PipelineRouter,
    executor: PipelineExecutor,
    scratch_root: ScratchRoot,
}

impl fmt::Debug for RequestOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOrchestrator")
            .field("router", &self.router)
            .field("scratch_root", &self.scratch_root)
            .finish_non_exhaustive()
    }
}

impl RequestOrchestrator {
    pub fn new(deps: OrchestratorDeps) -> Self {
        Self {
            router: PipelineRouter::new(Arc::clone(&deps.reasoning))
                .with_max_rounds(deps.max_rounds),
            executor: PipelineExecutor::new(
                deps.reasoning,
                Arc::clone(&deps.synthesis),
                deps.voices.clone(),
            ),
            speech: SpeechInputPreparer::new(deps.converter),
            synthesis: deps.synthesis,
            store: deps.store,
            voices: deps.voices,
            scratch_root: deps.scratch_root,
        }
    }

    /// Handle one request; exactly one result or error comes back
    #[instrument(skip_all, fields(request_id = %request.id(), voice = request.voice().kind(), speech = request.has_speech_input()))]
    pub async fn handle(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationOutcome, ApplicationError> {
        let mut timing = TimingStats::new(request.id());
        let outcome = self.run(request, &mut timing).await;
        timing.log_summary();

        outcome.map(|mut outcome| {
            outcome.timing = timing.record().clone();
            outcome
        })
    }

    async fn run(
        &self,
        request: GenerationRequest,
        timing: &mut TimingStats,
    ) -> Result<GenerationOutcome, ApplicationError> {
        let (descriptor, voice) = self.voices.validate_at_edge(request.voice().clone())?;
        let request = request.with_voice(descriptor);
        let speech = match request.speech_input() {
            Some(input) => Some(self.speech.validate(input).await?),
            None => None,
        };

        timing.start(stage::CACHE_LOOKUP);
        let lookup = self.lookup(&request).await;
        timing.end(stage::CACHE_LOOKUP);
        let (cache_key, cached) = lookup?;

        if let Some(result) = cached {
            info!(cache_key = %cache_key, "Cache hit");
            return Ok(GenerationOutcome {
                request_id: request.id(),
                cache_key,
                result,
                from_cache: true,
                selection: None,
                timing: TimingRecord::new(),
            });
        }

        let scratch = self.scratch_root.create(request.id()).await?;
        let generated = self
            .generate(&request, voice, speech, &scratch, timing)
            .await;
        scratch.cleanup().await;
        let (selection, result) = generated?;

        timing.start(stage::CACHE_WRITE);
        if let Err(e) = self.store.write(&cache_key, &result.to_artifact()).await {
            warn!(cache_key = %cache_key, error = %e, "Failed to store artifact");
        }
        timing.end(stage::CACHE_WRITE);

        Ok(GenerationOutcome {
            request_id: request.id(),
            cache_key,
            result,
            from_cache: false,
            selection: Some(selection),
            timing: TimingRecord::new(),
        })
    }

    /// Derive the cache key and read any stored artifact
    async fn lookup(
        &self,
        request: &GenerationRequest,
    ) -> Result<(CacheKey, Option<PipelineResult>), ApplicationError> {
        let canonical = request.canonical_fields().canonical_string();
        let digest = self.synthesis.cache_name(&canonical).await?;
        let key = CacheKey::parse(digest)?;

        let cached = match self.store.lookup(&key).await? {
            Some(artifact) => match PipelineResult::from_artifact(artifact) {
                Ok(result) => Some(result),
                Err(e) => {
                    warn!(cache_key = %key, error = %e, "Ignoring unreadable cached artifact");
                    None
                },
            },
            None => None,
        };
        Ok((key, cached))
    }

    /// Everything that needs scratch space: resolution, routing, execution
    async fn generate(
        &self,
        request: &GenerationRequest,
        voice: ValidatedVoice,
        speech: Option<ValidatedSpeech>,
        scratch: &ScratchSpace,
        timing: &mut TimingStats,
    ) -> Result<(PipelineSelection, PipelineResult), ApplicationError> {
        timing.start(stage::VOICE_RESOLUTION);
        let resolved = self.voices.resolve(voice, scratch).await;
        timing.end(stage::VOICE_RESOLUTION);
        let resolved: ResolvedVoiceRef = resolved?;

        let speech_path: Option<PathBuf> = match speech {
            Some(validated) => {
                timing.start(stage::SPEECH_INPUT);
                let path = self.speech.materialize(validated, scratch).await;
                timing.end(stage::SPEECH_INPUT);
                Some(path?)
            },
            None => None,
        };

        let request_id = request.id().to_string();
        let ctx = RoutingContext {
            request_id: &request_id,
            text: request.text(),
            system_instruction: request.system_instruction(),
            voice_path: Some(resolved.local_path()),
            speech_path: speech_path.as_deref(),
        };

        let mut state = RouterState::AwaitingDecision;
        timing.start(stage::PATHWAY_DECISION);
        let decision = self.router.route(&ctx).await;
        timing.end(stage::PATHWAY_DECISION);
        let decision = match decision {
            Ok(decision) => decision,
            Err(e) => {
                state = state.fail();
                warn!(?state, error = %e, "Routing failed");
                return Err(e);
            },
        };

        let selection = decision.call.selection();
        state = RouterState::Dispatched(selection);

        let inputs = PipelineInputs {
            request,
            voice: &resolved,
            speech_path: speech_path.as_deref(),
            scratch,
        };
        match self.executor.execute(decision.call, inputs, timing).await {
            Ok(result) => {
                state = state.complete();
                info!(?state, audio = result.is_audio(), "Pipeline finished");
                Ok((selection, result))
            },
            Err(e) => {
                state = state.fail();
                warn!(?state, error = %e, "Pipeline failed");
                Err(e)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use domain::{Artifact, AudioFormat, PcmAudio, SpeechInput, VoiceDescriptor};

    use super::*;
    use crate::ports::{
        MockArtifactStore, MockAudioConversionPort, MockReasoningPort, MockSynthesisPort,
        ReasoningTurn, ToolInvocation,
    };
    use crate::services::voice_resolver::VoiceCatalog;

    const KEY: &str = "0123456789abcdef";

    struct Env {
        _presets: tempfile::TempDir,
        scratch: tempfile::TempDir,
        voices: VoiceResolver,
    }

    fn env() -> Env {
        let presets = tempfile::tempdir().unwrap();
        let alloy = presets.path().join("alloy.wav");
        std::fs::write(&alloy, PcmAudio::silence(6_000, 16_000).to_wav().unwrap()).unwrap();
        let catalog = VoiceCatalog::new(presets.path()).with_preset("alloy", &alloy);
        let scratch = tempfile::tempdir().unwrap();
        let voices = VoiceResolver::new(Arc::new(catalog), scratch.path());
        Env {
            _presets: presets,
            scratch,
            voices,
        }
    }

    fn orchestrator(
        env: &Env,
        reasoning: MockReasoningPort,
        synthesis: MockSynthesisPort,
        store: MockArtifactStore,
    ) -> RequestOrchestrator {
        RequestOrchestrator::new(OrchestratorDeps {
            reasoning: Arc::new(reasoning),
            synthesis: Arc::new(synthesis),
            store: Arc::new(store),
            converter: Arc::new(MockAudioConversionPort::new()),
            voices: env.voices.clone(),
            scratch_root: ScratchRoot::new(env.scratch.path()),
            max_rounds: 1,
        })
    }

    fn orchestrator_with_converter(
        env: &Env,
        synthesis: MockSynthesisPort,
        converter: MockAudioConversionPort,
    ) -> RequestOrchestrator {
        RequestOrchestrator::new(OrchestratorDeps {
            reasoning: Arc::new(MockReasoningPort::new()),
            synthesis: Arc::new(synthesis),
            store: Arc::new(MockArtifactStore::new()),
            converter: Arc::new(converter),
            voices: env.voices.clone(),
            scratch_root: ScratchRoot::new(env.scratch.path()),
            max_rounds: 1,
        })
    }

    fn tts_turn() -> ReasoningTurn {
        ReasoningTurn {
            content: None,
            tool_calls: vec![ToolInvocation {
                id: "call_1".into(),
                name: "generate_tts".into(),
                arguments: r#"{"text":"Hello","requestID":"r"}"#.into(),
            }],
        }
    }

    fn cache_name_ok(synthesis: &mut MockSynthesisPort) {
        synthesis
            .expect_cache_name()
            .returning(|_| Ok(KEY.to_string()));
    }

    fn scratch_is_empty(env: &Env) -> bool {
        std::fs::read_dir(env.scratch.path()).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn cache_hit_skips_routing_and_synthesis() {
        let env = env();
        let wav = PcmAudio::silence(200, 16_000).to_wav().unwrap();
        let cached = wav.clone();

        let mut reasoning = MockReasoningPort::new();
        reasoning.expect_invoke_tools().never();
        let mut synthesis = MockSynthesisPort::new();
        cache_name_ok(&mut synthesis);
        synthesis.expect_speech_synthesis().never();
        let mut store = MockArtifactStore::new();
        store
            .expect_lookup()
            .returning(move |_| Ok(Some(Artifact::Audio(cached.clone()))));
        store.expect_write().never();

        let outcome = orchestrator(&env, reasoning, synthesis, store)
            .handle(GenerationRequest::new("Hello").unwrap())
            .await
            .unwrap();

        assert!(outcome.from_cache);
        assert_eq!(outcome.selection, None);
        assert_eq!(
            outcome.result,
            PipelineResult::Audio {
                wav,
                sample_rate: 16_000
            }
        );
        assert!(scratch_is_empty(&env));
    }

    #[tokio::test]
    async fn cold_request_routes_synthesizes_and_stores() {
        let env = env();
        let mut reasoning = MockReasoningPort::new();
        reasoning
            .expect_invoke_tools()
            .times(1)
            .returning(|_, _| Ok(tts_turn()));
        reasoning
            .expect_classify_json()
            .returning(|_, _| Ok(r#"{"intent":"DIRECT","content":"Hello"}"#.into()));
        let mut synthesis = MockSynthesisPort::new();
        cache_name_ok(&mut synthesis);
        synthesis
            .expect_speech_synthesis()
            .times(1)
            .returning(|_| Ok(PcmAudio::new(vec![0.25; 100], 24_000)));
        let mut store = MockArtifactStore::new();
        store.expect_lookup().returning(|_| Ok(None));
        store
            .expect_write()
            .times(1)
            .withf(|key, artifact| key.as_str() == KEY && matches!(artifact, Artifact::Audio(_)))
            .returning(|_, _| Ok(()));

        let outcome = orchestrator(&env, reasoning, synthesis, store)
            .handle(GenerationRequest::new("Hello").unwrap())
            .await
            .unwrap();

        assert!(!outcome.from_cache);
        assert_eq!(outcome.selection, Some(PipelineSelection::Tts));
        assert_eq!(outcome.cache_key.as_str(), KEY);
        assert!(outcome.result.is_audio());
        assert!(outcome.timing.get(stage::PATHWAY_DECISION).is_some());
        assert!(scratch_is_empty(&env));
    }

    #[tokio::test]
    async fn invalid_inline_voice_fails_before_any_remote_call() {
        let env = env();
        let mut synthesis = MockSynthesisPort::new();
        synthesis.expect_cache_name().never();
        synthesis.expect_speech_synthesis().never();
        let mut reasoning = MockReasoningPort::new();
        reasoning.expect_invoke_tools().never();

        let short = STANDARD.encode(PcmAudio::silence(4_999, 16_000).to_wav().unwrap());
        let request = GenerationRequest::new("Hello")
            .unwrap()
            .with_voice(VoiceDescriptor::inline(short));

        let err = orchestrator(&env, reasoning, synthesis, MockArtifactStore::new())
            .handle(request)
            .await
            .unwrap_err();

        assert!(matches!(err, ApplicationError::VoiceResolution(_)));
    }

    #[tokio::test]
    async fn overlong_non_wav_speech_fails_before_cache_name() {
        let env = env();
        let mut synthesis = MockSynthesisPort::new();
        synthesis.expect_cache_name().never();
        let mut converter = MockAudioConversionPort::new();
        converter.expect_convert_to_wav().times(1).returning(|_, _, output| {
            std::fs::write(output, PcmAudio::silence(61_000, 8_000).to_wav().unwrap()).unwrap();
            Ok(())
        });

        let request = GenerationRequest::new("Hello")
            .unwrap()
            .with_speech_input(SpeechInput::new(STANDARD.encode(b"ID3fake"), AudioFormat::Mp3));

        let err = orchestrator_with_converter(&env, synthesis, converter)
            .handle(request)
            .await
            .unwrap_err();

        assert!(matches!(err, ApplicationError::Validation(_)));
        assert!(scratch_is_empty(&env));
    }

    #[tokio::test]
    async fn failure_after_materializing_still_cleans_scratch() {
        let env = env();
        let mut reasoning = MockReasoningPort::new();
        reasoning
            .expect_invoke_tools()
            .returning(|_, _| Err(ApplicationError::ReasoningTimeout(60_000)));
        let mut synthesis = MockSynthesisPort::new();
        cache_name_ok(&mut synthesis);
        synthesis.expect_speech_synthesis().never();
        let mut store = MockArtifactStore::new();
        store.expect_lookup().returning(|_| Ok(None));
        store.expect_write().never();

        let inline = STANDARD.encode(PcmAudio::silence(6_000, 16_000).to_wav().unwrap());
        let speech = STANDARD.encode(PcmAudio::silence(1_000, 16_000).to_wav().unwrap());
        let request = GenerationRequest::new("Hello")
            .unwrap()
            .with_voice(VoiceDescriptor::inline(inline))
            .with_speech_input(SpeechInput::new(speech, AudioFormat::Wav));

        let err = orchestrator(&env, reasoning, synthesis, store)
            .handle(request)
            .await
            .unwrap_err();

        assert!(matches!(err, ApplicationError::ReasoningTimeout(_)));
        assert!(scratch_is_empty(&env));
    }

    #[tokio::test]
    async fn no_tool_call_is_an_error() {
        let env = env();
        let mut reasoning = MockReasoningPort::new();
        reasoning.expect_invoke_tools().returning(|_, _| {
            Ok(ReasoningTurn {
                content: Some("Hi!".into()),
                tool_calls: vec![],
            })
        });
        let mut synthesis = MockSynthesisPort::new();
        cache_name_ok(&mut synthesis);
        let mut store = MockArtifactStore::new();
        store.expect_lookup().returning(|_| Ok(None));

        let err = orchestrator(&env, reasoning, synthesis, store)
            .handle(GenerationRequest::new("Hello").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, ApplicationError::NoPipelineExecuted));
    }

    #[tokio::test]
    async fn store_failure_does_not_fail_request() {
        let env = env();
        let mut reasoning = MockReasoningPort::new();
        reasoning.expect_invoke_tools().returning(|_, _| Ok(tts_turn()));
        reasoning
            .expect_classify_json()
            .returning(|_, _| Err(ApplicationError::ReasoningTimeout(30_000)));
        let mut synthesis = MockSynthesisPort::new();
        cache_name_ok(&mut synthesis);
        synthesis
            .expect_speech_synthesis()
            .returning(|_| Ok(PcmAudio::new(vec![0.0; 10], 16_000)));
        let mut store = MockArtifactStore::new();
        store.expect_lookup().returning(|_| Ok(None));
        store
            .expect_write()
            .returning(|_, _| Err(ApplicationError::Internal("disk full".into())));

        let outcome = orchestrator(&env, reasoning, synthesis, store)
            .handle(GenerationRequest::new("Hello").unwrap())
            .await
            .unwrap();

        assert!(outcome.result.is_audio());
    }

    #[tokio::test]
    async fn unsafe_digest_is_rejected() {
        let env = env();
        let mut synthesis = MockSynthesisPort::new();
        synthesis
            .expect_cache_name()
            .returning(|_| Ok("../../etc".to_string()));
        let mut store = MockArtifactStore::new();
        store.expect_lookup().never();

        let err = orchestrator(&env, MockReasoningPort::new(), synthesis, store)
            .handle(GenerationRequest::new("Hello").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, ApplicationError::Synthesis { retryable: false, .. }));
    }
}
