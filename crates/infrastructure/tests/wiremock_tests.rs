//! Integration tests for infrastructure crate
//!
//! Tests cover:
//! - Reasoning and synthesis adapters against mocked HTTP backends
//! - A full orchestration run wired with the real adapters and file store

use std::sync::Arc;

use application::{
    ApplicationError, OrchestratorDeps, ReasoningMessage, ReasoningPort, RequestOrchestrator,
    ScratchRoot, SynthesisPort, ToolSpec, VoiceResolver,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use domain::{GenerationRequest, PcmAudio, PipelineResult, PipelineSelection};
use infrastructure::{
    AudioConversionAdapter, FileArtifactStore, ReasoningAdapter, SynthesisAdapter,
    load_voice_catalog,
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

fn reasoning_adapter(base_url: &str) -> ReasoningAdapter {
    ReasoningAdapter::new(ai_core::InferenceConfig {
        base_url: base_url.to_string(),
        timeout_ms: 5_000,
        ..Default::default()
    })
    .unwrap()
}

fn synthesis_adapter(base_url: &str) -> SynthesisAdapter {
    SynthesisAdapter::new(ai_speech::SpeechConfig {
        base_url: base_url.to_string(),
        timeout_ms: 5_000,
        health_timeout_ms: 500,
        ..Default::default()
    })
    .unwrap()
}

fn chat_reply(message: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "id": "chatcmpl-test",
        "model": "openai",
        "choices": [{"index": 0, "message": message, "finish_reason": "stop"}]
    }))
}

fn samples_b64(samples: &[f32]) -> String {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    STANDARD.encode(bytes)
}

// ============================================================================
// Reasoning adapter
// ============================================================================

mod reasoning_tests {
    use super::*;

    #[tokio::test]
    async fn tool_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({"tool_choice": "auto"})))
            .respond_with(chat_reply(serde_json::json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "generate_ttt", "arguments": "{\"text\":\"hi\",\"requestID\":\"r\"}"}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let turn = reasoning_adapter(&server.uri())
            .invoke_tools(
                &[ReasoningMessage::User("hi".into())],
                &[ToolSpec::new("generate_ttt", "reply", serde_json::json!({"type": "object"}))],
            )
            .await
            .unwrap();

        assert_eq!(turn.tool_calls[0].name, "generate_ttt");
    }

    #[tokio::test]
    async fn slow_classifier_is_reasoning_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                chat_reply(serde_json::json!({"role": "assistant", "content": "{}"}))
                    .set_delay(std::time::Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let adapter = ReasoningAdapter::new(ai_core::InferenceConfig {
            base_url: server.uri(),
            classifier_timeout_ms: 50,
            ..Default::default()
        })
        .unwrap();

        let err = adapter.classify_json("sys", "Prompt: hi").await.unwrap_err();
        assert!(matches!(err, ApplicationError::ReasoningTimeout(50)));
    }
}

// ============================================================================
// Synthesis adapter
// ============================================================================

mod synthesis_tests {
    use super::*;

    #[tokio::test]
    async fn resource_exhaustion_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rpc/speech_synthesis"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": {"kind": "resource_exhausted", "message": "out of memory"}
            })))
            .mount(&server)
            .await;

        let err = synthesis_adapter(&server.uri())
            .speech_synthesis(application::SpeechSynthesisRequest {
                content: "hi".into(),
                voice_path: "/voices/alloy.wav".into(),
                style_instruction: None,
                clone_text: None,
                request_id: "r1".into(),
            })
            .await
            .unwrap_err();

        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn eviction_count_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rpc/evict_stale_artifacts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"removed": 3})))
            .mount(&server)
            .await;

        assert_eq!(
            synthesis_adapter(&server.uri())
                .evict_stale_artifacts()
                .await
                .unwrap(),
            3
        );
    }
}

// ============================================================================
// End-to-end orchestration
// ============================================================================

mod orchestration_tests {
    use super::*;
    use infrastructure::VoicesConfig;

    struct Fixture {
        _root: tempfile::TempDir,
        orchestrator: RequestOrchestrator,
        artifacts: std::path::PathBuf,
        scratch: std::path::PathBuf,
    }

    fn fixture(reasoning_url: &str, worker_url: &str) -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let voices_dir = root.path().join("voices");
        std::fs::create_dir_all(&voices_dir).unwrap();
        std::fs::write(
            voices_dir.join("alloy.wav"),
            PcmAudio::silence(6_000, 16_000).to_wav().unwrap(),
        )
        .unwrap();
        let artifacts = root.path().join("artifacts");
        let scratch = root.path().join("scratch");
        std::fs::create_dir_all(&scratch).unwrap();

        let catalog = load_voice_catalog(&VoicesConfig {
            preset_dir: voices_dir,
            ..VoicesConfig::default()
        })
        .unwrap();

        let orchestrator = RequestOrchestrator::new(OrchestratorDeps {
            reasoning: Arc::new(reasoning_adapter(reasoning_url)),
            synthesis: Arc::new(synthesis_adapter(worker_url)),
            store: Arc::new(FileArtifactStore::new(&artifacts).unwrap()),
            converter: Arc::new(AudioConversionAdapter::default()),
            voices: VoiceResolver::new(Arc::new(catalog), &scratch),
            scratch_root: ScratchRoot::new(&scratch),
            max_rounds: 1,
        });

        Fixture {
            _root: root,
            orchestrator,
            artifacts,
            scratch,
        }
    }

    #[tokio::test]
    async fn tts_request_is_synthesized_once_then_cached() {
        let reasoning = MockServer::start().await;
        let worker = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({"tool_choice": "auto"})))
            .respond_with(chat_reply(serde_json::json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "generate_tts", "arguments": "{\"text\":\"Hello there\",\"requestID\":\"r\"}"}
                }]
            })))
            .expect(1)
            .mount(&reasoning)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({"response_format": {"type": "json_object"}})))
            .respond_with(chat_reply(serde_json::json!({
                "role": "assistant",
                "content": "{\"intent\":\"DIRECT\",\"content\":\"Hello there\"}"
            })))
            .expect(1)
            .mount(&reasoning)
            .await;

        Mock::given(method("POST"))
            .and(path("/rpc/cache_name"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"digest": "feedc0ffee42"})),
            )
            .expect(2)
            .mount(&worker)
            .await;
        Mock::given(method("POST"))
            .and(path("/rpc/speech_synthesis"))
            .and(body_partial_json(serde_json::json!({"content": "Hello there"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "samples_b64": samples_b64(&[0.0, 0.5, -0.5, 0.25]),
                "sample_rate": 24000
            })))
            .expect(1)
            .mount(&worker)
            .await;

        let fx = fixture(&reasoning.uri(), &worker.uri());

        let first = fx
            .orchestrator
            .handle(GenerationRequest::new("Hello there").unwrap())
            .await
            .unwrap();
        assert!(!first.from_cache);
        assert_eq!(first.selection, Some(PipelineSelection::Tts));
        assert!(fx.artifacts.join("feedc0ffee42.wav").exists());

        let second = fx
            .orchestrator
            .handle(GenerationRequest::new("Hello there").unwrap())
            .await
            .unwrap();
        assert!(second.from_cache);
        assert_eq!(first.result, second.result);
        match second.result {
            PipelineResult::Audio { sample_rate, .. } => assert_eq!(sample_rate, 24000),
            PipelineResult::Text(_) => panic!("expected audio"),
        }

        assert_eq!(std::fs::read_dir(&fx.scratch).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn unreachable_worker_fails_cleanly() {
        let reasoning = MockServer::start().await;
        let fx = fixture(&reasoning.uri(), "http://127.0.0.1:1");

        let err = fx
            .orchestrator
            .handle(GenerationRequest::new("Hello").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, ApplicationError::Synthesis { .. }));
        assert!(!err.is_client_error());
    }
}
