//! Reasoning adapter - Implements ReasoningPort using the ai_core engine

use std::sync::Arc;

use ai_core::{
    FunctionCall, InferenceConfig, InferenceEngine, InferenceError, InferenceMessage,
    InferenceRequest, OpenAiCompatibleEngine, ToolCall, ToolDefinition,
};
use application::error::ApplicationError;
use application::ports::{ReasoningMessage, ReasoningPort, ReasoningTurn, ToolInvocation, ToolSpec};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

/// Sampling temperature for intent classification
const CLASSIFIER_TEMPERATURE: f32 = 0.2;

/// Adapter for the reasoning service
pub struct ReasoningAdapter {
    engine: Arc<dyn InferenceEngine>,
    classifier_model: String,
    classifier_timeout_ms: u64,
}

impl std::fmt::Debug for ReasoningAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasoningAdapter")
            .field("model", &self.engine.default_model())
            .field("classifier_model", &self.classifier_model)
            .finish_non_exhaustive()
    }
}

impl ReasoningAdapter {
    /// Create an adapter backed by an OpenAI-compatible engine
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Configuration` if the HTTP client cannot be built.
    pub fn new(config: InferenceConfig) -> Result<Self, ApplicationError> {
        let classifier_model = config.classifier_model.clone();
        let classifier_timeout_ms = config.classifier_timeout_ms;
        let engine = OpenAiCompatibleEngine::new(config)
            .map_err(|e| ApplicationError::Configuration(e.to_string()))?;
        Ok(Self::with_engine(
            Arc::new(engine),
            classifier_model,
            classifier_timeout_ms,
        ))
    }

    pub fn with_engine(
        engine: Arc<dyn InferenceEngine>,
        classifier_model: impl Into<String>,
        classifier_timeout_ms: u64,
    ) -> Self {
        Self {
            engine,
            classifier_model: classifier_model.into(),
            classifier_timeout_ms,
        }
    }

    fn map_error(err: InferenceError) -> ApplicationError {
        match err {
            InferenceError::Timeout(ms) => ApplicationError::ReasoningTimeout(ms),
            other => ApplicationError::UpstreamReasoning(other.to_string()),
        }
    }

    fn to_wire(message: &ReasoningMessage) -> InferenceMessage {
        match message {
            ReasoningMessage::System(content) => InferenceMessage::system(content),
            ReasoningMessage::User(content) => InferenceMessage::user(content),
            ReasoningMessage::AssistantToolCalls(calls) => InferenceMessage::assistant_tool_calls(
                None,
                calls
                    .iter()
                    .map(|call| ToolCall {
                        id: call.id.clone(),
                        kind: "function".to_string(),
                        function: FunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        },
                    })
                    .collect(),
            ),
            ReasoningMessage::ToolResult { call_id, content } => {
                InferenceMessage::tool_result(call_id, content)
            },
        }
    }

    fn tool_definition(spec: &ToolSpec) -> ToolDefinition {
        ToolDefinition::function(&spec.name, &spec.description, spec.parameters.clone())
    }
}

#[async_trait]
impl ReasoningPort for ReasoningAdapter {
    #[instrument(skip_all, fields(messages = messages.len(), tools = tools.len()))]
    async fn invoke_tools(
        &self,
        messages: &[ReasoningMessage],
        tools: &[ToolSpec],
    ) -> Result<ReasoningTurn, ApplicationError> {
        let request = InferenceRequest::from_messages(messages.iter().map(Self::to_wire).collect())
            .with_tools(tools.iter().map(Self::tool_definition).collect());

        let response = self
            .engine
            .generate(request)
            .await
            .map_err(Self::map_error)?;

        let tool_calls: Vec<ToolInvocation> = response
            .tool_calls
            .into_iter()
            .map(|call| ToolInvocation {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();
        debug!(tool_calls = tool_calls.len(), "Tool-calling round finished");

        Ok(ReasoningTurn {
            content: response.content,
            tool_calls,
        })
    }

    #[instrument(skip_all, fields(model = %self.classifier_model))]
    async fn classify_json(&self, system: &str, user: &str) -> Result<String, ApplicationError> {
        let request = InferenceRequest::with_system(system, user)
            .with_model(&self.classifier_model)
            .with_temperature(CLASSIFIER_TEMPERATURE)
            .with_timeout_ms(self.classifier_timeout_ms)
            .json_mode();

        let response = self
            .engine
            .generate(request)
            .await
            .map_err(Self::map_error)?;
        Ok(response.text().to_string())
    }

    #[instrument(skip_all, fields(max_tokens))]
    async fn complete_text(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, ApplicationError> {
        let request = InferenceRequest::with_system(system, user).with_max_tokens(max_tokens);

        let response = self
            .engine
            .generate(request)
            .await
            .map_err(Self::map_error)?;
        Ok(response.text().to_string())
    }

    async fn is_healthy(&self) -> bool {
        match self.engine.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!(error = %e, "Reasoning health check failed");
                false
            },
        }
    }
}
