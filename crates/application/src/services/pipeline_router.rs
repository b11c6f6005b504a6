//! Pipeline router - lets the reasoning service pick exactly one pipeline
//!
//! The four pipelines are advertised as callable functions. A reply must
//! contain exactly one well-formed call; anything else is answered with a
//! tool error and renegotiated while rounds remain. Plain text without a
//! call, or a transport failure, ends routing immediately.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use domain::{PipelineCall, PipelineSelection};
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use crate::error::ApplicationError;
use crate::ports::{ReasoningMessage, ReasoningPort, ReasoningTurn, ToolInvocation, ToolSpec};

/// Default number of tool-calling rounds
pub const DEFAULT_MAX_ROUNDS: u32 = 1;

/// Lifecycle of one routing decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    AwaitingDecision,
    Dispatched(PipelineSelection),
    Done(PipelineSelection),
    Failed,
}

impl RouterState {
    /// Pipeline finished successfully
    #[must_use]
    pub const fn complete(self) -> Self {
        match self {
            Self::Dispatched(selection) => Self::Done(selection),
            other => other,
        }
    }

    /// Routing or the dispatched pipeline failed
    #[must_use]
    pub const fn fail(self) -> Self {
        match self {
            Self::Done(selection) => Self::Done(selection),
            _ => Self::Failed,
        }
    }

    pub const fn selection(&self) -> Option<PipelineSelection> {
        match self {
            Self::Dispatched(s) | Self::Done(s) => Some(*s),
            Self::AwaitingDecision | Self::Failed => None,
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed)
    }
}

/// What the router tells the reasoning service about a request
#[derive(Debug, Clone, Copy)]
pub struct RoutingContext<'a> {
    pub request_id: &'a str,
    pub text: &'a str,
    pub system_instruction: Option<&'a str>,
    /// Resolved reference voice
    pub voice_path: Option<&'a Path>,
    /// Materialized speech input, if the request carried any
    pub speech_path: Option<&'a Path>,
}

impl RoutingContext<'_> {
    const fn has_speech_input(&self) -> bool {
        self.speech_path.is_some()
    }
}

/// A validated routing decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub call: PipelineCall,
    pub rounds: u32,
}

/// Selects a pipeline through function calling
pub struct PipelineRouter {
    reasoning: Arc<dyn ReasoningPort>,
    max_rounds: u32,
    tools: Vec<ToolSpec>,
}

impl fmt::Debug for PipelineRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineRouter")
            .field("max_rounds", &self.max_rounds)
            .finish_non_exhaustive()
    }
}

impl PipelineRouter {
    pub fn new(reasoning: Arc<dyn ReasoningPort>) -> Self {
        Self {
            reasoning,
            max_rounds: DEFAULT_MAX_ROUNDS,
            tools: pipeline_tools(),
        }
    }

    #[must_use]
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    /// Ask the reasoning service for exactly one pipeline call
    #[instrument(skip(self, ctx), fields(request_id = ctx.request_id, speech = ctx.has_speech_input()))]
    pub async fn route(&self, ctx: &RoutingContext<'_>) -> Result<RoutingDecision, ApplicationError> {
        let mut messages = vec![
            ReasoningMessage::System(ROUTER_INSTRUCTION.to_string()),
            ReasoningMessage::User(user_instruction(ctx)),
        ];
        let mut last_rejection = String::new();

        for round in 1..=self.max_rounds {
            debug!(round, "Requesting pipeline decision");
            let turn = self.reasoning.invoke_tools(&messages, &self.tools).await?;

            if !turn.has_tool_calls() {
                if let Some(content) = turn.content.as_deref() {
                    info!(content_len = content.len(), "Reasoning answered without a tool call");
                }
                return Err(ApplicationError::NoPipelineExecuted);
            }

            match validate_turn(&turn, ctx) {
                Ok(call) => {
                    info!(pipeline = %call.selection(), round, "Pipeline selected");
                    return Ok(RoutingDecision { call, rounds: round });
                },
                Err(reason) => {
                    warn!(round, reason = %reason, "Rejected tool call");
                    messages.push(ReasoningMessage::AssistantToolCalls(turn.tool_calls.clone()));
                    messages.extend(turn.tool_calls.iter().map(|call| ReasoningMessage::ToolResult {
                        call_id: call.id.clone(),
                        content: format!("error: {reason}. Call exactly one valid pipeline function."),
                    }));
                    last_rejection = reason;
                },
            }
        }

        Err(ApplicationError::UpstreamReasoning(format!(
            "no valid pipeline call after {} round(s): {last_rejection}",
            self.max_rounds
        )))
    }
}

fn validate_turn(turn: &ReasoningTurn, ctx: &RoutingContext<'_>) -> Result<PipelineCall, String> {
    let [invocation]: &[ToolInvocation; 1] = turn
        .tool_calls
        .as_slice()
        .try_into()
        .map_err(|_| format!("expected one tool call, got {}", turn.tool_calls.len()))?;

    let call = PipelineCall::from_tool_call(&invocation.name, &invocation.arguments)
        .map_err(|e| e.to_string())?;

    if call.selection().requires_speech_input() && !ctx.has_speech_input() {
        return Err(format!(
            "{} needs speech input but the request has none",
            call.selection()
        ));
    }
    Ok(call)
}

fn user_instruction(ctx: &RoutingContext<'_>) -> String {
    fn or_none<T: fmt::Display>(value: Option<T>) -> String {
        value.map_or_else(|| "None".to_string(), |v| v.to_string())
    }

    format!(
        "requestID: {}\n\
         prompt: {}\n\
         synthesis_audio_path: {}\n\
         system_instruction: {}\n\
         voice_path: {}\n\
         Analyze this request and call the appropriate pipeline function.",
        ctx.request_id,
        ctx.text,
        or_none(ctx.speech_path.map(Path::display)),
        or_none(ctx.system_instruction),
        or_none(ctx.voice_path.map(Path::display)),
    )
}

const ROUTER_INSTRUCTION: &str = "You route audio requests to exactly one processing pipeline.\n\
\n\
Functions:\n\
- generate_tts(text, requestID, system, clone_text, voice): text in, speech out\n\
- generate_ttt(text, requestID, system): text in, text out\n\
- generate_sts(text, synthesis_audio_path, requestID, system, clone_text, voice): speech in, speech out\n\
- generate_stt(text, synthesis_audio_path, requestID, system): speech in, text out\n\
\n\
Rules:\n\
- Choose generate_ttt only when the user explicitly asks for a written or text-only answer \
(\"write me a script\", \"reply in text\", \"no audio\").\n\
- Choose generate_stt only when speech was provided and the user explicitly asks for a \
transcript or text (\"transcribe\", \"what did I say\", \"text only\").\n\
- Otherwise use generate_tts for text input and generate_sts when synthesis_audio_path is set.\n\
- When unsure, use generate_sts for speech input and generate_tts for text input.\n\
- Pass every provided argument through unchanged, and pass voice_path as the `voice` argument.\n\
- Call exactly one function. Do not answer in prose.";

/// Tool definitions for the four pipelines
pub fn pipeline_tools() -> Vec<ToolSpec> {
    PipelineSelection::ALL
        .iter()
        .map(|selection| {
            let (description, parameters) = match selection {
                PipelineSelection::Tts => (
                    "Convert text to speech in the given voice",
                    schema(&["text", "requestID"], true, false),
                ),
                PipelineSelection::Ttt => (
                    "Generate a text reply without audio",
                    schema(&["text", "requestID"], false, false),
                ),
                PipelineSelection::Sts => (
                    "Answer spoken input with speech",
                    schema(&["text", "synthesis_audio_path", "requestID"], true, true),
                ),
                PipelineSelection::Stt => (
                    "Transcribe spoken input to text",
                    schema(&["text", "synthesis_audio_path", "requestID"], false, true),
                ),
            };
            ToolSpec::new(selection.tool_name(), description, parameters)
        })
        .collect()
}

fn schema(required: &[&str], speaks: bool, listens: bool) -> Value {
    let mut properties = serde_json::Map::new();
    properties.insert(
        "text".into(),
        json!({"type": "string", "description": "The user's prompt"}),
    );
    properties.insert(
        "requestID".into(),
        json!({"type": "string", "description": "Request identifier"}),
    );
    properties.insert(
        "system".into(),
        json!({"type": ["string", "null"], "description": "Style or system instruction"}),
    );
    if listens {
        properties.insert(
            "synthesis_audio_path".into(),
            json!({"type": "string", "description": "Path of the user's speech input"}),
        );
    }
    if speaks {
        properties.insert(
            "clone_text".into(),
            json!({"type": ["string", "null"], "description": "Transcript of the reference voice"}),
        );
        properties.insert(
            "voice".into(),
            json!({"type": ["string", "null"], "description": "Voice name or voice file path"}),
        );
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}
