//! Reasoning port - Interface to the routing/classification LLM

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::Value;

use crate::error::ApplicationError;

/// A callable function advertised to the reasoning service
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the argument object
    pub parameters: Value,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A function call requested by the reasoning service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Correlates a later tool result with this call
    pub id: String,
    pub name: String,
    /// Raw JSON argument object, exactly as returned
    pub arguments: String,
}

/// One message of a tool-calling exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReasoningMessage {
    System(String),
    User(String),
    /// Echo of the calls the service made in a previous round
    AssistantToolCalls(Vec<ToolInvocation>),
    /// Answer to a previous tool call
    ToolResult { call_id: String, content: String },
}

/// Reply to a tool-calling request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReasoningTurn {
    /// Plain text the service produced instead of (or next to) tool calls
    pub content: Option<String>,
    pub tool_calls: Vec<ToolInvocation>,
}

impl ReasoningTurn {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Port for the reasoning (chat-completions) collaborator
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReasoningPort: Send + Sync {
    /// Run one tool-calling round with `tool_choice = auto`
    async fn invoke_tools(
        &self,
        messages: &[ReasoningMessage],
        tools: &[ToolSpec],
    ) -> Result<ReasoningTurn, ApplicationError>;

    /// Ask the classifier model for a JSON object and return it unparsed
    async fn classify_json(&self, system: &str, user: &str) -> Result<String, ApplicationError>;

    /// Free-form text completion capped at `max_tokens`
    async fn complete_text(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, ApplicationError>;

    /// Check if the reasoning backend is reachable
    async fn is_healthy(&self) -> bool;
}
