//! AI Core - Reasoning client for pipeline routing and text generation
//!
//! Talks to an OpenAI-compatible chat-completions endpoint with function
//! calling and JSON mode.

pub mod config;
pub mod error;
pub mod openai_compat;
pub mod ports;

pub use config::InferenceConfig;
pub use error::InferenceError;
pub use openai_compat::OpenAiCompatibleEngine;
pub use ports::{
    FunctionCall, FunctionDefinition, InferenceEngine, InferenceMessage, InferenceRequest,
    InferenceResponse, ResponseFormat, TokenUsage, ToolCall, ToolChoice, ToolDefinition,
};
