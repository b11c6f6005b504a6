//! Configuration for inference engine

use serde::{Deserialize, Serialize};

/// Configuration for the inference engine
#[derive(Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Base URL of the OpenAI-compatible server
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the chat-completions endpoint below `base_url`
    #[serde(default = "default_chat_path")]
    pub chat_path: String,

    /// Bearer token sent with every request
    #[serde(default)]
    pub api_key: Option<String>,

    /// Default model to use
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Model used for intent classification
    #[serde(default = "default_classifier_model")]
    pub classifier_model: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Timeout for intent classification in milliseconds
    #[serde(default = "default_classifier_timeout_ms")]
    pub classifier_timeout_ms: u64,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature for sampling (0.0 - 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Top-p (nucleus) sampling
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Referrer tag some hosted gateways use for attribution
    #[serde(default)]
    pub referrer: Option<String>,
}

fn default_base_url() -> String {
    "https://gen.pollinations.ai".to_string()
}

fn default_chat_path() -> String {
    "/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "openai".to_string()
}

fn default_classifier_model() -> String {
    "gemini-fast".to_string()
}

const fn default_timeout_ms() -> u64 {
    60000 // 60 seconds
}

const fn default_classifier_timeout_ms() -> u64 {
    30000
}

const fn default_max_tokens() -> u32 {
    3500
}

const fn default_temperature() -> f32 {
    0.7
}

const fn default_top_p() -> f32 {
    0.9
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            chat_path: default_chat_path(),
            api_key: None,
            default_model: default_model(),
            classifier_model: default_classifier_model(),
            timeout_ms: default_timeout_ms(),
            classifier_timeout_ms: default_classifier_timeout_ms(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            referrer: None,
        }
    }
}

impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("base_url", &self.base_url)
            .field("chat_path", &self.chat_path)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("default_model", &self.default_model)
            .field("classifier_model", &self.classifier_model)
            .field("timeout_ms", &self.timeout_ms)
            .field("classifier_timeout_ms", &self.classifier_timeout_ms)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("referrer", &self.referrer)
            .finish()
    }
}
