//! OpenAI-compatible chat-completions engine
//!
//! Works against any gateway exposing `/v1/chat/completions` with function
//! calling (hosted gateways, vLLM, llama.cpp server, Ollama's OpenAI shim).

mod client;

pub use client::OpenAiCompatibleEngine;
