//! AI Speech - Client for the persistent synthesis worker
//!
//! The synthesis worker keeps the speech models resident and exposes a small
//! RPC surface:
//! - `cache_name` - derive a content-addressed key from canonical fields
//! - `transcribe` - speech to text
//! - `speech_synthesis` - text (plus reference voice) to PCM samples
//! - `evict_stale_artifacts` - prune the artifact directory
//!
//! # Architecture
//!
//! This crate follows the ports & adapters pattern:
//! - `ports` module defines the `SynthesisService` trait
//! - `providers` module contains the HTTP worker client
//! - `converter` normalises uploaded speech to WAV with FFmpeg
//!
//! # Example
//!
//! ```ignore
//! use ai_speech::{RemoteWorkerClient, SpeechConfig, SynthesisRequest, SynthesisService};
//!
//! let worker = RemoteWorkerClient::new(SpeechConfig::default())?;
//! let key = worker.cache_name("hello\u{1f}\u{1f}alloy\u{1f}42").await?;
//! let pcm = worker
//!     .speech_synthesis(SynthesisRequest::new("hello", "voices/alloy.wav"))
//!     .await?;
//! ```

pub mod config;
pub mod converter;
pub mod error;
pub mod ports;
pub mod providers;
pub mod types;

pub use config::SpeechConfig;
pub use converter::AudioConverter;
pub use error::SpeechError;
pub use ports::SynthesisService;
pub use providers::remote_worker::RemoteWorkerClient;
pub use types::{SynthesisRequest, Transcription};
