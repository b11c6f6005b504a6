//! Application layer for VoiceGate
//!
//! Orchestrates a generation request: cache addressing, voice and speech
//! preparation, pipeline routing and execution. Everything outside the
//! process is reached through the ports defined here.

pub mod error;
pub mod ports;
pub mod services;

pub use error::ApplicationError;
pub use ports::*;
pub use services::*;
