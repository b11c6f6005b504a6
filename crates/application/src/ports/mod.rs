//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod artifact_store;
mod audio_conversion_port;
mod reasoning_port;
mod synthesis_port;

pub use artifact_store::ArtifactStore;
#[cfg(test)]
pub use artifact_store::MockArtifactStore;
pub use audio_conversion_port::AudioConversionPort;
#[cfg(test)]
pub use audio_conversion_port::MockAudioConversionPort;
#[cfg(test)]
pub use reasoning_port::MockReasoningPort;
pub use reasoning_port::{ReasoningMessage, ReasoningPort, ReasoningTurn, ToolInvocation, ToolSpec};
#[cfg(test)]
pub use synthesis_port::MockSynthesisPort;
pub use synthesis_port::{SpeechSynthesisRequest, SynthesisPort};
