//! Infrastructure adapters
//!
//! Adapters connect application ports to concrete implementations.

mod audio_conversion_adapter;
mod reasoning_adapter;
mod synthesis_adapter;

pub use audio_conversion_adapter::AudioConversionAdapter;
pub use reasoning_adapter::ReasoningAdapter;
pub use synthesis_adapter::SynthesisAdapter;
