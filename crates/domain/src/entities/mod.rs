//! Domain entities - Requests, artifacts and pipeline outcomes

mod artifact;
mod audio;
mod generation_request;
mod pipeline;
mod refined_content;
mod timing;
mod voice;

pub use artifact::Artifact;
pub use audio::{DecodedAudio, PcmAudio, strip_data_url};
pub use generation_request::{CanonicalFields, DEFAULT_SEED, GenerationRequest, SpeechInput};
pub use pipeline::{
    PipelineCall, PipelineResult, PipelineSelection, StsArgs, SttArgs, TtsArgs, TttArgs,
};
pub use refined_content::{Intent, PARALINGUISTIC_TAGS, RefinedContent};
pub use timing::TimingRecord;
pub use voice::{DEFAULT_VOICE, ResolvedVoiceRef, VoiceDescriptor, VoiceOrigin};
