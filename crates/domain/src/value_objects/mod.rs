//! Value Objects - Immutable, identity-less domain primitives

mod audio_format;
mod cache_key;
mod duration_bounds;
mod request_id;

pub use audio_format::AudioFormat;
pub use cache_key::CacheKey;
pub use duration_bounds::DurationBounds;
pub use request_id::RequestId;
