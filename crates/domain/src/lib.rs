//! Domain layer for VoiceGate
//!
//! Contains the request model, voice references, cache addressing, pipeline
//! selection types and domain errors. This layer performs no I/O beyond
//! in-memory audio decoding and defines the ubiquitous language.

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use value_objects::*;
