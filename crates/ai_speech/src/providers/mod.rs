//! Synthesis worker client implementations
//!
//! Contains the concrete implementation of the `SynthesisService` trait.

pub mod remote_worker;

pub use remote_worker::RemoteWorkerClient;
