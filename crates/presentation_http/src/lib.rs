//! VoiceGate HTTP presentation layer
//!
//! Exposes the generation endpoint, health probes and the middleware that
//! wraps them.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod shutdown;
pub mod state;
pub mod tasks;

pub use error::{ApiError, set_expose_internal_errors};
pub use middleware::{ProcessTimeLayer, RequestIdLayer, ValidatedJson};
pub use routes::create_router;
pub use state::AppState;
