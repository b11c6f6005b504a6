//! HTTP middleware components

pub mod process_time;
pub mod request_id;
pub mod validation;

pub use process_time::{PROCESS_TIME_HEADER, ProcessTimeLayer};
pub use request_id::{REQUEST_ID_HEADER, RequestIdLayer};
pub use validation::ValidatedJson;
