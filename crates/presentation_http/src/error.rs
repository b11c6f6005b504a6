//! API error handling
//!
//! Errors leave the server as `{"error": {"message": ..., "code": ...}}`.
//! Internal failures are reduced to a generic message unless detail
//! exposure is switched on for development.

use std::sync::atomic::{AtomicBool, Ordering};

use application::ApplicationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

/// Whether 500 responses carry the underlying error message
static EXPOSE_INTERNAL_ERRORS: AtomicBool = AtomicBool::new(false);

const GENERIC_INTERNAL_MESSAGE: &str = "Something went wrong while generating your response.";

/// Configure whether internal error details are included in responses
pub fn set_expose_internal_errors(expose: bool) {
    EXPOSE_INTERNAL_ERRORS.store(expose, Ordering::SeqCst);
}

fn should_expose_details() -> bool {
    EXPOSE_INTERNAL_ERRORS.load(Ordering::SeqCst)
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::BadRequest(msg) | Self::NotFound(msg) => msg.clone(),
            Self::MethodNotAllowed => "Method not allowed for this endpoint.".to_string(),
            Self::PayloadTooLarge => "Request body is too large.".to_string(),
            Self::Internal(msg) => {
                if should_expose_details() {
                    msg.clone()
                } else {
                    GENERIC_INTERNAL_MESSAGE.to_string()
                }
            },
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    /// HTTP status code, repeated for clients that only read the body
    pub code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Internal(msg) => {
                error!(status = status.as_u16(), error = %msg, "Request failed");
            },
            Self::BadRequest(msg) | Self::NotFound(msg) => {
                debug!(status = status.as_u16(), error = %msg, "Request rejected");
            },
            Self::MethodNotAllowed | Self::PayloadTooLarge => {
                debug!(status = status.as_u16(), "Request rejected");
            },
        }

        let body = ErrorResponse {
            error: ErrorBody {
                message: self.public_message(),
                code: status.as_u16(),
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<ApplicationError> for ApiError {
    fn from(err: ApplicationError) -> Self {
        if err.is_client_error() {
            return Self::BadRequest(err.to_string());
        }
        Self::Internal(err.to_string())
    }
}

impl From<domain::DomainError> for ApiError {
    fn from(err: domain::DomainError) -> Self {
        ApplicationError::from(err).into()
    }
}
