//! Error taxonomy and the error mapper.
//!
//! Every stage of the pipeline returns [`HttpError`]. The mapper splits errors
//! into two tiers:
//!
//! - **client-fault** errors carry their own status code and message and are
//!   reported to the caller as-is;
//! - **internal** errors are logged with their full cause chain and reported
//!   with a fixed, generic payload.
//!
//! The wire shape of a mapped error is [`ErrorPayload`]:
//!
//! ```json
//! {"statusCode":400,"error":"Bad Request","message":"\"age\" must be a number"}
//! ```

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use crate::validation::ValidationTarget;

/// Convenient result alias for pipeline stages.
pub type Result<T> = std::result::Result<T, HttpError>;

/// Message returned for every internal error.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal server error occurred";

/// Failure raised anywhere in the pipeline.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The body did not match its declared content type.
    #[error("invalid request body: {0}")]
    BodyParse(String),

    /// A query, path-parameter or body schema rejected the request.
    #[error("{target} validation failed: {message}")]
    Validation {
        target: ValidationTarget,
        message: String,
    },

    /// A requested local resource could not be read.
    #[error("{0}")]
    NotFound(String),

    /// An error intentionally raised by middleware or handler code.
    #[error("{status}: {message}")]
    Http { status: StatusCode, message: String },

    /// Anything else. Never shown to the caller.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl HttpError {
    /// Raise an error with an explicit status code.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create a 400 Bad Request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Create a 401 Unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// Create a 403 Forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    /// Create a 404 Not Found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Wrap an unexpected failure.
    pub fn internal(error: impl Into<anyhow::Error>) -> Self {
        Self::Internal(error.into())
    }

    /// HTTP status code this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BodyParse(_) | Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Http { status, .. } => *status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the failure is attributable to the caller.
    pub fn is_client_fault(&self) -> bool {
        !matches!(self, Self::Internal(_)) && self.status().is_client_error()
    }
}

/// Structured error body sent to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    /// HTTP status code, repeated in the body.
    pub status_code: u16,

    /// Reason phrase for the status code.
    pub error: String,

    /// Human-readable explanation.
    pub message: String,
}

impl ErrorPayload {
    /// Create a payload for `status` with the given message.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            error: reason(status),
            message: message.into(),
        }
    }

    /// The generic payload used for every internal error.
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
    }

    /// Status code as a typed value.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

fn reason(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Unknown").to_string()
}

/// Convert a pipeline failure into the payload returned to the caller.
///
/// Client-fault errors are logged at `warn` and keep their message. Internal
/// errors are logged at `error` with their cause chain and replaced by
/// [`ErrorPayload::internal`]. An explicitly raised error with a 5xx status
/// keeps its status but its message is replaced by [`INTERNAL_ERROR_MESSAGE`].
pub fn map_error(error: HttpError, request_id: &str) -> ErrorPayload {
    if error.is_client_fault() {
        warn!(request_id = %request_id, status = error.status().as_u16(), error = %error, "request rejected");
        let status = error.status();
        let message = match error {
            HttpError::BodyParse(detail) => format!("Invalid request body: {}", detail),
            HttpError::Validation { message, .. }
            | HttpError::NotFound(message)
            | HttpError::Http { message, .. } => message,
            HttpError::Internal(_) => INTERNAL_ERROR_MESSAGE.to_string(),
        };
        return ErrorPayload::new(status, message);
    }

    match error {
        HttpError::Http { status, message } if status.is_server_error() => {
            error!(request_id = %request_id, status = status.as_u16(), message = %message, "handler raised server error");
            ErrorPayload::new(status, INTERNAL_ERROR_MESSAGE)
        }
        other => {
            error!(request_id = %request_id, error = ?other, "unhandled error in pipeline");
            ErrorPayload::internal()
        }
    }
}
