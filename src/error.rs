//! Gateway error types.

use std::time::Duration;

use thiserror::Error;

use crate::backend::BackendError;

/// Errors surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Request missing required path/body fields, or not valid JSON.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No such resource or action.
    #[error("not found: {0}")]
    NotFound(String),

    /// The order engine could not serve the call.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The call did not complete within the gateway deadline.
    #[error("backend call exceeded deadline of {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl GatewayError {
    /// Stable machine-readable code for the error body.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::InvalidRequest(_) => "INVALID_REQUEST",
            GatewayError::NotFound(_) => "NOT_FOUND",
            GatewayError::Timeout(_) => "BACKEND_TIMEOUT",
            GatewayError::Backend(err) => match err {
                BackendError::Unavailable(_) | BackendError::ChannelClosed => "BACKEND_UNAVAILABLE",
                BackendError::DeadlineExceeded => "BACKEND_TIMEOUT",
                BackendError::InvalidEndpoint { .. } => "INTERNAL",
                BackendError::Rpc { .. } => "BACKEND_ERROR",
            },
        }
    }

    /// True for failures that happened before any backend response existed.
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, GatewayError::Backend(_) | GatewayError::Timeout(_))
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
