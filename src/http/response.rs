//! Response handling and transformation.
//!
//! # Responsibilities
//! - Map gateway errors to appropriate HTTP status codes
//! - Render a uniform JSON error body
//!
//! # Design Decisions
//! - Malformed input is 400 and never reaches the backend
//! - Unreachable backend is 503, deadline expiry is 504, other RPC failures 502
//! - Business rejections are not errors: they are 200 with the backend status

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::backend::BackendError;
use crate::error::GatewayError;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Backend(err) => match err {
                BackendError::Unavailable(_) | BackendError::ChannelClosed => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                BackendError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
                BackendError::InvalidEndpoint { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                BackendError::Rpc { .. } => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(status = %status, error = %self, "Request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "Request rejected");
        }
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}
