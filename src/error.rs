//! Common error types for the load balancer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("no healthy instances available")]
    NoHealthyInstance,

    #[error("instance {address} is unreachable: {reason}")]
    BackendUnreachable { address: String, reason: String },

    #[error("index {index} is out of range for {len} instances")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body: `{"error": "..."}`
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl AppError {
    /// HTTP status surfaced to API callers
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NoHealthyInstance | AppError::BackendUnreachable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::IndexOutOfRange { .. }
            | AppError::InvalidAddress(_)
            | AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message placed in the response body. Unreachable instances are
    /// reported without the transport detail, which only goes to the logs.
    fn public_message(&self) -> String {
        match self {
            AppError::BackendUnreachable { address, .. } => {
                format!("instance {} is unreachable", address)
            }
            AppError::IndexOutOfRange { .. } => "invalid index".to_string(),
            AppError::Config(_) | AppError::Internal(_) => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(ErrorResponse {
            error: self.public_message(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
