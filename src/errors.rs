use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application-wide error type
#[derive(Debug)]
pub enum AppError {
    InvalidRequest(String),
    ContentPolicy { message: String },
    OffTopic { message: String },
    PolicyViolation { message: String },
    Upstream(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            AppError::ContentPolicy { message } => write!(f, "Content policy violation: {}", message),
            AppError::OffTopic { message } => write!(f, "Off-topic response: {}", message),
            AppError::PolicyViolation { message } => write!(f, "Input policy violation: {}", message),
            AppError::Upstream(msg) => write!(f, "Upstream capability error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            // Missing/empty fields keep the original single-field body so
            // existing clients can match on it verbatim.
            AppError::InvalidRequest(msg) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": msg })),
            )
                .into_response(),
            AppError::ContentPolicy { message } => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Content policy violation",
                    "message": message,
                })),
            )
                .into_response(),
            AppError::OffTopic { message } => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Off-topic response",
                    "message": message,
                })),
            )
                .into_response(),
            AppError::PolicyViolation { message } => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Input policy violation",
                    "message": message,
                })),
            )
                .into_response(),
            AppError::Upstream(msg) => {
                tracing::error!("Upstream capability failure: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "error": "Evaluation service unavailable" })),
                )
                    .into_response()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
