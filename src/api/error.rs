//! HTTP error mapping.

use crate::utils::error::RouterError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// API error type.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed `id`.
    BadRequest(String),
    /// The selected backend has no such customer.
    NotFound(String),
    /// The selected backend failed or timed out.
    BackendUnavailable { backend: String, message: String },
    /// Router misconfiguration discovered at request time.
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BackendUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BackendUnavailable { .. } => "BACKEND_UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code().to_string();
        let (message, details) = match self {
            ApiError::BackendUnavailable { backend, message } => {
                (message, Some(serde_json::json!({ "backend": backend })))
            }
            ApiError::BadRequest(message)
            | ApiError::NotFound(message)
            | ApiError::Internal(message) => (message, None),
        };

        let body = ErrorResponse {
            code,
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<RouterError> for ApiError {
    fn from(err: RouterError) -> Self {
        match err {
            RouterError::ValidationError { message } => ApiError::BadRequest(message),
            RouterError::BackendUnavailable { ref selector, .. } => ApiError::BackendUnavailable {
                backend: selector.to_string(),
                message: err.to_string(),
            },
            err => {
                tracing::error!("Unexpected router error: {}", err);
                ApiError::Internal(err.user_friendly_message())
            }
        }
    }
}
