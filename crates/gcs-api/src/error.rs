//! API error types

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (error_type, message) = match &self {
            ApiError::NotFound(msg) => ("not_found", msg.clone()),
            ApiError::BadRequest(msg) => ("bad_request", msg.clone()),
            ApiError::Conflict(msg) => ("conflict", msg.clone()),
            ApiError::Internal(msg) => ("internal_error", msg.clone()),
        };

        let body = Json(ErrorResponse {
            error: error_type.into(),
            message,
        });

        (self.status(), body).into_response()
    }
}

impl From<gcs_core::CoreError> for ApiError {
    fn from(err: gcs_core::CoreError) -> Self {
        match err {
            gcs_core::CoreError::MissionNotFound(id) => ApiError::NotFound(format!("mission {}", id)),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<prometheus::Error> for ApiError {
    fn from(err: prometheus::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}
