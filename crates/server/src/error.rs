// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use triage_console_core::TranscriptError;

use crate::tracker::TrackerError;

/// Structured JSON error body for API errors.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bug not found: {0}")]
    BugNotFound(u32),

    #[error("tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("transcript error: {0}")]
    Transcript(#[from] TranscriptError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::BugNotFound(id) => {
                tracing::warn!(bug_id = id, "bug not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Bug not found", format!("Bug id: {id}")),
                )
            }
            ApiError::Tracker(TrackerError::NotConfigured) => {
                tracing::warn!("tracker not configured");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new("Tracker is not configured; set org, project and area path"),
                )
            }
            ApiError::Tracker(TrackerError::Auth(msg)) => {
                tracing::error!(message = %msg, "tracker auth failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details("Tracker authentication failed", msg.clone()),
                )
            }
            ApiError::Tracker(TrackerError::Http(err)) => {
                tracing::error!(error = %err, "tracker request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse::with_details("Tracker request failed", err.to_string()),
                )
            }
            ApiError::Transcript(err) => {
                tracing::error!(error = %err, "transcript read failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details("Failed to read transcript", err.to_string()),
                )
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg.clone()),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "internal server error");
                // Internal details stay out of the response body.
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
