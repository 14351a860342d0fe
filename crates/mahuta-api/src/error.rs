//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`MahutaError`] kinds to HTTP status codes and returns a JSON body
//! with a machine-readable code and a message. Internal failure details are
//! logged server-side and never returned to the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mahuta_core::MahutaError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Document or content not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// A required request field is missing or empty (400).
    #[error("validation error: {0}")]
    Validation(String),

    /// The request body or parameters could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Indexing into an index that was never created (400).
    #[error("{0}")]
    NoIndex(String),

    /// A backend call exceeded its deadline (408).
    #[error("timeout: {0}")]
    Timeout(String),

    /// Backend failure (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::NoIndex(_) => (StatusCode::BAD_REQUEST, "NO_INDEX"),
            Self::Timeout(_) => (StatusCode::REQUEST_TIMEOUT, "TIMEOUT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => {
                tracing::error!(error = %self, "internal server error");
                "An internal error occurred".to_string()
            }
            Self::Timeout(_) => {
                tracing::warn!(error = %self, "backend timeout");
                self.to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<MahutaError> for AppError {
    fn from(err: MahutaError) -> Self {
        match err {
            MahutaError::Validation(msg) => Self::Validation(msg),
            MahutaError::NotFound(msg) => Self::NotFound(msg),
            err @ MahutaError::NoIndex(_) => Self::NoIndex(err.to_string()),
            MahutaError::Timeout(msg) => Self::Timeout(msg),
            MahutaError::Technical {
                message,
                cause: Some(cause),
            } => Self::Internal(format!("{message}: {cause}")),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[test]
    fn maps_core_error_kinds() {
        let cases = [
            (MahutaError::validation("x"), StatusCode::BAD_REQUEST),
            (MahutaError::not_found("x"), StatusCode::NOT_FOUND),
            (MahutaError::NoIndex("docs".into()), StatusCode::BAD_REQUEST),
            (MahutaError::Timeout("x".into()), StatusCode::REQUEST_TIMEOUT),
            (MahutaError::connection("ipfs", "refused"), StatusCode::INTERNAL_SERVER_ERROR),
            (MahutaError::technical_msg("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            let (status, _) = AppError::from(err.clone()).status_and_code();
            assert_eq!(status, expected, "{err:?}");
        }
    }

    #[test]
    fn no_index_keeps_guidance_message() {
        let err = AppError::from(MahutaError::NoIndex("docs".into()));
        assert!(err.to_string().contains("create_index"));
    }

    #[tokio::test]
    async fn into_response_not_found() {
        let (status, body) = response_parts(AppError::NotFound("doc 123".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error.code, "NOT_FOUND");
        assert!(body.error.message.contains("doc 123"));
        assert!(body.error.details.is_none());
    }

    #[tokio::test]
    async fn into_response_timeout() {
        let (status, body) = response_parts(AppError::Timeout("read QmA".into())).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(body.error.code, "TIMEOUT");
    }

    #[tokio::test]
    async fn into_response_internal_hides_details() {
        let err = AppError::from(MahutaError::technical(
            "error calling IPFS",
            "connection reset by peer",
        ));
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.code, "INTERNAL_ERROR");
        assert_eq!(body.error.message, "An internal error occurred");
    }
}
