//! # Request Extraction Helpers
//!
//! Handlers take `Result<Json<T>, JsonRejection>` and unwrap it here so that
//! malformed or missing bodies produce the structured [`AppError`] body
//! instead of axum's plain-text rejection.

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Unwrap a JSON body, mapping any rejection to a 400.
pub fn extract_json<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Parse an optional JSON body. A blank body is `None`.
pub fn optional_json<T: DeserializeOwned>(body: &Bytes) -> Result<Option<T>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn blank_body_is_none() {
        assert!(optional_json::<Value>(&Bytes::new()).unwrap().is_none());
        assert!(optional_json::<Value>(&Bytes::from_static(b" \n")).unwrap().is_none());
    }

    #[test]
    fn malformed_body_is_bad_request() {
        let err = optional_json::<Value>(&Bytes::from_static(b"{nope")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
