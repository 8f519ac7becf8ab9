use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::cache::CacheError;

pub const MISSING_KEY_MESSAGE: &str = "Missing Idempotency-Key header";
pub const IN_FLIGHT_MESSAGE: &str = "A request with this Idempotency-Key is already being processed";
pub const INTERNAL_FAULT_MESSAGE: &str = "An error occurred processing the request";

/// Failures resolved at the idempotency interceptor boundary.
#[derive(Debug, Error)]
pub enum IdempotencyError {
    #[error("{}", MISSING_KEY_MESSAGE)]
    MissingKey,

    #[error("Idempotency-Key header is invalid: {0}")]
    InvalidKey(String),

    #[error("Idempotency-Key header exceeds {max} characters")]
    KeyTooLarge { max: usize },

    #[error("Request body exceeds {max} bytes")]
    PayloadTooLarge { max: usize },

    #[error("Request body could not be read")]
    UnreadableBody,

    #[error("{}", IN_FLIGHT_MESSAGE)]
    ReservationTimeout,

    #[error("Cache backend unavailable: {0}")]
    CacheBackendUnavailable(#[from] CacheError),

    #[error("Cache entry encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl IdempotencyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IdempotencyError::MissingKey
            | IdempotencyError::InvalidKey(_)
            | IdempotencyError::KeyTooLarge { .. }
            | IdempotencyError::UnreadableBody => StatusCode::BAD_REQUEST,
            IdempotencyError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            IdempotencyError::ReservationTimeout => StatusCode::CONFLICT,
            IdempotencyError::CacheBackendUnavailable(_) | IdempotencyError::Encoding(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// True for faults of the cache itself, which degrade rather than fail.
    pub fn is_backend_fault(&self) -> bool {
        matches!(
            self,
            IdempotencyError::CacheBackendUnavailable(_) | IdempotencyError::Encoding(_)
        )
    }
}

impl IntoResponse for IdempotencyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            INTERNAL_FAULT_MESSAGE.to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_map_to_client_statuses() {
        assert_eq!(IdempotencyError::MissingKey.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            IdempotencyError::KeyTooLarge { max: 10 }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            IdempotencyError::PayloadTooLarge { max: 10 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            IdempotencyError::ReservationTimeout.status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_backend_faults_are_flagged() {
        let fault = IdempotencyError::CacheBackendUnavailable(CacheError::Unavailable(
            "down".to_string(),
        ));
        assert!(fault.is_backend_fault());
        assert!(!IdempotencyError::MissingKey.is_backend_fault());
    }

    #[test]
    fn test_missing_key_message() {
        assert_eq!(
            IdempotencyError::MissingKey.to_string(),
            "Missing Idempotency-Key header"
        );
    }
}
