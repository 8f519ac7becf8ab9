use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::responses::{ErrorResponse, ValidationErrorDetail};
use crate::cache::CacheError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Request validation failed")]
    ValidationFailed(Vec<ValidationErrorDetail>),

    #[error("Service with ID {0} was not found")]
    ServiceNotFound(i32),

    #[error("Customer {customer_phone_number} has no subscription to {service_name}")]
    SubscriptionNotFound {
        customer_phone_number: String,
        service_name: String,
    },

    #[error("Customer {customer_phone_number} is already subscribed to {service_name}")]
    DuplicateSubscription {
        customer_phone_number: String,
        service_name: String,
    },

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            AppError::ServiceNotFound(_) | AppError::SubscriptionNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            AppError::DuplicateSubscription { .. } => StatusCode::CONFLICT,
            AppError::Cache(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable name of the error kind, reported in the `error` response field.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) | AppError::ValidationFailed(_) => "ValidationError",
            AppError::ServiceNotFound(_) => "ServiceNotFound",
            AppError::SubscriptionNotFound { .. } => "SubscriptionNotFound",
            AppError::DuplicateSubscription { .. } => "DuplicateSubscription",
            AppError::Cache(_) | AppError::Config(_) | AppError::Internal(_) => "InternalError",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Unhandled application error");
            "An unexpected error occurred".to_string()
        } else {
            self.to_string()
        };

        let mut body = ErrorResponse::new(status.as_u16(), message, self.kind());
        if let AppError::ValidationFailed(details) = self {
            body = body.with_details(details);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::ServiceNotFound(9).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::DuplicateSubscription {
                customer_phone_number: "+15551234567".to_string(),
                service_name: "eLearning Portal".to_string(),
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Validation("bad".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            AppError::ServiceNotFound(42).to_string(),
            "Service with ID 42 was not found"
        );
        assert_eq!(AppError::ServiceNotFound(42).kind(), "ServiceNotFound");
    }
}
