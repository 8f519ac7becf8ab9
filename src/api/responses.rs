use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::observability::{AggregatedHealth, DependencyHealth, HealthStatus};

/// Error body returned for domain and validation failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub message: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ErrorResponse {
    pub fn new(status_code: u16, message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<ValidationErrorDetail>) -> Self {
        self.details = Some(details);
        self
    }
}

/// Validation error detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub dependencies: Vec<DependencyHealth>,
}

impl From<AggregatedHealth> for HealthResponse {
    fn from(health: AggregatedHealth) -> Self {
        Self {
            status: health.status,
            version: health.version,
            timestamp: Utc::now(),
            uptime_seconds: health.uptime_seconds,
            dependencies: health.dependencies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_shape() {
        let body = ErrorResponse::new(404, "Service with ID 9 was not found", "ServiceNotFound");
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["statusCode"], 404);
        assert_eq!(json["error"], "ServiceNotFound");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_error_response_with_details() {
        let body = ErrorResponse::new(400, "Request validation failed", "ValidationError")
            .with_details(vec![ValidationErrorDetail {
                field: "serviceId".to_string(),
                message: "Service ID must be greater than 0".to_string(),
            }]);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["details"][0]["field"], "serviceId");
    }
}
