use axum::http::{Method, StatusCode};
use std::collections::HashMap;
use std::time::Duration;

use crate::config::RouteSettings;
use crate::error::{AppError, Result};

/// Idempotency declaration for a single route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePolicy {
    pub method: Method,
    pub route: String,
    pub ttl: Duration,
    pub success_status: StatusCode,
}

impl RoutePolicy {
    pub fn new(method: Method, route: impl AsRef<str>, ttl: Duration) -> Self {
        Self {
            method,
            route: route.as_ref().to_string(),
            ttl,
            success_status: StatusCode::OK,
        }
    }

    pub fn with_success_status(mut self, status: StatusCode) -> Self {
        self.success_status = status;
        self
    }

    pub fn from_settings(settings: &RouteSettings) -> Result<Self> {
        let method = Method::from_bytes(settings.method.to_uppercase().as_bytes()).map_err(|_| {
            AppError::Validation(format!(
                "Invalid HTTP method '{}' for idempotent route {}",
                settings.method, settings.path
            ))
        })?;
        let success_status = StatusCode::from_u16(settings.success_status).map_err(|_| {
            AppError::Validation(format!(
                "Invalid success status {} for idempotent route {}",
                settings.success_status, settings.path
            ))
        })?;

        Ok(Self::new(method, &settings.path, Duration::from_secs(settings.ttl_secs))
            .with_success_status(success_status))
    }
}

/// Static table of idempotency-enabled routes, consulted per request.
///
/// Paths match exactly, with the same case and trailing-slash sensitivity
/// as the axum router, so a request the router would 404 is never
/// reserved or buffered.
#[derive(Debug, Clone, Default)]
pub struct RoutePolicyTable {
    policies: HashMap<(Method, String), RoutePolicy>,
}

impl RoutePolicyTable {
    pub fn new(policies: impl IntoIterator<Item = RoutePolicy>) -> Self {
        Self {
            policies: policies
                .into_iter()
                .map(|policy| ((policy.method.clone(), policy.route.clone()), policy))
                .collect(),
        }
    }

    pub fn from_settings(routes: &[RouteSettings]) -> Result<Self> {
        let policies = routes
            .iter()
            .map(RoutePolicy::from_settings)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(policies))
    }

    pub fn lookup(&self, method: &Method, path: &str) -> Option<&RoutePolicy> {
        self.policies.get(&(method.clone(), path.to_string()))
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RoutePolicyTable {
        RoutePolicyTable::new([RoutePolicy::new(
            Method::POST,
            "/subscription/subscribe",
            Duration::from_secs(30),
        )])
    }

    #[test]
    fn test_lookup_matches_method_and_path() {
        let table = table();
        let policy = table
            .lookup(&Method::POST, "/subscription/subscribe")
            .expect("policy");
        assert_eq!(policy.ttl, Duration::from_secs(30));
        assert_eq!(policy.success_status, StatusCode::OK);

        assert!(table.lookup(&Method::GET, "/subscription/subscribe").is_none());
        assert!(table.lookup(&Method::POST, "/services").is_none());
    }

    #[test]
    fn test_lookup_is_case_and_slash_sensitive() {
        let table = table();
        assert!(table.lookup(&Method::POST, "/Subscription/Subscribe").is_none());
        assert!(table.lookup(&Method::POST, "/subscription/subscribe/").is_none());
    }

    #[test]
    fn test_from_settings() {
        let routes = vec![RouteSettings {
            method: "post".to_string(),
            path: "/orders".to_string(),
            ttl_secs: 10,
            success_status: 201,
        }];
        let table = RoutePolicyTable::from_settings(&routes).unwrap();
        let policy = table.lookup(&Method::POST, "/orders").unwrap();
        assert_eq!(policy.success_status, StatusCode::CREATED);
    }

    #[test]
    fn test_from_settings_rejects_bad_status() {
        let routes = vec![RouteSettings {
            method: "POST".to_string(),
            path: "/orders".to_string(),
            ttl_secs: 10,
            success_status: 42,
        }];
        assert!(RoutePolicyTable::from_settings(&routes).is_err());
    }
}
