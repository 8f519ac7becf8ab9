use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use super::handlers;
use crate::idempotency::{idempotency_middleware, IdempotencyInterceptor};
use crate::observability::HealthChecker;
use crate::repositories::DbPool;
use crate::services::{CatalogService, SubscriptionService};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub subscriptions: SubscriptionService,
    pub health_checker: Arc<HealthChecker>,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(pool: DbPool, health_checker: Arc<HealthChecker>) -> Self {
        Self {
            catalog: CatalogService::new(pool.clone()),
            subscriptions: SubscriptionService::new(pool),
            health_checker,
            metrics_handle: None,
        }
    }

    /// Adds metrics handle to the state.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}

/// Creates the main API router with all routes.
///
/// The idempotency interceptor wraps every route and consults its policy
/// table per request; routes without a policy pass straight through.
pub fn create_router(state: AppState, interceptor: IdempotencyInterceptor) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/live", get(handlers::liveness_check))
        // Metrics endpoint
        .route("/metrics", get(handlers::metrics_endpoint))
        // Service catalogue
        .route("/services", get(handlers::list_services))
        .route("/services/:id", get(handlers::get_service))
        // Subscription endpoints
        .route("/subscription/subscribe", post(handlers::subscribe))
        .route("/subscription/unsubscribe", post(handlers::unsubscribe))
        .route(
            "/subscription/subscription-summary",
            get(handlers::subscription_summary),
        )
        .with_state(state)
        .layer(middleware::from_fn_with_state(
            interceptor,
            idempotency_middleware,
        ))
        .layer(middleware::from_fn(handlers::track_http_metrics))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
