use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, Request, State,
    },
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use validator::Validate;

use crate::api::requests::{validation_details, SubscribeRequest, SummaryQuery, UnsubscribeRequest};
use crate::api::responses::HealthResponse;
use crate::error::{AppError, Result};
use crate::models::{Service, Subscription, SubscriptionSummary};
use crate::observability::{get_metrics, LatencyTimer};

use super::routes::AppState;

fn validated<T: Validate>(value: T) -> Result<T> {
    value
        .validate()
        .map_err(|errors| AppError::ValidationFailed(validation_details(&errors)))?;
    Ok(value)
}

fn json_body<T: Validate>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    let Json(value) = payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    validated(value)
}

/// Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::from(state.health_checker.check_all().await))
}

/// Readiness check endpoint.
pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    if state.health_checker.is_ready().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Liveness check endpoint.
pub async fn liveness_check(State(state): State<AppState>) -> StatusCode {
    if state.health_checker.is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Prometheus scrape endpoint.
pub async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => (
            StatusCode::OK,
            [(http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

// ============================================================================
// Service catalogue
// ============================================================================

pub async fn list_services(State(state): State<AppState>) -> Result<Json<Vec<Service>>> {
    Ok(Json(state.catalog.list_services().await?))
}

pub async fn get_service(
    State(state): State<AppState>,
    id: std::result::Result<Path<i32>, PathRejection>,
) -> Result<Json<Service>> {
    let Path(id) = id.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    Ok(Json(state.catalog.get_service(id).await?))
}

// ============================================================================
// Subscriptions
// ============================================================================

pub async fn subscribe(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SubscribeRequest>, JsonRejection>,
) -> Result<Json<Subscription>> {
    let request = json_body(payload)?;

    let subscription = state
        .subscriptions
        .subscribe(
            &request.customer_phone_number,
            request.service_id,
            request.duration_months,
        )
        .await?;

    Ok(Json(subscription))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    payload: std::result::Result<Json<UnsubscribeRequest>, JsonRejection>,
) -> Result<StatusCode> {
    let request = json_body(payload)?;

    state
        .subscriptions
        .unsubscribe(&request.customer_phone_number, request.service_id)
        .await?;

    Ok(StatusCode::OK)
}

pub async fn subscription_summary(
    State(state): State<AppState>,
    query: std::result::Result<Query<SummaryQuery>, QueryRejection>,
) -> Result<Json<SubscriptionSummary>> {
    let Query(query) = query.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let query = validated(query)?;

    Ok(Json(
        state
            .subscriptions
            .summary(&query.customer_phone_number)
            .await?,
    ))
}

/// Records request counts and latency for every route.
pub async fn track_http_metrics(request: Request, next: Next) -> Response {
    let timer = LatencyTimer::new();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    get_metrics().record_http_request(&method, &path, response.status().as_u16(), timer.elapsed_ms());
    response
}
