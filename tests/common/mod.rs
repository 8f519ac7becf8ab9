#![allow(dead_code)]

use axum::{
    body::{Body, Bytes},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower::ServiceExt;

use subscription_api::api::{create_router, AppState};
use subscription_api::cache::InMemoryCacheStore;
use subscription_api::config::IdempotencySettings;
use subscription_api::idempotency::{IdempotencyInterceptor, RoutePolicyTable, IDEMPOTENCY_KEY_HEADER};
use subscription_api::observability::HealthChecker;
use subscription_api::repositories::Database;

pub const PHONE: &str = "+15551234567";

pub struct TestApp {
    pub router: Router,
    pub store: InMemoryCacheStore,
    pub db: Database,
    pub interceptor: IdempotencyInterceptor,
}

/// Full application router over a seeded database and an in-memory cache.
pub fn test_app() -> TestApp {
    let settings = IdempotencySettings::default();
    let store = InMemoryCacheStore::new();
    let db = Database::seeded();

    let policies = RoutePolicyTable::from_settings(&settings.routes).expect("default routes are valid");
    let interceptor = IdempotencyInterceptor::new(Arc::new(store.clone()), policies, &settings);

    let health_checker = Arc::new(HealthChecker::new(Arc::new(store.clone()), "memory"));
    let handle = PrometheusBuilder::new().build_recorder().handle();
    let state = AppState::new(db.clone(), health_checker).with_metrics(handle);

    TestApp {
        router: create_router(state, interceptor.clone()),
        store,
        db,
        interceptor,
    }
}

pub fn post_json(uri: &str, key: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(key) = key {
        builder = builder.header(IDEMPOTENCY_KEY_HEADER, key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn read_body(response: Response) -> (StatusCode, Bytes) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes)
}

pub async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let (status, bytes) = read_body(send(router, request).await).await;
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

pub fn subscribe_body(service_id: i32, duration_months: i32) -> String {
    format!(
        r#"{{"customerPhoneNumber":"{}","serviceId":{},"durationMonths":{}}}"#,
        PHONE, service_id, duration_months
    )
}
