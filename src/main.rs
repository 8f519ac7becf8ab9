use std::sync::Arc;
use subscription_api::api::{create_router, AppState};
use subscription_api::cache::{CacheSweeper, CacheStore, InMemoryCacheStore, RedisCacheStore};
use subscription_api::config::{CacheBackend, Settings};
use subscription_api::error::AppError;
use subscription_api::idempotency::{IdempotencyInterceptor, RoutePolicyTable};
use subscription_api::observability::{init_logging, init_metrics, HealthChecker, LogConfig};
use subscription_api::repositories::Database;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let settings = Settings::new()?;

    init_logging(&LogConfig::from_settings(&settings.application));
    info!("Configuration loaded");

    let metrics_handle = init_metrics()?;

    // Idempotency cache backend
    let (store, backend_name): (Arc<dyn CacheStore>, &str) = match settings.cache.backend {
        CacheBackend::Memory => {
            let store = InMemoryCacheStore::new();
            let _sweeper = CacheSweeper::new(store.clone(), settings.cache.sweep_interval_secs).start();
            info!("Using in-memory idempotency cache");
            (Arc::new(store), "memory")
        }
        CacheBackend::Redis => {
            let url = settings.cache.redis_url.clone().ok_or_else(|| {
                AppError::Validation("cache.redis_url is required for the redis backend".to_string())
            })?;
            info!("Connecting to Redis at {}...", url);
            let store = RedisCacheStore::new(redis::Client::open(url)?, &settings.cache.key_prefix);
            store.ping().await?;
            info!("Redis connection established");
            (Arc::new(store), "redis")
        }
    };

    let policies = RoutePolicyTable::from_settings(&settings.idempotency.routes)?;
    info!("Idempotency enabled on {} route(s)", policies.len());
    let interceptor = IdempotencyInterceptor::new(store.clone(), policies, &settings.idempotency);

    let health_checker = Arc::new(HealthChecker::new(store, backend_name));
    let state = AppState::new(Database::seeded(), health_checker).with_metrics(metrics_handle);
    let app = create_router(state, interceptor);

    let addr = format!("{}:{}", settings.application.host, settings.application.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
