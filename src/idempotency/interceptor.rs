use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::capture::{replay, BufferedRequest, CapturedResponse};
use super::error::{IdempotencyError, INTERNAL_FAULT_MESSAGE};
use super::key::{CompositeKey, IdempotencyKeyComposer, KeyComposerConfig};
use super::policy::{RoutePolicy, RoutePolicyTable};
use super::record::IdempotencyRecord;
use super::reservation::{Reservation, ReservationGuard, ReserveOutcome};
use crate::cache::CacheStore;
use crate::config::IdempotencySettings;
use crate::observability::{get_metrics, mask_sensitive, LatencyTimer};

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// How a request left the interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptOutcome {
    /// The route has no idempotency policy.
    PassThrough,
    RejectMissingKey,
    /// Any other malformed key or body.
    Rejected,
    /// A completed record was written back without invoking the handler.
    ReplayHit,
    /// This request owns the lease and runs the handler.
    ExecuteMiss,
    PersistAndForward,
    ForwardWithoutPersist,
    /// Another execution held the key past the wait timeout.
    WaitTimeout,
    /// The cache backend failed; the handler ran without protection.
    Degraded,
}

impl InterceptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterceptOutcome::PassThrough => "pass_through",
            InterceptOutcome::RejectMissingKey => "reject_missing_key",
            InterceptOutcome::Rejected => "rejected",
            InterceptOutcome::ReplayHit => "replay_hit",
            InterceptOutcome::ExecuteMiss => "execute_miss",
            InterceptOutcome::PersistAndForward => "persist_and_forward",
            InterceptOutcome::ForwardWithoutPersist => "forward_without_persist",
            InterceptOutcome::WaitTimeout => "wait_timeout",
            InterceptOutcome::Degraded => "degraded",
        }
    }
}

/// In-process counters for idempotency handling.
#[derive(Debug, Default)]
pub struct IdempotencyMetrics {
    pub total_requests: AtomicU64,
    pub replay_hits: AtomicU64,
    pub executions: AtomicU64,
    pub persisted: AtomicU64,
    pub not_persisted: AtomicU64,
    pub rejected: AtomicU64,
    pub wait_timeouts: AtomicU64,
    pub degraded: AtomicU64,
}

impl IdempotencyMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: InterceptOutcome) {
        let counter = match outcome {
            InterceptOutcome::PassThrough => return,
            InterceptOutcome::RejectMissingKey | InterceptOutcome::Rejected => &self.rejected,
            InterceptOutcome::ReplayHit => &self.replay_hits,
            InterceptOutcome::ExecuteMiss => &self.executions,
            InterceptOutcome::PersistAndForward => &self.persisted,
            InterceptOutcome::ForwardWithoutPersist => &self.not_persisted,
            InterceptOutcome::WaitTimeout => &self.wait_timeouts,
            InterceptOutcome::Degraded => &self.degraded,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            replay_hits: self.replay_hits.load(Ordering::Relaxed),
            executions: self.executions.load(Ordering::Relaxed),
            persisted: self.persisted.load(Ordering::Relaxed),
            not_persisted: self.not_persisted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            wait_timeouts: self.wait_timeouts.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub replay_hits: u64,
    pub executions: u64,
    pub persisted: u64,
    pub not_persisted: u64,
    pub rejected: u64,
    pub wait_timeouts: u64,
    pub degraded: u64,
}

impl MetricsSnapshot {
    pub fn replay_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.replay_hits as f64 / self.total_requests as f64
        }
    }
}

/// Timing and size limits of the interceptor.
#[derive(Debug, Clone)]
pub struct InterceptorConfig {
    /// Lifetime of an in-flight marker.
    pub lease: Duration,
    /// How long a duplicate waits on an in-flight execution before 409.
    pub wait_timeout: Duration,
    pub poll_interval: Duration,
    pub max_body_bytes: usize,
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self::from_settings(&IdempotencySettings::default())
    }
}

impl InterceptorConfig {
    pub fn from_settings(settings: &IdempotencySettings) -> Self {
        Self {
            lease: Duration::from_millis(settings.lease_ms),
            wait_timeout: Duration::from_millis(settings.wait_timeout_ms),
            poll_interval: Duration::from_millis(settings.poll_interval_ms.max(1)),
            max_body_bytes: settings.max_body_bytes,
        }
    }
}

enum Acquisition {
    Owner(Reservation),
    Replay(IdempotencyRecord),
}

enum Settled {
    Forwarded { response: CapturedResponse, persisted: bool },
    CaptureFailed,
}

/// Enforces at-most-once execution for routes with a [`RoutePolicy`].
#[derive(Clone)]
pub struct IdempotencyInterceptor {
    policies: Arc<RoutePolicyTable>,
    composer: IdempotencyKeyComposer,
    guard: ReservationGuard,
    config: InterceptorConfig,
    metrics: Arc<IdempotencyMetrics>,
}

impl IdempotencyInterceptor {
    pub fn new(
        store: Arc<dyn CacheStore>,
        policies: RoutePolicyTable,
        settings: &IdempotencySettings,
    ) -> Self {
        let composer = IdempotencyKeyComposer::new(KeyComposerConfig {
            key_prefix: settings.key_prefix.clone(),
            max_key_length: settings.max_key_length,
        });
        Self::with_config(
            store,
            policies,
            composer,
            InterceptorConfig::from_settings(settings),
        )
    }

    pub fn with_config(
        store: Arc<dyn CacheStore>,
        policies: RoutePolicyTable,
        composer: IdempotencyKeyComposer,
        config: InterceptorConfig,
    ) -> Self {
        Self {
            policies: Arc::new(policies),
            composer,
            guard: ReservationGuard::new(store),
            config,
            metrics: Arc::new(IdempotencyMetrics::new()),
        }
    }

    pub fn metrics(&self) -> Arc<IdempotencyMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Runs `downstream` for `request` under the route's idempotency policy.
    ///
    /// On a miss the downstream call, capture and cache write run in their
    /// own task, so dropping the returned future abandons only the wait for
    /// the response.
    pub async fn handle<F, Fut>(&self, request: Request, downstream: F) -> Response
    where
        F: FnOnce(Request) -> Fut + Send + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let Some(policy) = self
            .policies
            .lookup(request.method(), request.uri().path())
            .cloned()
        else {
            return downstream(request).await;
        };
        self.metrics.record_request();

        let client_key = match self.client_key(request.headers()) {
            Ok(key) => key,
            Err(e) => return self.reject(&policy, e),
        };

        let buffered =
            match BufferedRequest::from_request(request, self.config.max_body_bytes).await {
                Ok(buffered) => buffered,
                Err(e) => return self.reject(&policy, e),
            };

        let key = match self
            .composer
            .compose(buffered.path(), &client_key, buffered.body())
        {
            Ok(key) => key,
            Err(e) => return self.reject(&policy, e),
        };

        let masked_key = mask_sensitive(&client_key, 2);
        let reservation = match self.acquire(&key).await {
            Ok(Acquisition::Owner(reservation)) => reservation,
            Ok(Acquisition::Replay(record)) => {
                tracing::info!(route = %policy.route, key = %masked_key, "Replaying stored response");
                self.observe(&policy, InterceptOutcome::ReplayHit);
                return replay(record);
            }
            Err(e) if e.is_backend_fault() => {
                tracing::warn!(
                    route = %policy.route,
                    key = %masked_key,
                    "Idempotency cache unavailable, executing without protection: {}",
                    e
                );
                self.observe(&policy, InterceptOutcome::Degraded);
                return downstream(buffered.into_request()).await;
            }
            Err(e) => return self.reject(&policy, e),
        };

        tracing::debug!(route = %policy.route, key = %masked_key, "Executing idempotent request");
        self.observe(&policy, InterceptOutcome::ExecuteMiss);

        let route = policy.route.clone();
        let task = tokio::spawn(execute(policy.clone(), reservation, buffered, downstream));

        match task.await {
            Ok(Settled::Forwarded {
                response,
                persisted: true,
            }) => {
                self.observe(&policy, InterceptOutcome::PersistAndForward);
                response.into_response()
            }
            Ok(Settled::Forwarded {
                response,
                persisted: false,
            }) => {
                self.observe(&policy, InterceptOutcome::ForwardWithoutPersist);
                response.into_response()
            }
            Ok(Settled::CaptureFailed) => {
                self.observe(&policy, InterceptOutcome::ForwardWithoutPersist);
                internal_fault()
            }
            Err(e) => {
                tracing::error!(route = %route, key = %masked_key, "Idempotent handler failed: {}", e);
                self.observe(&policy, InterceptOutcome::ForwardWithoutPersist);
                internal_fault()
            }
        }
    }

    fn client_key(&self, headers: &HeaderMap) -> Result<String, IdempotencyError> {
        let value = headers
            .get(IDEMPOTENCY_KEY_HEADER)
            .ok_or(IdempotencyError::MissingKey)?;
        let raw = value.to_str().map_err(|_| {
            IdempotencyError::InvalidKey("header value must be visible ASCII".to_string())
        })?;
        self.composer.validate_client_key(raw)
    }

    /// Tries to take the lease, polling while another execution holds it.
    async fn acquire(&self, key: &CompositeKey) -> Result<Acquisition, IdempotencyError> {
        let timer = LatencyTimer::new();
        let deadline = tokio::time::Instant::now() + self.config.wait_timeout;
        let mut waited = false;

        loop {
            match self.guard.try_reserve(key, self.config.lease).await? {
                ReserveOutcome::Acquired(reservation) => {
                    if waited {
                        get_metrics().record_idempotency_wait(timer.elapsed_ms(), false);
                    }
                    return Ok(Acquisition::Owner(reservation));
                }
                ReserveOutcome::AlreadyCompleted(record) => {
                    if waited {
                        get_metrics().record_idempotency_wait(timer.elapsed_ms(), false);
                    }
                    return Ok(Acquisition::Replay(record));
                }
                ReserveOutcome::AlreadyInFlight => {
                    waited = true;
                    let now = tokio::time::Instant::now();
                    if now >= deadline {
                        get_metrics().record_idempotency_wait(timer.elapsed_ms(), true);
                        return Err(IdempotencyError::ReservationTimeout);
                    }
                    tokio::time::sleep(self.config.poll_interval.min(deadline - now)).await;
                }
            }
        }
    }

    fn reject(&self, policy: &RoutePolicy, error: IdempotencyError) -> Response {
        let outcome = match error {
            IdempotencyError::MissingKey => InterceptOutcome::RejectMissingKey,
            IdempotencyError::ReservationTimeout => InterceptOutcome::WaitTimeout,
            _ => InterceptOutcome::Rejected,
        };
        tracing::debug!(route = %policy.route, outcome = outcome.as_str(), "Rejecting request: {}", error);
        self.observe(policy, outcome);
        error.into_response()
    }

    fn observe(&self, policy: &RoutePolicy, outcome: InterceptOutcome) {
        self.metrics.record(outcome);
        get_metrics().record_idempotency_outcome(&policy.route, outcome.as_str());
    }
}

/// Owner path: run the handler, capture its response and settle the lease.
async fn execute<F, Fut>(
    policy: RoutePolicy,
    reservation: Reservation,
    buffered: BufferedRequest,
    downstream: F,
) -> Settled
where
    F: FnOnce(Request) -> Fut,
    Fut: Future<Output = Response>,
{
    let timer = LatencyTimer::new();
    let response = downstream(buffered.into_request()).await;
    get_metrics().record_downstream_latency(&policy.route, timer.elapsed_ms());

    let response = match CapturedResponse::capture(response).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(route = %policy.route, "Failed to capture response: {}", e);
            reservation.release().await;
            return Settled::CaptureFailed;
        }
    };

    if response.status() != policy.success_status {
        tracing::debug!(
            route = %policy.route,
            status = response.status().as_u16(),
            "Response not persisted"
        );
        reservation.release().await;
        return Settled::Forwarded {
            response,
            persisted: false,
        };
    }

    let persisted = match reservation.commit(response.to_record(), policy.ttl).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(route = %policy.route, "Failed to persist idempotency record: {}", e);
            false
        }
    };

    Settled::Forwarded {
        response,
        persisted,
    }
}

fn internal_fault() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": INTERNAL_FAULT_MESSAGE })),
    )
        .into_response()
}

/// Axum adapter for [`IdempotencyInterceptor`].
pub async fn idempotency_middleware(
    State(interceptor): State<IdempotencyInterceptor>,
    request: Request,
    next: Next,
) -> Response {
    interceptor.handle(request, move |req| next.run(req)).await
}
