use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Global metrics instance.
pub static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Metrics collector for the subscription service.
#[derive(Debug, Clone)]
pub struct Metrics;

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self
    }

    pub fn record_idempotency_outcome(&self, route: &str, outcome: &str) {
        counter!("idempotency_requests_total", "route" => route.to_string(), "outcome" => outcome.to_string()).increment(1);
    }

    pub fn record_idempotency_wait(&self, duration_ms: f64, timed_out: bool) {
        histogram!("idempotency_wait_duration_ms", "timed_out" => timed_out.to_string()).record(duration_ms);
    }

    pub fn record_downstream_latency(&self, route: &str, duration_ms: f64) {
        histogram!("idempotency_downstream_duration_ms", "route" => route.to_string()).record(duration_ms);
    }

    pub fn record_cache_error(&self, operation: &str) {
        counter!("cache_errors_total", "operation" => operation.to_string()).increment(1);
    }

    pub fn record_subscription_created(&self, service_name: &str) {
        counter!("subscriptions_created_total", "service" => service_name.to_string()).increment(1);
    }

    pub fn record_subscription_removed(&self, service_name: &str) {
        counter!("subscriptions_removed_total", "service" => service_name.to_string()).increment(1);
    }

    pub fn record_discount_applied(&self, discount: &str) {
        counter!("subscription_discounts_applied_total", "discount" => discount.to_string()).increment(1);
    }

    pub fn set_active_subscriptions(&self, count: usize) {
        gauge!("subscriptions_active").set(count as f64);
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_ms: f64) {
        counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string(), "status" => status.to_string()).increment(1);
        histogram!("http_request_duration_ms", "method" => method.to_string(), "path" => path.to_string()).record(duration_ms);
    }
}

/// Timer for measuring operation latency.
pub struct LatencyTimer {
    start: Instant,
}

impl LatencyTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for LatencyTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs the Prometheus recorder once and returns its handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();

    METRICS.get_or_init(Metrics::new);
    Ok(METRICS_HANDLE.get_or_init(|| handle).clone())
}

/// Describes all metrics for Prometheus.
fn describe_metrics() {
    describe_counter!("idempotency_requests_total", Unit::Count, "Idempotency-enabled requests by outcome");
    describe_histogram!("idempotency_wait_duration_ms", Unit::Milliseconds, "Time spent waiting on an in-flight execution");
    describe_histogram!("idempotency_downstream_duration_ms", Unit::Milliseconds, "Downstream execution latency on cache misses");

    describe_counter!("cache_errors_total", Unit::Count, "Cache backend operation failures");

    describe_counter!("subscriptions_created_total", Unit::Count, "Total subscriptions created");
    describe_counter!("subscriptions_removed_total", Unit::Count, "Total subscriptions removed");
    describe_counter!("subscription_discounts_applied_total", Unit::Count, "Discounts applied in summaries");
    describe_gauge!("subscriptions_active", Unit::Count, "Number of active subscriptions");

    describe_counter!("http_requests_total", Unit::Count, "Total HTTP requests");
    describe_histogram!("http_request_duration_ms", Unit::Milliseconds, "HTTP request latency in milliseconds");
}

/// Returns the global metrics instance.
pub fn get_metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}
