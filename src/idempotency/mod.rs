pub mod capture;
pub mod error;
pub mod interceptor;
pub mod key;
pub mod policy;
pub mod record;
pub mod reservation;

pub use capture::{BufferedRequest, CapturedResponse};
pub use error::IdempotencyError;
pub use interceptor::{
    idempotency_middleware, IdempotencyInterceptor, IdempotencyMetrics, InterceptOutcome,
    InterceptorConfig, MetricsSnapshot, IDEMPOTENCY_KEY_HEADER,
};
pub use key::{CompositeKey, IdempotencyKeyComposer, KeyComposerConfig};
pub use policy::{RoutePolicy, RoutePolicyTable};
pub use record::{CacheEntry, IdempotencyRecord};
pub use reservation::{Reservation, ReservationGuard, ReserveOutcome};
