use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::error::IdempotencyError;
use super::key::CompositeKey;
use super::record::{CacheEntry, IdempotencyRecord};
use crate::cache::CacheStore;

/// Upper bound on conditional-put attempts when the competing entry keeps
/// vanishing between the put and the follow-up read.
const MAX_RESERVE_ATTEMPTS: usize = 3;

/// Result of [`ReservationGuard::try_reserve`].
#[derive(Debug)]
pub enum ReserveOutcome {
    /// The caller owns the lease and must run the execution.
    Acquired(Reservation),
    /// Another execution holds a live lease for the key.
    AlreadyInFlight,
    /// A completed record exists and should be replayed.
    AlreadyCompleted(IdempotencyRecord),
}

/// Per-key mutual exclusion on top of the shared cache store.
///
/// The lease marker lives under the composite key itself, so a single
/// conditional put both checks for a completed record and claims the key.
#[derive(Clone)]
pub struct ReservationGuard {
    store: Arc<dyn CacheStore>,
}

impl ReservationGuard {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub async fn try_reserve(
        &self,
        key: &CompositeKey,
        lease: Duration,
    ) -> Result<ReserveOutcome, IdempotencyError> {
        let owner = Uuid::new_v4().to_string();
        let marker = CacheEntry::InFlight {
            owner: owner.clone(),
        }
        .encode()?;

        for _ in 0..MAX_RESERVE_ATTEMPTS {
            if self.store.set_if_absent(key.as_str(), &marker, lease).await? {
                tracing::debug!(key = %key, owner = %owner, "Reservation acquired");
                return Ok(ReserveOutcome::Acquired(Reservation {
                    key: key.clone(),
                    marker: marker.clone(),
                    guard: Some(self.clone()),
                }));
            }

            let Some(existing) = self.store.get(key.as_str()).await? else {
                // Released or expired between the put and the read.
                continue;
            };

            match CacheEntry::decode(&existing) {
                Ok(CacheEntry::Completed { record }) => {
                    return Ok(ReserveOutcome::AlreadyCompleted(record));
                }
                Ok(CacheEntry::InFlight { .. }) => return Ok(ReserveOutcome::AlreadyInFlight),
                Err(e) => {
                    tracing::warn!(key = %key, "Discarding undecodable cache entry: {}", e);
                    // Only the bytes read above; a racer may already own the key.
                    self.store.delete_if_equals(key.as_str(), &existing).await?;
                }
            }
        }

        Ok(ReserveOutcome::AlreadyInFlight)
    }

    async fn release_marker(&self, key: &CompositeKey, marker: &[u8]) {
        match self.store.delete_if_equals(key.as_str(), marker).await {
            Ok(true) => tracing::debug!(key = %key, "Reservation released"),
            Ok(false) => tracing::debug!(key = %key, "Reservation already expired or replaced"),
            Err(e) => tracing::warn!(key = %key, "Failed to release reservation: {}", e),
        }
    }
}

/// Lease on a composite key held by the executing request.
///
/// Settled exactly once, through [`Reservation::commit`] or
/// [`Reservation::release`]. An unsettled reservation dropped during a panic
/// or cancellation releases itself in a background task.
pub struct Reservation {
    key: CompositeKey,
    marker: Vec<u8>,
    guard: Option<ReservationGuard>,
}

impl std::fmt::Debug for Reservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reservation")
            .field("key", &self.key)
            .field("settled", &self.guard.is_none())
            .finish()
    }
}

impl Reservation {
    /// Replaces the lease marker with the completed record.
    pub async fn commit(
        mut self,
        record: IdempotencyRecord,
        ttl: Duration,
    ) -> Result<(), IdempotencyError> {
        let Some(guard) = self.guard.take() else {
            return Ok(());
        };

        let encoded = CacheEntry::Completed { record }.encode();
        let written = match encoded {
            Ok(bytes) => guard
                .store
                .set(self.key.as_str(), &bytes, ttl)
                .await
                .map_err(IdempotencyError::from),
            Err(e) => Err(IdempotencyError::from(e)),
        };

        if written.is_err() {
            // Leave the key retryable rather than locked until the lease runs out.
            guard.release_marker(&self.key, &self.marker).await;
        }
        written
    }

    /// Removes the lease marker without persisting anything.
    pub async fn release(mut self) {
        if let Some(guard) = self.guard.take() {
            guard.release_marker(&self.key, &self.marker).await;
        }
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        let Some(guard) = self.guard.take() else {
            return;
        };
        let key = std::mem::replace(&mut self.key, CompositeKey::default());
        let marker = std::mem::take(&mut self.marker);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    guard.release_marker(&key, &marker).await;
                });
            }
            Err(_) => {
                tracing::warn!(key = %key, "Reservation dropped outside a runtime; lease will expire");
            }
        }
    }
}
