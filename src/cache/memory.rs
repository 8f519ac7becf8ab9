use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use super::store::{CacheError, CacheStats, CacheStore};

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Process-local cache store.
///
/// Every operation runs under a single mutex acquisition, which is what makes
/// `set_if_absent` and `delete_if_equals` atomic. Expired entries are dropped
/// lazily on access and in bulk by [`CacheSweeper`].
#[derive(Clone, Default)]
pub struct InMemoryCacheStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    stats: Arc<CacheStats>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> Arc<CacheStats> {
        self.stats.clone()
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        Ok(before - entries.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, CacheError> {
        self.entries.lock().map_err(|_| {
            self.stats.record_error();
            CacheError::Unavailable("in-memory cache lock poisoned".to_string())
        })
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        let mut entries = self.lock()?;

        match entries.get(key) {
            Some(entry) if entry.is_live(now) => {
                self.stats.record_hit();
                Ok(Some(entry.value.clone()))
            }
            Some(_) => {
                entries.remove(key);
                self.stats.record_miss();
                Ok(None)
            }
            None => {
                self.stats.record_miss();
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Instant::now() + ttl;
        let mut entries = self.lock()?;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at,
            },
        );
        self.stats.record_write();
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        let now = Instant::now();
        let mut entries = self.lock()?;

        if entries.get(key).is_some_and(|entry| entry.is_live(now)) {
            return Ok(false);
        }

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: now + ttl,
            },
        );
        self.stats.record_write();
        Ok(true)
    }

    async fn delete_if_equals(&self, key: &str, expected: &[u8]) -> Result<bool, CacheError> {
        let now = Instant::now();
        let mut entries = self.lock()?;

        let matches = entries
            .get(key)
            .is_some_and(|entry| entry.is_live(now) && entry.value == expected);

        if matches {
            entries.remove(key);
        }
        Ok(matches)
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut entries = self.lock()?;
        Ok(entries.remove(key).is_some())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.lock().map(|_| ())
    }
}

/// Background job that periodically drops expired in-memory entries.
pub struct CacheSweeper {
    store: InMemoryCacheStore,
    interval_seconds: u64,
}

impl CacheSweeper {
    pub fn new(store: InMemoryCacheStore, interval_seconds: u64) -> Self {
        Self {
            store,
            interval_seconds,
        }
    }

    /// Runs the sweep once.
    pub fn run_once(&self) -> Result<usize, CacheError> {
        self.store.purge_expired()
    }

    /// Starts the sweeper in a background task.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(self.interval_seconds.max(1)));

            loop {
                interval.tick().await;

                match self.run_once() {
                    Ok(count) => {
                        if count > 0 {
                            tracing::debug!(count, "Swept expired cache entries");
                        }
                    }
                    Err(e) => {
                        tracing::error!("Failed to sweep expired cache entries: {}", e);
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = InMemoryCacheStore::new();
        store.set("k", b"value", Duration::from_secs(30)).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some(b"value".to_vec()));
        assert_eq!(store.get("missing").await.unwrap(), None);
        assert_eq!(store.stats().get_hits(), 1);
        assert_eq!(store.stats().get_misses(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let store = InMemoryCacheStore::new();
        store.set("k", b"value", Duration::from_secs(30)).await.unwrap();

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(store.get("k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_if_absent_only_writes_once() {
        let store = InMemoryCacheStore::new();
        let ttl = Duration::from_secs(30);

        assert!(store.set_if_absent("k", b"first", ttl).await.unwrap());
        assert!(!store.set_if_absent("k", b"second", ttl).await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some(b"first".to_vec()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_if_absent_replaces_expired_entry() {
        let store = InMemoryCacheStore::new();

        assert!(store
            .set_if_absent("k", b"first", Duration::from_millis(100))
            .await
            .unwrap());
        tokio::time::advance(Duration::from_millis(150)).await;
        assert!(store
            .set_if_absent("k", b"second", Duration::from_secs(1))
            .await
            .unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some(b"second".to_vec()));
    }

    #[tokio::test]
    async fn test_delete_if_equals() {
        let store = InMemoryCacheStore::new();
        store.set("k", b"owner-a", Duration::from_secs(30)).await.unwrap();

        assert!(!store.delete_if_equals("k", b"owner-b").await.unwrap());
        assert!(store.get("k").await.unwrap().is_some());

        assert!(store.delete_if_equals("k", b"owner-a").await.unwrap());
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_expired_entries() {
        let store = InMemoryCacheStore::new();
        store.set("short", b"1", Duration::from_secs(1)).await.unwrap();
        store.set("long", b"2", Duration::from_secs(60)).await.unwrap();

        tokio::time::advance(Duration::from_secs(5)).await;

        let sweeper = CacheSweeper::new(store.clone(), 60);
        assert_eq!(sweeper.run_once().unwrap(), 1);
        assert_eq!(store.len(), 1);
    }
}
