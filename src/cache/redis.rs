use async_trait::async_trait;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::Duration;

use super::store::{CacheError, CacheStats, CacheStore};
use crate::observability::get_metrics;

const DELETE_IF_EQUALS: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

/// Redis-backed cache store shared by all service instances.
pub struct RedisCacheStore {
    client: redis::Client,
    key_prefix: String,
    delete_if_equals: redis::Script,
    stats: Arc<CacheStats>,
}

impl RedisCacheStore {
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
            delete_if_equals: redis::Script::new(DELETE_IF_EQUALS),
            stats: Arc::new(CacheStats::new()),
        }
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> Arc<CacheStats> {
        self.stats.clone()
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, CacheError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| self.fail("connect", e))
    }

    fn fail(&self, operation: &str, error: redis::RedisError) -> CacheError {
        self.stats.record_error();
        get_metrics().record_cache_error(operation);
        tracing::warn!(operation, "Redis cache error: {}", error);
        CacheError::Redis(error)
    }
}

/// Redis rejects a zero expiry, so sub-millisecond TTLs round up.
fn ttl_millis(ttl: Duration) -> usize {
    ttl.as_millis().clamp(1, usize::MAX as u128) as usize
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.connection().await?;
        let key = self.make_key(key);

        let value: Option<Vec<u8>> = conn.get(&key).await.map_err(|e| self.fail("get", e))?;

        match value {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let key = self.make_key(key);

        let _: () = conn
            .set_options(
                &key,
                value,
                redis::SetOptions::default().with_expiration(redis::SetExpiry::PX(ttl_millis(ttl))),
            )
            .await
            .map_err(|e| self.fail("set", e))?;

        self.stats.record_write();
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        let key = self.make_key(key);

        let result: Option<String> = conn
            .set_options(
                &key,
                value,
                redis::SetOptions::default()
                    .conditional_set(redis::ExistenceCheck::NX)
                    .with_expiration(redis::SetExpiry::PX(ttl_millis(ttl))),
            )
            .await
            .map_err(|e| self.fail("set_nx", e))?;

        if result.is_some() {
            self.stats.record_write();
        }
        Ok(result.is_some())
    }

    async fn delete_if_equals(&self, key: &str, expected: &[u8]) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        let key = self.make_key(key);

        let deleted: i64 = self
            .delete_if_equals
            .key(&key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| self.fail("delete_if_equals", e))?;

        Ok(deleted > 0)
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        let key = self.make_key(key);

        let deleted: i64 = conn.del(&key).await.map_err(|e| self.fail("del", e))?;

        Ok(deleted > 0)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| self.fail("ping", e))?;
        Ok(())
    }
}
