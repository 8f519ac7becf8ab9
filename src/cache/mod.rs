pub mod memory;
pub mod redis;
pub mod store;

pub use memory::{CacheSweeper, InMemoryCacheStore};
pub use self::redis::RedisCacheStore;
pub use store::{CacheError, CacheStats, CacheStore};
