use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::{database::Database, redis_client::RedisClient};

pub mod allocations;
pub mod venues;

/// Read-through cache in front of Postgres. Redis failures are logged and
/// the caller falls back to the database.
#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    db: Database,
    ttl_seconds: u64,
}

impl CacheService {
    pub fn new(redis: RedisClient, db: Database, ttl_seconds: u64) -> Self {
        Self {
            redis,
            db,
            ttl_seconds,
        }
    }

    // Cache warmup on startup
    pub async fn warmup_cache(&self) {
        info!("Starting cache warmup...");

        match self.get_venues().await {
            Ok(venues) => info!("Cache warmup done: {} venues", venues.len()),
            Err(e) => warn!("Cache warmup skipped: {}", e),
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = conn.get(key).await?;
        let Some(data) = data else {
            debug!("Cache miss: {}", key);
            return Ok(None);
        };
        let value = serde_json::from_str(&data).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Parse error"))
        })?;
        Ok(Some(value))
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), redis::RedisError> {
        let data = serde_json::to_string(value).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = self.redis.conn.clone();
        conn.set_ex(key, data, self.ttl_seconds).await
    }

    async fn evict(&self, key: &str) {
        let mut conn = self.redis.conn.clone();
        let result: Result<(), redis::RedisError> = conn.del(key).await;
        if let Err(e) = result {
            warn!("Failed to evict cache key {}: {}", key, e);
        }
    }
}
