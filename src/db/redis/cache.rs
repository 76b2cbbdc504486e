use redis::AsyncCommands;
use redis::Client;
use std::time::Duration;

use crate::db::cache::{CacheKey, CacheResult, ResponseCache};

/// Creates a Redis client for caching
///
/// Connections are multiplexed per call, so the client is cheap to share.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Response cache backed by Redis
///
/// Expiry is delegated to Redis via `SET .. EX`, so lookups never see a stale entry.
#[derive(Clone)]
pub struct RedisResponseCache {
    redis_client: Client,
}

impl RedisResponseCache {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }
}

#[async_trait::async_trait]
impl ResponseCache for RedisResponseCache {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<String>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;
        Ok(cached)
    }

    async fn put(&self, key: &CacheKey, value: &str, ttl: Duration) -> CacheResult<()> {
        // Redis rejects EX 0
        let ttl_secs = ttl.as_secs().max(1);
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(key.to_string(), value, ttl_secs).await?;
        tracing::debug!(key = %key, ttl = ttl_secs, "Cached model response in Redis");
        Ok(())
    }
}
