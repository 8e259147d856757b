//! Shared key-value cache with TTL support.
//!
//! Redis gives per-key strong read-after-write consistency, which is what
//! the revocation store relies on: a revoke is visible to the very next
//! validity check, including one from a concurrent request.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};

#[async_trait]
pub trait SharedCache: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<(), anyhow::Error>;
    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error>;
    /// Remove a key, reporting whether it existed. The removal is atomic:
    /// of two concurrent deletes of the same key, exactly one sees `true`.
    async fn delete(&self, key: &str) -> Result<bool, anyhow::Error>;
    /// Atomic counter increment; the key is created at 1 if absent.
    async fn incr(&self, key: &str) -> Result<i64, anyhow::Error>;
    async fn health_check(&self) -> Result<(), anyhow::Error>;
}

#[derive(Clone)]
pub struct RedisCache {
    _client: Client,
    manager: ConnectionManager,
}

impl RedisCache {
    pub async fn new(config: &crate::config::RedisConfig) -> Result<Self, anyhow::Error> {
        tracing::info!(url = %config.url, "Connecting to Redis");
        let client = Client::open(config.url.clone())?;

        // Use ConnectionManager for automatic reconnection
        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!("Failed to get Redis connection manager: {}", e);
            anyhow::anyhow!("Failed to connect to Redis: {}", e)
        })?;

        tracing::info!("Successfully connected to Redis");

        Ok(Self {
            _client: client,
            manager,
        })
    }
}

#[async_trait]
impl SharedCache for RedisCache {
    async fn set(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to set cache key: {}", e))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get cache key: {}", e))
    }

    async fn delete(&self, key: &str) -> Result<bool, anyhow::Error> {
        let mut conn = self.manager.clone();
        let removed: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to delete cache key: {}", e))?;
        Ok(removed > 0)
    }

    async fn incr(&self, key: &str) -> Result<i64, anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("INCR")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to increment counter: {}", e))
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Redis health check failed: {}", e))
    }
}

/// Mutex-backed cache honoring TTLs against a monotonic clock. Used by
/// tests and embeddings that run without Redis.
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, (String, Option<Instant>)>>,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn live_value(entry: Option<&(String, Option<Instant>)>) -> Option<String> {
        match entry {
            Some((_, Some(deadline))) if *deadline <= Instant::now() => None,
            Some((value, _)) => Some(value.clone()),
            None => None,
        }
    }
}

#[async_trait]
impl SharedCache for InMemoryCache {
    async fn set(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<(), anyhow::Error> {
        let deadline = u64::try_from(ttl_seconds)
            .ok()
            .map(|secs| Instant::now() + Duration::from_secs(secs));
        self.entries
            .lock()
            .map_err(|e| anyhow::anyhow!("Cache mutex poisoned: {}", e))?
            .insert(key.to_string(), (value.to_string(), deadline));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| anyhow::anyhow!("Cache mutex poisoned: {}", e))?;
        Ok(Self::live_value(entries.get(key)))
    }

    async fn delete(&self, key: &str) -> Result<bool, anyhow::Error> {
        let removed = self
            .entries
            .lock()
            .map_err(|e| anyhow::anyhow!("Cache mutex poisoned: {}", e))?
            .remove(key);
        // An expired entry reads as already absent.
        Ok(Self::live_value(removed.as_ref()).is_some())
    }

    async fn incr(&self, key: &str) -> Result<i64, anyhow::Error> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| anyhow::anyhow!("Cache mutex poisoned: {}", e))?;
        let current = Self::live_value(entries.get(key))
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);
        let next = current + 1;
        // Counters never expire.
        entries.insert(key.to_string(), (next.to_string(), None));
        Ok(next)
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}
