//! Redis-backed key-value store
//!
//! - `SET key value NX PX ttl` for atomic lock creation
//! - `GET` to read the current holder
//! - `PEXPIRE` to extend the lease
//! - `DEL` to release it

use std::time::Duration;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::debug;

use crate::error::{ElectorError, Result};
use crate::store::{ttl_millis, KeyValueStore};

/// [`KeyValueStore`] over a shared Redis connection
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to the Redis server at `redis_url`
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| ElectorError::Connection(e.to_string()))?;

        let conn = ConnectionManager::new(client).await?;
        debug!(redis_url = %redis_url, "Connected to Redis");

        Ok(Self { conn })
    }

    /// Wrap an existing connection manager
    pub fn from_connection(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn create_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();

        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;

        Ok(result.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();

        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await?;

        Ok(value)
    }

    async fn extend_expiry(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();

        // 0 when the key is already gone; nothing to extend
        let _: i64 = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();

        let _: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await?;

        Ok(())
    }
}
