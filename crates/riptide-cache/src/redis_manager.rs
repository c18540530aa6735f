//! Shared Redis connection handle.
//!
//! A single multiplexed connection is cheap to clone and safe to share
//! across every store in this crate (sessions, whitelist, m3u8 counter,
//! access logs).

use redis::aio::MultiplexedConnection;
use redis::{Client, RedisResult};
use riptide_types::error::{Result as RiptideResult, RiptideError};
use tracing::debug;

/// Shared handle over one multiplexed Redis connection.
#[derive(Clone)]
pub struct RedisHandle {
    conn: MultiplexedConnection,
    client: Client,
}

impl RedisHandle {
    /// Connect to Redis at `redis_url`.
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = Client::open(redis_url)?;
        let conn = client.get_multiplexed_tokio_connection().await?;
        Ok(Self { conn, client })
    }

    /// Build a handle from an already-open client (used by health checks, tests).
    pub async fn from_client(client: Client) -> anyhow::Result<Self> {
        let conn = client.get_multiplexed_tokio_connection().await?;
        Ok(Self { conn, client })
    }

    /// A clone of the multiplexed connection, ready for a single command or script.
    pub fn connection(&self) -> MultiplexedConnection {
        self.conn.clone()
    }

    /// PING the server; used by the `/health` endpoint.
    pub async fn ping(&self) -> RiptideResult<bool> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(convert_error)?;
        Ok(pong == "PONG")
    }

    /// Underlying client, kept around for reconnection/diagnostics.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Translate a `redis::RedisError` into the crate-wide error type.
pub fn convert_error(err: redis::RedisError) -> RiptideError {
    debug!(error = %err, "redis command failed");
    RiptideError::Cache(format!("redis error: {err}"))
}

/// Helper for converting a raw `RedisResult` at call sites that don't
/// already have `map_err(convert_error)` in scope.
pub fn into_riptide<T>(result: RedisResult<T>) -> RiptideResult<T> {
    result.map_err(convert_error)
}
