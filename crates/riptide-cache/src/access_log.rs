//! Bounded access-log ring buffers.
//!
//! Two lists — `access_log:denied` and `access_log:recent` — record the
//! last `capacity` entries of their kind as JSON strings. Pushed with
//! `LPUSH` and trimmed with `LTRIM` in the same pipeline so the list never
//! grows past its cap between a push and the next reader's `LRANGE`.

use redis::AsyncCommands;
use riptide_types::error::Result as RiptideResult;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::redis_manager::{convert_error, RedisHandle};

const DENIED_KEY: &str = "access_log:denied";
const RECENT_KEY: &str = "access_log:recent";

/// One logged request outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogEntry {
    /// Unix seconds.
    pub timestamp: u64,
    /// Caller UID, if the request carried one.
    pub uid: Option<String>,
    /// Client IP as seen (canonicalized string form).
    pub ip: String,
    /// Full User-Agent string.
    pub user_agent: String,
    /// Requested path.
    pub path: String,
    /// Outcome: `"allowed"` or the specific denial reason (e.g. `"bad_signature"`,
    /// `"ip_not_whitelisted"`, `"session_mismatch"`).
    pub outcome: String,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Redis-backed ring buffer pair for allowed/denied request logging.
#[derive(Clone)]
pub struct AccessLogStore {
    redis: RedisHandle,
    capacity: usize,
}

impl AccessLogStore {
    /// Build a store retaining at most `capacity` entries per list.
    pub fn new(redis: RedisHandle, capacity: usize) -> Self {
        Self { redis, capacity }
    }

    /// Record a denial.
    pub async fn log_denied(&self, entry: &AccessLogEntry) -> RiptideResult<()> {
        self.push(DENIED_KEY, entry).await
    }

    /// Record an allowed request.
    pub async fn log_recent(&self, entry: &AccessLogEntry) -> RiptideResult<()> {
        self.push(RECENT_KEY, entry).await
    }

    async fn push(&self, key: &str, entry: &AccessLogEntry) -> RiptideResult<()> {
        let json = serde_json::to_string(entry)
            .map_err(|e| riptide_types::RiptideError::SerializationError(e.to_string()))?;
        let mut conn = self.redis.connection();
        let cap = self.capacity.saturating_sub(1) as isize;
        let _: () = redis::pipe()
            .atomic()
            .lpush(key, json)
            .ltrim(key, 0, cap)
            .query_async(&mut conn)
            .await
            .map_err(convert_error)?;
        Ok(())
    }

    /// Most recent `limit` denied entries, newest first.
    pub async fn recent_denied(&self, limit: isize) -> RiptideResult<Vec<AccessLogEntry>> {
        self.read(DENIED_KEY, limit).await
    }

    /// Most recent `limit` allowed entries, newest first.
    pub async fn recent_allowed(&self, limit: isize) -> RiptideResult<Vec<AccessLogEntry>> {
        self.read(RECENT_KEY, limit).await
    }

    async fn read(&self, key: &str, limit: isize) -> RiptideResult<Vec<AccessLogEntry>> {
        let mut conn = self.redis.connection();
        let raw: Vec<String> = conn
            .lrange(key, 0, limit.saturating_sub(1))
            .await
            .map_err(convert_error)?;
        raw.into_iter()
            .map(|json| {
                serde_json::from_str(&json)
                    .map_err(|e| riptide_types::RiptideError::SerializationError(e.to_string()))
            })
            .collect()
    }
}

/// Build an entry stamped with the current time.
pub fn new_entry(
    uid: Option<String>,
    ip: String,
    user_agent: String,
    path: String,
    outcome: impl Into<String>,
) -> AccessLogEntry {
    AccessLogEntry {
        timestamp: now_secs(),
        uid,
        ip,
        user_agent,
        path,
        outcome: outcome.into(),
    }
}
