//! Adaptive m3u8 access counter.
//!
//! Each `(uid, playlist path)` pair is throttled against a fixed-size window:
//! the first request in a window opens it with a TTL, every subsequent
//! request increments the counter, and once the counter exceeds the allowed
//! maximum for the caller's browser class further requests are rejected
//! until the window expires. The increment-and-compare has to happen in one
//! Redis round trip or two concurrent requests near the boundary could both
//! read "one under the limit" and both be let through — the same hazard the
//! whitelist upsert in [`crate::whitelist`] guards against.

use riptide_types::error::Result as RiptideResult;
use std::time::Duration;
use tracing::trace;

use crate::hashing::sha256_hex_prefix;
use crate::redis_manager::{convert_error, RedisHandle};

/// Outcome of recording one m3u8 access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDecision {
    /// Whether this access is allowed to proceed.
    pub allowed: bool,
    /// Count within the current window, including this access attempt.
    pub count: u64,
    /// Window size this decision was evaluated against.
    pub window: Duration,
    /// Max allowed within the window this decision was evaluated against.
    pub max: u64,
}

/// Redis-backed adaptive counter.
#[derive(Clone)]
pub struct M3u8AccessCounter {
    redis: RedisHandle,
}

fn path_hash(path: &str) -> String {
    sha256_hex_prefix(path, 16)
}

fn counter_key(uid: &str, path: &str) -> String {
    format!("m3u8_access:{uid}:{}", path_hash(path))
}

impl M3u8AccessCounter {
    /// Build a counter over `redis`.
    pub fn new(redis: RedisHandle) -> Self {
        Self { redis }
    }

    /// Record an access for `(uid, path)` against `window`/`max`, which the
    /// caller has already selected for the request's browser class (desktop
    /// browsers get a longer window and higher ceiling than bare players).
    pub async fn record(
        &self,
        uid: &str,
        path: &str,
        window: Duration,
        max: u64,
    ) -> RiptideResult<AccessDecision> {
        let mut conn = self.redis.connection();
        let script = redis::Script::new(INCR_SCRIPT);
        let count: u64 = script
            .key(counter_key(uid, path))
            .arg(window.as_secs())
            .invoke_async(&mut conn)
            .await
            .map_err(convert_error)?;

        let allowed = count <= max;
        trace!(uid, path, count, max, allowed, "m3u8 access recorded");
        Ok(AccessDecision {
            allowed,
            count,
            window,
            max,
        })
    }

    /// Current count for `(uid, path)` without incrementing, or 0 if the
    /// window hasn't been opened yet.
    pub async fn peek(&self, uid: &str, path: &str) -> RiptideResult<u64> {
        let mut conn = self.redis.connection();
        let count: Option<u64> = redis::AsyncCommands::get(&mut conn, counter_key(uid, path))
            .await
            .map_err(convert_error)?;
        Ok(count.unwrap_or(0))
    }
}

/// Atomic open-or-increment: `INCR` the counter, and if this increment just
/// created the key (old value was 0), apply the window TTL. Keeping the TTL
/// fixed on creation rather than refreshing it on every hit means the window
/// is a true fixed window, not a sliding one that a steady request stream
/// could keep open forever.
const INCR_SCRIPT: &str = r#"
local key = KEYS[1]
local window = tonumber(ARGV[1])
local count = redis.call('INCR', key)
if count == 1 then
    redis.call('EXPIRE', key, window)
end
return count
"#;
