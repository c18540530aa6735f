//! Session record store.
//!
//! A `SessionRecord` is keyed by an opaque session id (`session:<sid>`) and
//! reverse-indexed by its fingerprint (`session_idx:<uid>:<ip>:<ua>:<key_path>`)
//! so a repeat request from the same caller can be recognized without
//! re-verifying its token. Touch is a single atomic Lua round trip extending
//! TTL and bumping the access counter, extending the get-and-refresh pattern
//! used for the rest of this crate's Redis state.

use redis::AsyncCommands;
use riptide_types::error::Result as RiptideResult;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;
use uuid::Uuid;

use crate::redis_manager::{convert_error, RedisHandle};

/// A bound caller/resource session, created on first successful authorization
/// for a fingerprint and renewed on reuse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Opaque session id.
    pub session_id: String,
    /// Caller-supplied UID.
    pub uid: String,
    /// Client IP as seen at creation (canonicalized string form).
    pub ip: String,
    /// Full User-Agent string.
    pub ua: String,
    /// Extracted match key the session is bound to.
    pub key_path: String,
    /// Creation timestamp (unix seconds).
    pub created_at: u64,
    /// Last successful reuse (unix seconds).
    pub last_active: u64,
    /// Number of times this session has been reused.
    pub access_count: u64,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn session_key(session_id: &str) -> String {
    format!("session:{session_id}")
}

fn index_key(uid: &str, ip: &str, ua: &str, key_path: &str) -> String {
    format!("session_idx:{uid}:{ip}:{ua}:{key_path}")
}

/// Redis-backed session store.
#[derive(Clone)]
pub struct SessionStore {
    redis: RedisHandle,
    ttl: Duration,
}

impl SessionStore {
    /// Build a store over `redis` with the configured session TTL.
    pub fn new(redis: RedisHandle, ttl: Duration) -> Self {
        Self { redis, ttl }
    }

    /// Create a new session for the given fingerprint, storing both the
    /// record and its reverse index with the configured TTL.
    pub async fn create(
        &self,
        uid: &str,
        ip: &str,
        ua: &str,
        key_path: &str,
    ) -> RiptideResult<SessionRecord> {
        let now = now_secs();
        let record = SessionRecord {
            session_id: Uuid::new_v4().to_string(),
            uid: uid.to_string(),
            ip: ip.to_string(),
            ua: ua.to_string(),
            key_path: key_path.to_string(),
            created_at: now,
            last_active: now,
            access_count: 1,
        };

        let json = serde_json::to_string(&record)
            .map_err(|e| riptide_types::RiptideError::SerializationError(e.to_string()))?;

        let mut conn = self.redis.connection();
        let ttl_secs = self.ttl.as_secs();
        let _: () = redis::pipe()
            .atomic()
            .set_ex(session_key(&record.session_id), &json, ttl_secs)
            .set_ex(index_key(uid, ip, ua, key_path), &record.session_id, ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(convert_error)?;

        debug!(session_id = %record.session_id, uid, "session created");
        Ok(record)
    }

    /// Look up a session by its fingerprint tuple.
    pub async fn find_by_fingerprint(
        &self,
        uid: &str,
        ip: &str,
        ua: &str,
        key_path: &str,
    ) -> RiptideResult<Option<SessionRecord>> {
        let mut conn = self.redis.connection();
        let sid: Option<String> = conn
            .get(index_key(uid, ip, ua, key_path))
            .await
            .map_err(convert_error)?;

        match sid {
            Some(sid) => self.get(&sid).await,
            None => Ok(None),
        }
    }

    /// Fetch a session record by id without touching it.
    pub async fn get(&self, session_id: &str) -> RiptideResult<Option<SessionRecord>> {
        let mut conn = self.redis.connection();
        let data: Option<String> = conn
            .get(session_key(session_id))
            .await
            .map_err(convert_error)?;
        data.map(|json| {
            serde_json::from_str(&json)
                .map_err(|e| riptide_types::RiptideError::SerializationError(e.to_string()))
        })
        .transpose()
    }

    /// Atomically extend TTL and bump `access_count`. Returns `None` if the
    /// session expired between lookup and touch (the caller should fall
    /// back to re-authorizing).
    ///
    /// Also refreshes the reverse-index key's TTL so it doesn't expire out
    /// from under a still-live session record under sustained reuse.
    pub async fn touch(&self, session_id: &str) -> RiptideResult<Option<SessionRecord>> {
        let mut conn = self.redis.connection();
        let script = redis::Script::new(TOUCH_SCRIPT);
        let result: Option<String> = script
            .key(session_key(session_id))
            .arg(self.ttl.as_secs())
            .arg(now_secs())
            .invoke_async(&mut conn)
            .await
            .map_err(convert_error)?;

        let record: Option<SessionRecord> = result
            .map(|json| {
                serde_json::from_str(&json)
                    .map_err(|e| riptide_types::RiptideError::SerializationError(e.to_string()))
            })
            .transpose()?;

        if let Some(record) = &record {
            let _: Result<bool, _> = conn
                .expire(
                    index_key(&record.uid, &record.ip, &record.ua, &record.key_path),
                    self.ttl.as_secs() as i64,
                )
                .await;
        }

        Ok(record)
    }
}

/// Atomic get-and-refresh: reads the session JSON, bumps `access_count` and
/// `last_active`, re-writes it with a fresh TTL, all in one round trip.
const TOUCH_SCRIPT: &str = r#"
local key = KEYS[1]
local ttl = tonumber(ARGV[1])
local now = tonumber(ARGV[2])
local data = redis.call('GET', key)
if not data then
    return false
end
local session = cjson.decode(data)
session.last_active = now
session.access_count = session.access_count + 1
local encoded = cjson.encode(session)
redis.call('SET', key, encoded, 'EX', ttl)
return encoded
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_and_index_keys_are_namespaced() {
        assert_eq!(session_key("abc"), "session:abc");
        assert_eq!(
            index_key("u1", "1.2.3.4", "ua", "Movie"),
            "session_idx:u1:1.2.3.4:ua:Movie"
        );
    }
}
