//! Path-bound and static-file whitelist tables.
//!
//! Two disjoint namespaces (`ip_cidr_access:*` / `static_file_access:*`) hold
//! `WhitelistEntry` records keyed by `(ip_pattern, ua_hash)`. A per-UID
//! pair table (`uid_ua_ip_pairs:<uid>` / `uid_static_ua_ip_pairs:<uid>`) bounds
//! how many distinct `(ip, ua)` pairs a UID may hold; once the bound is
//! exceeded the oldest pair's whitelist entry is evicted along with it.
//!
//! Both the entry upsert and the pair-table maintenance happen inside one
//! `redis::Script` invocation so concurrent `AddWhitelist` calls for the same
//! key can't race each other into dropping a path or mis-evicting a pair —
//! the same atomicity discipline as the m3u8 counter in [`crate::m3u8`].

use redis::AsyncCommands;
use riptide_types::error::Result as RiptideResult;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::info;

use crate::redis_manager::{convert_error, RedisHandle};

/// Which whitelist namespace an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// `AddWhitelist` — entries are additionally bound to a `key_path`.
    PathBound,
    /// `AddStaticWhitelist` — path-independent, applies only to static file extensions.
    Static,
}

impl Namespace {
    fn entry_prefix(self) -> &'static str {
        match self {
            Namespace::PathBound => "ip_cidr_access",
            Namespace::Static => "static_file_access",
        }
    }

    fn pairs_prefix(self) -> &'static str {
        match self {
            Namespace::PathBound => "uid_ua_ip_pairs",
            Namespace::Static => "uid_static_ua_ip_pairs",
        }
    }

    fn access_type(self) -> &'static str {
        match self {
            Namespace::PathBound => "path_bound",
            Namespace::Static => "static_files_only",
        }
    }
}

/// A single tracked path a whitelist entry grants access to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathEntry {
    /// The extracted match key (see `extract_match_key`).
    pub key_path: String,
    /// When this path was added (unix seconds).
    pub added_at: u64,
}

/// A whitelist table row, keyed externally by `(ip_pattern, ua_hash)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhitelistEntry {
    /// Owning UID.
    pub uid: String,
    /// Secondary index of IP patterns this entry was created under (usually one).
    pub ip_patterns: Vec<String>,
    /// Full User-Agent string recorded at creation.
    pub user_agent: String,
    /// Creation timestamp (unix seconds).
    pub created_at: u64,
    /// Tracked paths. Always empty for `Namespace::Static` entries.
    ///
    /// Redis's bundled Lua `cjson` has no stable way to force an empty
    /// Lua table to encode as `[]` rather than `{}` — a freshly-created
    /// static entry's `paths` table is empty and round-trips through the
    /// `UPSERT_SCRIPT` as a JSON object, not an array. `deserialize_paths`
    /// accepts either shape rather than betting on `cjson`'s encoding.
    #[serde(default, deserialize_with = "deserialize_paths")]
    pub paths: Vec<PathEntry>,
    /// `"path_bound"` or `"static_files_only"`.
    pub access_type: String,
}

/// Accepts a JSON array of `PathEntry` (the normal case) or an empty JSON
/// object (what `cjson.encode` produces for an empty Lua table), since
/// `cjson` cannot be relied on to tell the two apart at encode time.
fn deserialize_paths<'de, D>(deserializer: D) -> Result<Vec<PathEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(D::Error::custom))
            .collect(),
        serde_json::Value::Object(map) if map.is_empty() => Ok(Vec::new()),
        other => Err(D::Error::custom(format!(
            "expected array or empty object for `paths`, got {other}"
        ))),
    }
}

/// One `(ip_pattern, ua_hash)` pair tracked against a UID's cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UidPair {
    /// `"{ip_pattern}:{ua_hash}"`, also the suffix of the evicted entry key.
    pub pair_id: String,
    /// IP pattern component of the pair.
    pub ip_pattern: String,
    /// UA hash component of the pair.
    pub ua_hash: String,
    /// When this pair was first seen.
    pub created_at: u64,
    /// When this pair was last refreshed.
    pub last_updated: u64,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn entry_key(ns: Namespace, ip_pattern: &str, ua_hash: &str) -> String {
    format!("{}:{}:{}", ns.entry_prefix(), ip_pattern, ua_hash)
}

fn pairs_key(ns: Namespace, uid: &str) -> String {
    format!("{}:{}", ns.pairs_prefix(), uid)
}

/// Extract the key-path binding a whitelist entry to a logical "folder".
///
/// Scans path segments left to right for a `YYYY-MM-DD` date segment; if
/// found, the segment immediately after it is the match key. Otherwise the
/// last non-empty segment is used. An empty/root path yields an empty
/// string, which can never match a real request.
pub fn extract_match_key(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return String::new();
    }

    for (i, seg) in segments.iter().enumerate() {
        if is_date_segment(seg) {
            if let Some(next) = segments.get(i + 1) {
                return (*next).to_string();
            }
        }
    }

    segments.last().unwrap().to_string()
}

fn is_date_segment(seg: &str) -> bool {
    let bytes = seg.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[8..10].iter().all(u8::is_ascii_digit)
}

/// Redis-backed whitelist store for both namespaces.
#[derive(Clone)]
pub struct WhitelistStore {
    redis: RedisHandle,
    entry_ttl: Duration,
    max_paths_per_entry: usize,
    max_pairs_per_uid: usize,
}

impl WhitelistStore {
    /// Construct a store with the configured TTL and caps (spec defaults:
    /// `entry_ttl` = 3600s, `max_paths_per_entry` = 32, `max_pairs_per_uid` = 5).
    pub fn new(
        redis: RedisHandle,
        entry_ttl: Duration,
        max_paths_per_entry: usize,
        max_pairs_per_uid: usize,
    ) -> Self {
        Self {
            redis,
            entry_ttl,
            max_paths_per_entry,
            max_pairs_per_uid,
        }
    }

    /// `AddWhitelist`: bind `uid` to `(ip_pattern, ua_hash)` for the path's
    /// match key. Idempotent — re-adding the same path is a no-op beyond
    /// refreshing the entry's TTL.
    pub async fn add_whitelist(
        &self,
        uid: &str,
        path: &str,
        ip_pattern: &str,
        ua_hash: &str,
        user_agent: &str,
    ) -> RiptideResult<WhitelistEntry> {
        let match_key = extract_match_key(path);
        self.upsert(Namespace::PathBound, uid, ip_pattern, ua_hash, user_agent, &match_key)
            .await
    }

    /// `AddStaticWhitelist`: bind `uid` to `(ip_pattern, ua_hash)` with no
    /// path tracking — authorization for static-file extensions becomes
    /// path-independent.
    pub async fn add_static_whitelist(
        &self,
        uid: &str,
        ip_pattern: &str,
        ua_hash: &str,
        user_agent: &str,
    ) -> RiptideResult<WhitelistEntry> {
        self.upsert(Namespace::Static, uid, ip_pattern, ua_hash, user_agent, "")
            .await
    }

    async fn upsert(
        &self,
        ns: Namespace,
        uid: &str,
        ip_pattern: &str,
        ua_hash: &str,
        user_agent: &str,
        match_key: &str,
    ) -> RiptideResult<WhitelistEntry> {
        let mut conn = self.redis.connection();
        let script = redis::Script::new(UPSERT_SCRIPT);
        let encoded: String = script
            .key(entry_key(ns, ip_pattern, ua_hash))
            .key(pairs_key(ns, uid))
            .arg(uid)
            .arg(ip_pattern)
            .arg(ua_hash)
            .arg(user_agent)
            .arg(match_key)
            .arg(now_secs())
            .arg(self.entry_ttl.as_secs())
            .arg(self.max_paths_per_entry)
            .arg(self.max_pairs_per_uid)
            .arg(ns.access_type())
            .arg(ns.entry_prefix())
            .invoke_async(&mut conn)
            .await
            .map_err(convert_error)?;

        info!(uid, ip_pattern, ua_hash, ?ns, "whitelist entry upserted");
        serde_json::from_str(&encoded)
            .map_err(|e| riptide_types::RiptideError::SerializationError(e.to_string()))
    }

    /// Probe the path-bound namespace for `(ip_pattern, ua_hash)` and check
    /// whether `match_key` is among its tracked paths.
    pub async fn probe_path_bound(
        &self,
        ip_pattern: &str,
        ua_hash: &str,
        match_key: &str,
    ) -> RiptideResult<bool> {
        match self.get_entry(Namespace::PathBound, ip_pattern, ua_hash).await? {
            Some(entry) => Ok(entry.paths.iter().any(|p| p.key_path == match_key)),
            None => Ok(false),
        }
    }

    /// Probe the static-file namespace for `(ip_pattern, ua_hash)` — path is
    /// not checked, existence alone is sufficient.
    pub async fn probe_static(&self, ip_pattern: &str, ua_hash: &str) -> RiptideResult<bool> {
        Ok(self
            .get_entry(Namespace::Static, ip_pattern, ua_hash)
            .await?
            .is_some())
    }

    /// Fetch a raw entry (used by the admin readout endpoints too).
    pub async fn get_entry(
        &self,
        ns: Namespace,
        ip_pattern: &str,
        ua_hash: &str,
    ) -> RiptideResult<Option<WhitelistEntry>> {
        let mut conn = self.redis.connection();
        let data: Option<String> = conn
            .get(entry_key(ns, ip_pattern, ua_hash))
            .await
            .map_err(convert_error)?;
        data.map(|json| {
            serde_json::from_str(&json)
                .map_err(|e| riptide_types::RiptideError::SerializationError(e.to_string()))
        })
        .transpose()
    }

    /// List the UID pair table for `uid` in the given namespace.
    pub async fn uid_pairs(&self, ns: Namespace, uid: &str) -> RiptideResult<Vec<UidPair>> {
        let mut conn = self.redis.connection();
        let data: Option<String> = conn
            .get(pairs_key(ns, uid))
            .await
            .map_err(convert_error)?;
        match data {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| riptide_types::RiptideError::SerializationError(e.to_string())),
            None => Ok(Vec::new()),
        }
    }
}

/// Atomic upsert: load-or-create the entry, append/evict a path, refresh the
/// TTL, then maintain the UID pair table and cascade-delete the evicted
/// pair's entry — all inside one round trip so concurrent callers for the
/// same key cannot interleave and lose an update.
const UPSERT_SCRIPT: &str = r#"
local entry_key = KEYS[1]
local pairs_key = KEYS[2]
local uid = ARGV[1]
local ip_pattern = ARGV[2]
local ua_hash = ARGV[3]
local user_agent = ARGV[4]
local match_key = ARGV[5]
local now = tonumber(ARGV[6])
local entry_ttl = tonumber(ARGV[7])
local max_paths = tonumber(ARGV[8])
local max_pairs = tonumber(ARGV[9])
local access_type = ARGV[10]
local key_prefix = ARGV[11]

local raw = redis.call('GET', entry_key)
local entry
if raw then
    entry = cjson.decode(raw)
else
    entry = { uid = uid, ip_patterns = {ip_pattern}, user_agent = user_agent, created_at = now, paths = {}, access_type = access_type }
end

if match_key ~= '' then
    local found = false
    for _, p in ipairs(entry.paths) do
        if p.key_path == match_key then found = true end
    end
    if not found then
        table.insert(entry.paths, { key_path = match_key, added_at = now })
        while #entry.paths > max_paths do
            table.remove(entry.paths, 1)
        end
    end
end

redis.call('SET', entry_key, cjson.encode(entry), 'EX', entry_ttl)

local pairs_raw = redis.call('GET', pairs_key)
local pair_list
if pairs_raw then
    pair_list = cjson.decode(pairs_raw)
else
    pair_list = {}
end

local pair_id = ip_pattern .. ':' .. ua_hash
local existing_idx = nil
for i, p in ipairs(pair_list) do
    if p.pair_id == pair_id then existing_idx = i end
end
if existing_idx then
    pair_list[existing_idx].last_updated = now
else
    table.insert(pair_list, { pair_id = pair_id, ip_pattern = ip_pattern, ua_hash = ua_hash, created_at = now, last_updated = now })
end

while #pair_list > max_pairs do
    local oldest = table.remove(pair_list, 1)
    local evicted_key = key_prefix .. ':' .. oldest.ip_pattern .. ':' .. oldest.ua_hash
    redis.call('DEL', evicted_key)
end

redis.call('SET', pairs_key, cjson.encode(pair_list))

return cjson.encode(entry)
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_match_key_uses_segment_after_date() {
        assert_eq!(
            extract_match_key("/video/2025-06-17/ABC/index.m3u8"),
            "ABC"
        );
    }

    #[test]
    fn extract_match_key_falls_back_to_last_segment() {
        assert_eq!(extract_match_key("/assets/logo.png"), "logo.png");
    }

    #[test]
    fn extract_match_key_handles_root() {
        assert_eq!(extract_match_key("/"), "");
        assert_eq!(extract_match_key(""), "");
    }

    #[test]
    fn extract_match_key_date_segment_at_end_has_no_next() {
        // A trailing date with nothing after it falls through to the
        // "last non-empty segment" rule, which is the date itself.
        assert_eq!(extract_match_key("/archive/2025-06-17"), "2025-06-17");
    }

    #[test]
    fn date_segment_detection_rejects_lookalikes() {
        assert!(is_date_segment("2025-06-17"));
        assert!(!is_date_segment("2025-6-17"));
        assert!(!is_date_segment("ABC"));
        assert!(!is_date_segment("2025-06-1x"));
    }

    /// A static entry's `paths` round-trips through `cjson.encode` as `{}`,
    /// not `[]` — this is what `WhitelistEntry`'s deserializer has to survive.
    #[test]
    fn whitelist_entry_deserializes_empty_object_paths_as_empty_vec() {
        let json = r#"{
            "uid": "u1",
            "ip_patterns": ["198.51.100.0/24"],
            "user_agent": "player/1.0",
            "created_at": 1000,
            "paths": {},
            "access_type": "static_files_only"
        }"#;
        let entry: WhitelistEntry = serde_json::from_str(json).unwrap();
        assert!(entry.paths.is_empty());
    }

    #[test]
    fn whitelist_entry_deserializes_populated_array_paths() {
        let json = r#"{
            "uid": "u1",
            "ip_patterns": ["198.51.100.0/24"],
            "user_agent": "player/1.0",
            "created_at": 1000,
            "paths": [{"key_path": "ABC", "added_at": 1000}],
            "access_type": "path_bound"
        }"#;
        let entry: WhitelistEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.paths.len(), 1);
        assert_eq!(entry.paths[0].key_path, "ABC");
    }

    #[test]
    fn whitelist_entry_rejects_non_empty_object_paths() {
        let json = r#"{
            "uid": "u1",
            "ip_patterns": ["198.51.100.0/24"],
            "user_agent": "player/1.0",
            "created_at": 1000,
            "paths": {"0": "unexpected"},
            "access_type": "static_files_only"
        }"#;
        assert!(serde_json::from_str::<WhitelistEntry>(json).is_err());
    }
}
