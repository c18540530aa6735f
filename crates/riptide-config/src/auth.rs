//! Authorization pipeline configuration: HMAC secret, session/whitelist TTLs
//! and caps, extension sets, and the test-mode bypass flags.

use crate::api_key_validation::validate_api_key;
use crate::env::EnvConfigLoader;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::warn;

/// Authorization-pipeline settings (see the 9-step evaluation order).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC-SHA256 secret used to verify `?uid=&expires=&token=` tokens.
    pub secret_key: String,
    /// Bearer key required for the admin/whitelist endpoints.
    pub api_key: String,
    /// Session TTL, default 1800s.
    pub session_ttl: Duration,
    /// Whitelist entry TTL, default 3600s.
    pub ip_access_ttl: Duration,
    /// Max `(ip, ua)` pairs tracked per UID before FIFO eviction.
    pub max_ua_ip_pairs_per_uid: usize,
    /// Max tracked paths per whitelist entry before FIFO eviction.
    pub max_paths_per_entry: usize,
    /// Raw fixed whitelist entries, parsed with `riptide_cache::cidr::parse_fixed_entry`.
    pub fixed_ip_whitelist: Vec<String>,
    /// Whether step 7 (static-file-only whitelist probe) is evaluated at all.
    pub enable_static_file_ip_only_check: bool,
    /// Lowercase extensions (with leading dot) eligible for the static-file-only probe.
    pub static_file_extensions: HashSet<String>,
    /// Lowercase extensions (with leading dot) that bypass authorization entirely (step 1).
    pub fully_allowed_extensions: HashSet<String>,
    /// Whether the `enc.key` redirect (step 3) is active.
    pub safe_key_protect_enabled: bool,
    /// Base URL the `enc.key` redirect prepends to the original path.
    pub safe_key_protect_base: String,
    /// Test flag: skip the fixed/dynamic whitelist checks entirely. Must stay false in production.
    pub disable_ip_whitelist: bool,
    /// Test flag: skip the dynamic whitelist path match. Must stay false in production.
    pub disable_path_protection: bool,
    /// Test flag: bypass HMAC token verification (step 4) entirely. Must stay false in production.
    pub disable_session_validation: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            api_key: String::new(),
            session_ttl: Duration::from_secs(1800),
            ip_access_ttl: Duration::from_secs(3600),
            max_ua_ip_pairs_per_uid: 5,
            max_paths_per_entry: 32,
            fixed_ip_whitelist: Vec::new(),
            enable_static_file_ip_only_check: false,
            static_file_extensions: default_static_file_extensions(),
            fully_allowed_extensions: default_fully_allowed_extensions(),
            safe_key_protect_enabled: false,
            safe_key_protect_base: String::new(),
            disable_ip_whitelist: false,
            disable_path_protection: false,
            disable_session_validation: false,
        }
    }
}

fn default_static_file_extensions() -> HashSet<String> {
    [
        ".jpg", ".jpeg", ".png", ".gif", ".webp", ".css", ".js", ".woff", ".woff2", ".ttf",
        ".svg", ".ico",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_fully_allowed_extensions() -> HashSet<String> {
    [".ts", ".webp", ".php"].into_iter().map(String::from).collect()
}

impl AuthConfig {
    /// Load from environment with the `AUTH_` prefix.
    ///
    /// Panics if `secret_key` is missing, or if `api_key` fails
    /// [`validate_api_key`] — the same intentional fail-fast the teacher's
    /// API key loader uses for weak bearer secrets.
    pub fn from_env() -> Self {
        let loader = EnvConfigLoader::new().with_prefix("AUTH_");
        let defaults = Self::default();

        let secret_key = loader
            .get_optional("SECRET_KEY")
            .unwrap_or_else(|| panic!("AUTH_SECRET_KEY must be set"));

        let api_key = loader.get_optional("API_KEY").unwrap_or_default();
        if !api_key.is_empty() {
            if let Err(e) = validate_api_key(&api_key) {
                panic!("Invalid AUTH_API_KEY: {e}");
            }
        }

        let config = Self {
            secret_key,
            api_key,
            session_ttl: loader
                .get_optional("SESSION_TTL_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_ttl),
            ip_access_ttl: loader
                .get_optional("IP_ACCESS_TTL_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.ip_access_ttl),
            max_ua_ip_pairs_per_uid: loader
                .get_optional("MAX_UA_IP_PAIRS_PER_UID")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_ua_ip_pairs_per_uid),
            max_paths_per_entry: loader
                .get_optional("MAX_PATHS_PER_ENTRY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_paths_per_entry),
            fixed_ip_whitelist: loader
                .get_list("FIXED_IP_WHITELIST")
                .unwrap_or_default(),
            enable_static_file_ip_only_check: loader
                .get_optional("ENABLE_STATIC_FILE_IP_ONLY_CHECK")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.enable_static_file_ip_only_check),
            static_file_extensions: loader
                .get_list("STATIC_FILE_EXTENSIONS")
                .map(|v| v.into_iter().collect())
                .unwrap_or(defaults.static_file_extensions),
            fully_allowed_extensions: loader
                .get_list("FULLY_ALLOWED_EXTENSIONS")
                .map(|v| v.into_iter().collect())
                .unwrap_or(defaults.fully_allowed_extensions),
            safe_key_protect_enabled: loader
                .get_optional("SAFE_KEY_PROTECT_ENABLED")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.safe_key_protect_enabled),
            safe_key_protect_base: loader
                .get_optional("SAFE_KEY_PROTECT_BASE")
                .unwrap_or(defaults.safe_key_protect_base),
            disable_ip_whitelist: loader
                .get_optional("DISABLE_IP_WHITELIST")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(false),
            disable_path_protection: loader
                .get_optional("DISABLE_PATH_PROTECTION")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(false),
            disable_session_validation: loader
                .get_optional("DISABLE_SESSION_VALIDATION")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(false),
        };

        config.warn_if_unsafe();
        config
    }

    /// Logs a startup warning for each test-mode bypass flag left enabled.
    /// These flags exist for integration testing only and must never be set
    /// true in a production deployment.
    fn warn_if_unsafe(&self) {
        if self.disable_ip_whitelist {
            warn!("AUTH_DISABLE_IP_WHITELIST is true — whitelist checks are bypassed");
        }
        if self.disable_path_protection {
            warn!("AUTH_DISABLE_PATH_PROTECTION is true — path matching is bypassed");
        }
        if self.disable_session_validation {
            warn!("AUTH_DISABLE_SESSION_VALIDATION is true — HMAC token verification is bypassed");
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
