//! Outbound HTTP client pool sizing — consumed by `riptide-utils::http::HttpConfig`
//! when the origin client is built.

use crate::env::EnvConfigLoader;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pool and timeout knobs for the shared outbound HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpPoolConfig {
    /// Total connections across all hosts.
    pub connector_limit: usize,
    /// Max idle connections kept per host.
    pub per_host: usize,
    /// Idle keep-alive duration.
    pub keepalive: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub total_timeout: Duration,
    /// DNS cache TTL.
    pub dns_cache: Duration,
}

impl Default for HttpPoolConfig {
    fn default() -> Self {
        Self {
            connector_limit: 100,
            per_host: 30,
            keepalive: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(15),
            total_timeout: Duration::from_secs(90),
            dns_cache: Duration::from_secs(600),
        }
    }
}

impl HttpPoolConfig {
    /// Load from environment with the `HTTP_POOL_` prefix.
    pub fn from_env() -> Self {
        let loader = EnvConfigLoader::new().with_prefix("HTTP_POOL_");
        let defaults = Self::default();
        Self {
            connector_limit: loader
                .get_optional("CONNECTOR_LIMIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.connector_limit),
            per_host: loader
                .get_optional("PER_HOST")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.per_host),
            keepalive: loader
                .get_optional("KEEPALIVE_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.keepalive),
            connect_timeout: loader
                .get_optional("CONNECT_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            total_timeout: loader
                .get_optional("TOTAL_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.total_timeout),
            dns_cache: loader
                .get_optional("DNS_CACHE_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.dns_cache),
        }
    }
}
