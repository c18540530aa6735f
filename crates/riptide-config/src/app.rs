//! Top-level process configuration, loaded once at startup into an immutable
//! `AppConfig` — a plain struct with no live-reload and no dynamic mutation.

use crate::auth::AuthConfig;
use crate::backend::BackendConfig;
use crate::browser_class::M3u8LimitsConfig;
use crate::http_pool::HttpPoolConfig;
use crate::redis::RedisConfig;
use crate::traffic::TrafficConfig;
use serde::{Deserialize, Serialize};

/// Everything the proxy needs, assembled once at process start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP server binds to.
    pub bind_address: String,
    /// Redis connection settings.
    pub redis: RedisConfig,
    /// Origin backend settings.
    pub backend: BackendConfig,
    /// Outbound HTTP client pool settings (HTTP backend mode).
    pub http_pool: HttpPoolConfig,
    /// Authorization pipeline settings.
    pub auth: AuthConfig,
    /// Traffic accounting engine settings.
    pub traffic: TrafficConfig,
    /// Per-browser-class m3u8 adaptive counter limits.
    pub m3u8_limits: M3u8LimitsConfig,
    /// Capacity of each access-log ring buffer (denied/recent), default 100.
    pub access_log_capacity: usize,
}

impl AppConfig {
    /// Load the full configuration surface from environment variables.
    ///
    /// Panics on a missing HMAC secret or a weak admin API key — both are
    /// fail-fast-at-boot conditions, not runtime errors.
    pub fn from_env() -> Self {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let access_log_capacity = std::env::var("ACCESS_LOG_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(100);

        Self {
            bind_address,
            redis: RedisConfig::from_env(),
            backend: BackendConfig::from_env(),
            http_pool: HttpPoolConfig::from_env(),
            auth: AuthConfig::from_env(),
            traffic: TrafficConfig::from_env(),
            m3u8_limits: M3u8LimitsConfig::from_env(),
            access_log_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_log_capacity_defaults_to_100() {
        std::env::remove_var("ACCESS_LOG_CAPACITY");
        std::env::set_var("AUTH_SECRET_KEY", "test-secret-for-config-unit-test");
        let cfg = AppConfig::from_env();
        assert_eq!(cfg.access_log_capacity, 100);
        std::env::remove_var("AUTH_SECRET_KEY");
    }
}
