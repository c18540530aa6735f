//! Traffic accounting engine configuration.

use crate::api_key_validation::validate_api_key;
use crate::env::EnvConfigLoader;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Settings for the two-tier traffic accumulator and its report/cleanup loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficConfig {
    /// Whether the traffic engine runs at all.
    pub enabled: bool,
    /// Sink URL the report loop POSTs Tier B records to.
    pub report_url: Option<String>,
    /// Bearer key sent with each report POST.
    pub api_key: Option<String>,
    /// Bytes at which a Tier A record is promoted into Tier B.
    pub min_bytes_threshold: u64,
    /// Report loop interval, default 300s.
    pub report_interval: Duration,
    /// Tier A idle timeout before a record is dropped, default 600s.
    pub accumulator_idle_timeout: Duration,
    /// Either-tier idle timeout before a record is dropped, default 1800s.
    pub long_idle_timeout: Duration,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            report_url: None,
            api_key: None,
            min_bytes_threshold: 1024 * 1024,
            report_interval: Duration::from_secs(300),
            accumulator_idle_timeout: Duration::from_secs(600),
            long_idle_timeout: Duration::from_secs(1800),
        }
    }
}

impl TrafficConfig {
    /// Load from environment with the `TRAFFIC_` prefix.
    pub fn from_env() -> Self {
        let loader = EnvConfigLoader::new().with_prefix("TRAFFIC_");
        let defaults = Self::default();

        let api_key = loader.get_optional("API_KEY");
        if let Some(key) = &api_key {
            if let Err(e) = validate_api_key(key) {
                warn!(error = %e, "TRAFFIC_API_KEY looks weak");
            }
        }

        Self {
            enabled: loader
                .get_optional("ENABLED")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.enabled),
            report_url: loader.get_optional("REPORT_URL"),
            api_key,
            min_bytes_threshold: loader
                .get_optional("MIN_BYTES_THRESHOLD")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.min_bytes_threshold),
            report_interval: loader
                .get_optional("REPORT_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.report_interval),
            accumulator_idle_timeout: loader
                .get_optional("ACCUMULATOR_IDLE_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.accumulator_idle_timeout),
            long_idle_timeout: loader
                .get_optional("LONG_IDLE_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.long_idle_timeout),
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
