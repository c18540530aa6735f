//! Redis connection configuration.

use crate::env::EnvConfigLoader;
use serde::{Deserialize, Serialize};

/// Redis connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Hostname or IP.
    pub host: String,
    /// Port.
    pub port: u16,
    /// Logical database index.
    pub db: u32,
    /// Password, if the server requires one.
    pub password: Option<String>,
    /// Connection pool size.
    pub pool_size: u32,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            db: 0,
            password: None,
            pool_size: 150,
        }
    }
}

impl RedisConfig {
    /// Load from environment with the `REDIS_` prefix.
    pub fn from_env() -> Self {
        let loader = EnvConfigLoader::new().with_prefix("REDIS_");
        let defaults = Self::default();
        Self {
            host: loader.get_optional("HOST").unwrap_or(defaults.host),
            port: loader
                .get_optional("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            db: loader
                .get_optional("DB")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.db),
            password: loader.get_optional("PASSWORD"),
            pool_size: loader
                .get_optional("POOL_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.pool_size),
        }
    }

    /// Build the `redis://` connection URL.
    pub fn url(&self) -> String {
        let auth = self
            .password
            .as_ref()
            .map(|p| format!(":{p}@"))
            .unwrap_or_default();
        format!("redis://{auth}{}:{}/{}", self.host, self.port, self.db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pool_size_matches_spec() {
        assert_eq!(RedisConfig::default().pool_size, 150);
    }

    #[test]
    fn url_without_password() {
        let cfg = RedisConfig::default();
        assert_eq!(cfg.url(), "redis://127.0.0.1:6379/0");
    }

    #[test]
    fn url_with_password() {
        let mut cfg = RedisConfig::default();
        cfg.password = Some("secret".to_string());
        assert_eq!(cfg.url(), "redis://:secret@127.0.0.1:6379/0");
    }
}
