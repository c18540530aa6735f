//! Origin (backend) configuration: HTTP upstream or local filesystem.

use crate::env::EnvConfigLoader;
use serde::{Deserialize, Serialize};

/// Which origin mode the proxy forwards requests to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Forward to an upstream HTTP(S) server.
    Http,
    /// Serve directly from a local directory tree.
    Filesystem,
}

impl BackendMode {
    fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "filesystem" | "fs" => BackendMode::Filesystem,
            _ => BackendMode::Http,
        }
    }
}

/// Origin backend settings, selected at startup by `mode`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// `http` or `filesystem`.
    pub mode: BackendMode,
    /// Upstream host (HTTP mode).
    pub host: String,
    /// Upstream port (HTTP mode).
    pub port: u16,
    /// Use HTTPS rather than plain HTTP (HTTP mode).
    pub use_https: bool,
    /// Verify the upstream's TLS certificate (HTTP mode). When false, *all*
    /// outbound HTTPS connections from the shared client pool skip verification.
    pub ssl_verify: bool,
    /// `Host` header override sent to the upstream, if configured.
    pub proxy_host_header: Option<String>,
    /// Root directory files are resolved against (filesystem mode).
    pub filesystem_root: Option<String>,
    /// Whether to prefer the OS `sendfile` fast path (filesystem mode).
    pub filesystem_sendfile: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            mode: BackendMode::Http,
            host: "127.0.0.1".to_string(),
            port: 80,
            use_https: false,
            ssl_verify: true,
            proxy_host_header: None,
            filesystem_root: None,
            filesystem_sendfile: true,
        }
    }
}

impl BackendConfig {
    /// Load from environment with the `BACKEND_` prefix.
    pub fn from_env() -> Self {
        let loader = EnvConfigLoader::new().with_prefix("BACKEND_");
        let defaults = Self::default();
        Self {
            mode: loader
                .get_optional("MODE")
                .map(|v| BackendMode::parse(&v))
                .unwrap_or(defaults.mode),
            host: loader.get_optional("HOST").unwrap_or(defaults.host),
            port: loader
                .get_optional("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            use_https: loader
                .get_optional("USE_HTTPS")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.use_https),
            ssl_verify: loader
                .get_optional("SSL_VERIFY")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.ssl_verify),
            proxy_host_header: loader.get_optional("PROXY_HOST_HEADER"),
            filesystem_root: loader.get_optional("FILESYSTEM_ROOT"),
            filesystem_sendfile: loader
                .get_optional("FILESYSTEM_SENDFILE")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.filesystem_sendfile),
        }
    }

    /// `scheme://host:port` for the upstream, HTTP mode only.
    pub fn origin_base(&self) -> String {
        let scheme = if self.use_https { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mode_is_http() {
        assert_eq!(BackendConfig::default().mode, BackendMode::Http);
    }

    #[test]
    fn origin_base_reflects_https_flag() {
        let mut cfg = BackendConfig::default();
        cfg.host = "origin.example".to_string();
        cfg.port = 8443;
        cfg.use_https = true;
        assert_eq!(cfg.origin_base(), "https://origin.example:8443");
    }

    #[test]
    fn mode_parse_accepts_aliases() {
        assert_eq!(BackendMode::parse("filesystem"), BackendMode::Filesystem);
        assert_eq!(BackendMode::parse("fs"), BackendMode::Filesystem);
        assert_eq!(BackendMode::parse("http"), BackendMode::Http);
        assert_eq!(BackendMode::parse("garbage"), BackendMode::Http);
    }
}
