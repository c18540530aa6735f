//! Browser-class classification and the per-class m3u8 adaptive-counter limits.

use crate::env::EnvConfigLoader;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The three User-Agent classes the authorization pipeline distinguishes.
/// Detection itself (substring matching over a UA string) lives at the
/// `riptide-api` boundary; this type is just the classification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrowserClass {
    /// A mobile browser UA.
    MobileBrowser,
    /// A desktop browser UA.
    DesktopBrowser,
    /// Anything else — players, downloaders, scripts. The default/strictest class.
    ToolOrDownloader,
}

/// One `(window, max)` limit pair for the m3u8 adaptive counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct M3u8Limit {
    /// Window length the count resets after.
    pub window: Duration,
    /// Max reads allowed within the window.
    pub max: u64,
}

/// Per-class m3u8 limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct M3u8LimitsConfig {
    /// mobile_browser default: 3 reads / 30s.
    pub mobile: M3u8Limit,
    /// desktop_browser default: 2 reads / 20s.
    pub desktop: M3u8Limit,
    /// tool_or_downloader default: 1 read / 15s (strictest).
    pub tool: M3u8Limit,
}

impl Default for M3u8LimitsConfig {
    fn default() -> Self {
        Self {
            mobile: M3u8Limit {
                window: Duration::from_secs(30),
                max: 3,
            },
            desktop: M3u8Limit {
                window: Duration::from_secs(20),
                max: 2,
            },
            tool: M3u8Limit {
                window: Duration::from_secs(15),
                max: 1,
            },
        }
    }
}

impl M3u8LimitsConfig {
    /// Load from environment with the `M3U8_` prefix
    /// (`M3U8_MOBILE_WINDOW_SECS`, `M3U8_MOBILE_MAX`, …).
    pub fn from_env() -> Self {
        let loader = EnvConfigLoader::new().with_prefix("M3U8_");
        let defaults = Self::default();
        Self {
            mobile: load_limit(&loader, "MOBILE", defaults.mobile),
            desktop: load_limit(&loader, "DESKTOP", defaults.desktop),
            tool: load_limit(&loader, "TOOL", defaults.tool),
        }
    }

    /// The configured limit for a given class.
    pub fn for_class(&self, class: BrowserClass) -> M3u8Limit {
        match class {
            BrowserClass::MobileBrowser => self.mobile,
            BrowserClass::DesktopBrowser => self.desktop,
            BrowserClass::ToolOrDownloader => self.tool,
        }
    }
}

fn load_limit(loader: &EnvConfigLoader, prefix: &str, default: M3u8Limit) -> M3u8Limit {
    M3u8Limit {
        window: loader
            .get_optional(&format!("{prefix}_WINDOW_SECS"))
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(default.window),
        max: loader
            .get_optional(&format!("{prefix}_MAX"))
            .and_then(|v| v.parse().ok())
            .unwrap_or(default.max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let cfg = M3u8LimitsConfig::default();
        assert_eq!(cfg.mobile.max, 3);
        assert_eq!(cfg.mobile.window, Duration::from_secs(30));
        assert_eq!(cfg.desktop.max, 2);
        assert_eq!(cfg.desktop.window, Duration::from_secs(20));
        assert_eq!(cfg.tool.max, 1);
        assert_eq!(cfg.tool.window, Duration::from_secs(15));
    }

    #[test]
    fn for_class_dispatches_correctly() {
        let cfg = M3u8LimitsConfig::default();
        assert_eq!(cfg.for_class(BrowserClass::ToolOrDownloader).max, 1);
        assert_eq!(cfg.for_class(BrowserClass::DesktopBrowser).max, 2);
        assert_eq!(cfg.for_class(BrowserClass::MobileBrowser).max, 3);
    }
}
