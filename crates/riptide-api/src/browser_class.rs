//! User-Agent → browser-class detection (§4.2).
//!
//! Pattern-based: a fixed list of case-insensitive substrings per class,
//! evaluated tool → mobile → desktop with the first match winning. An
//! unmatched UA defaults to `tool_or_downloader`, the strictest class.

use riptide_config::BrowserClass;

const TOOL_PATTERNS: &[&str] = &[
    "vlc",
    "ffmpeg",
    "ffprobe",
    "libmpv",
    "mpv",
    "wget",
    "curl",
    "aria2",
    "okhttp",
    "exoplayer",
    "python-requests",
    "python-urllib",
    "node-fetch",
    "gstreamer",
    "downloader",
    "libavformat",
];

const MOBILE_PATTERNS: &[&str] = &[
    "android",
    "iphone",
    "ipad",
    "ipod",
    "mobile",
    "windows phone",
];

const DESKTOP_PATTERNS: &[&str] = &["windows nt", "macintosh", "x11", "linux x86_64", "cros"];

/// Classify a User-Agent string into one of the three pipeline classes.
pub fn classify(user_agent: &str) -> BrowserClass {
    let ua = user_agent.to_lowercase();

    if TOOL_PATTERNS.iter().any(|p| ua.contains(p)) {
        return BrowserClass::ToolOrDownloader;
    }
    if MOBILE_PATTERNS.iter().any(|p| ua.contains(p)) {
        return BrowserClass::MobileBrowser;
    }
    if DESKTOP_PATTERNS.iter().any(|p| ua.contains(p)) {
        return BrowserClass::DesktopBrowser;
    }
    BrowserClass::ToolOrDownloader
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_mobile_safari() {
        assert_eq!(
            classify("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)"),
            BrowserClass::MobileBrowser
        );
    }

    #[test]
    fn detects_desktop_chrome() {
        assert_eq!(
            classify("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"),
            BrowserClass::DesktopBrowser
        );
    }

    #[test]
    fn detects_vlc_as_tool() {
        assert_eq!(classify("VLC/3.0.18 LibVLC/3.0.18"), BrowserClass::ToolOrDownloader);
    }

    #[test]
    fn empty_ua_defaults_to_tool() {
        assert_eq!(classify(""), BrowserClass::ToolOrDownloader);
    }

    #[test]
    fn tool_pattern_wins_over_mobile_substring() {
        // ExoPlayer UAs often also mention "Android" — tools must win.
        assert_eq!(
            classify("ExoPlayerLib/2.18.1 (Linux;Android 13) ExoPlayerCronetRequestSender"),
            BrowserClass::ToolOrDownloader
        );
    }
}
