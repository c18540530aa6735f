//! Response header composition rules shared by every origin mode.
//!
//! CORS is deliberately not handled here — it's a `tower_http::cors::CorsLayer`
//! wrapping the whole router in `riptide-api`, not a per-response decision.

/// Headers that describe the hop to the immediate peer, not the resource
/// itself. An upstream's `Transfer-Encoding`/`Content-Encoding` in
/// particular must never survive into the proxy's response: re-chunking or
/// re-compressing here would desynchronize the `Content-Length` we compute
/// from the origin's actual byte count.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-encoding",
    "content-length",
];

/// Whether `name` (already lowercased) should be dropped from the origin's
/// raw header list before composing the proxy's response.
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.contains(&name)
}

/// Lowercased file extension without the leading dot, or `"unknown"`.
pub fn extension_of(path: &str) -> String {
    std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "unknown".to_string())
}

/// `Cache-Control` value for a served path. Playlists are always revalidated
/// — an HLS player polling a live `.m3u8` must never see a stale segment
/// list from a shared cache. Segments and keys are safely cacheable for a
/// short window since they're immutable once published.
pub fn cache_control_for(path: &str) -> &'static str {
    if extension_of(path) == "m3u8" {
        "no-cache, no-store, must-revalidate"
    } else {
        "public, max-age=600"
    }
}
