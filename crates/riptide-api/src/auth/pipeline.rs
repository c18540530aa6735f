//! The authorization pipeline (§4.1): nine ordered checks, evaluated in a
//! strict sequence that short-circuits on the first positive or fatal
//! decision. Any unexpected Redis failure during steps 5–8 is surfaced as
//! `ApiError::TransientRedis` (503), never a panic.

use std::net::IpAddr;

use axum::http::Method;
use riptide_cache::{access_log, cidr, hashing::sha256_hex_prefix, whitelist};
use serde::Deserialize;
use tracing::warn;

use crate::auth::token::verify_token;
use crate::browser_class;
use crate::errors::ApiError;
use crate::state::AppState;

/// Token query-parameters presented with a request (`?uid=&expires=&token=`).
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TokenParams {
    pub uid: Option<String>,
    pub expires: Option<String>,
    pub token: Option<String>,
}

/// Everything the pipeline needs to know about one inbound request.
pub struct AuthRequest<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub client_ip: IpAddr,
    pub user_agent: &'a str,
    pub token: TokenParams,
}

/// A positive authorization decision.
pub struct Allowed {
    pub uid: String,
    pub session_id: String,
}

/// The pipeline's terminal, non-error outcome.
pub enum AuthOutcome {
    Allow(Allowed),
    Redirect(String),
}

/// Run the nine-step pipeline against `req`.
pub async fn authorize(state: &AppState, req: AuthRequest<'_>) -> Result<AuthOutcome, ApiError> {
    let path = req.path;
    let ip = cidr::canonicalize(req.client_ip);
    let ip_str = ip.to_string();
    let ua_hash = sha256_hex_prefix(req.user_agent, 8);
    let match_key = whitelist::extract_match_key(path);
    let ext = extension_with_dot(path);

    // 1. Fully-allowed extension fast path. No Redis access, synthetic uid.
    if state.config.auth.fully_allowed_extensions.contains(&ext) {
        return Ok(AuthOutcome::Allow(Allowed {
            uid: String::new(),
            session_id: String::new(),
        }));
    }

    // 2. Fixed IP whitelist.
    if !state.config.auth.disable_ip_whitelist && fixed_whitelist_matches(state, ip) {
        return Ok(AuthOutcome::Allow(Allowed {
            uid: String::new(),
            session_id: String::new(),
        }));
    }

    // 3. Safe-key-protect redirect.
    if state.config.auth.safe_key_protect_enabled && path.ends_with("enc.key") {
        let would_allow = would_downstream_allow(state, &req, &ip_str, &ua_hash, &match_key, &ext)
            .await?;
        if would_allow {
            let base = state.config.auth.safe_key_protect_base.trim_end_matches('/');
            let suffix = path.trim_start_matches('/');
            return Ok(AuthOutcome::Redirect(format!("{base}/{suffix}")));
        }
    }

    // 4. HMAC token verification (skipped entirely under the test-mode flag).
    let mut uid = req.token.uid.clone().unwrap_or_default();
    if !state.config.auth.disable_session_validation {
        match (&req.token.uid, &req.token.expires, &req.token.token) {
            (Some(token_uid), Some(expires), Some(token))
                if verify_token(&state.config.auth.secret_key, token_uid, path, expires, token) =>
            {
                uid = token_uid.clone();
            }
            _ => {
                deny(state, &req, &ip_str, "invalid_token").await;
                return Err(ApiError::InvalidToken);
            }
        }
    }

    // 5. Session reuse.
    if !uid.is_empty() {
        let session = state
            .sessions
            .find_by_fingerprint(&uid, &ip_str, req.user_agent, &match_key)
            .await
            .map_err(|e| ApiError::TransientRedis(e.to_string()))?;
        if let Some(session) = session {
            let touched = state
                .sessions
                .touch(&session.session_id)
                .await
                .map_err(|e| ApiError::TransientRedis(e.to_string()))?;
            if let Some(touched) = touched {
                allow_log(state, &req, &ip_str, &uid).await;
                return Ok(AuthOutcome::Allow(Allowed {
                    uid,
                    session_id: touched.session_id,
                }));
            }
        }
    }

    if !state.config.auth.disable_path_protection {
        let ip_pattern = cidr::admin_pattern_string(ip);

        // 6. Dynamic whitelist probe (path-bound).
        let path_bound = state
            .whitelist
            .probe_path_bound(&ip_pattern, &ua_hash, &match_key)
            .await
            .map_err(|e| ApiError::TransientRedis(e.to_string()))?;
        if path_bound {
            return bind_session_and_allow(state, &req, &ip_str, &uid, &match_key).await;
        }

        // 7. Static-file-only whitelist probe.
        if state.config.auth.enable_static_file_ip_only_check
            && state.config.auth.static_file_extensions.contains(&ext)
        {
            let static_match = state
                .whitelist
                .probe_static(&ip_pattern, &ua_hash)
                .await
                .map_err(|e| ApiError::TransientRedis(e.to_string()))?;
            if static_match {
                return bind_session_and_allow(state, &req, &ip_str, &uid, &match_key).await;
            }
        }
    }

    // 8. M3U8 adaptive access counter.
    if path.ends_with(".m3u8") {
        let class = browser_class::classify(req.user_agent);
        let limit = state.config.m3u8_limits.for_class(class);
        let counter_key = if uid.is_empty() { ip_str.clone() } else { uid.clone() };
        let decision = state
            .m3u8_counter
            .record(&counter_key, path, limit.window, limit.max)
            .await
            .map_err(|e| ApiError::TransientRedis(e.to_string()))?;
        if !decision.allowed {
            deny(state, &req, &ip_str, "m3u8_limit_exceeded").await;
            return Err(ApiError::M3u8LimitExceeded);
        }
        return bind_session_and_allow(state, &req, &ip_str, &uid, &match_key).await;
    }

    // 9. Fallback deny.
    deny(state, &req, &ip_str, "not_in_whitelist").await;
    Err(ApiError::NotInWhitelist)
}

async fn bind_session_and_allow(
    state: &AppState,
    req: &AuthRequest<'_>,
    ip_str: &str,
    uid: &str,
    match_key: &str,
) -> Result<AuthOutcome, ApiError> {
    let session = state
        .sessions
        .create(uid, ip_str, req.user_agent, match_key)
        .await
        .map_err(|e| ApiError::TransientRedis(e.to_string()))?;
    allow_log(state, req, ip_str, uid).await;
    Ok(AuthOutcome::Allow(Allowed {
        uid: uid.to_string(),
        session_id: session.session_id,
    }))
}

fn fixed_whitelist_matches(state: &AppState, ip: IpAddr) -> bool {
    state.config.auth.fixed_ip_whitelist.iter().any(|raw| {
        cidr::parse_fixed_entry(raw)
            .map(|network| cidr::matches(ip, network))
            .unwrap_or(false)
    })
}

/// Re-evaluates steps 4–7 read-only, to decide whether the safe-key-protect
/// redirect should fire. Never creates or touches a session, never mutates
/// whitelist state — a probe, not a decision.
async fn would_downstream_allow(
    state: &AppState,
    req: &AuthRequest<'_>,
    ip_str: &str,
    ua_hash: &str,
    match_key: &str,
    ext: &str,
) -> Result<bool, ApiError> {
    if !state.config.auth.disable_session_validation {
        if let (Some(token_uid), Some(expires), Some(token)) =
            (&req.token.uid, &req.token.expires, &req.token.token)
        {
            if verify_token(&state.config.auth.secret_key, token_uid, req.path, expires, token) {
                return Ok(true);
            }
        }
    }

    if let Some(uid) = req.token.uid.as_deref().filter(|u| !u.is_empty()) {
        let session = state
            .sessions
            .find_by_fingerprint(uid, ip_str, req.user_agent, match_key)
            .await
            .map_err(|e| ApiError::TransientRedis(e.to_string()))?;
        if session.is_some() {
            return Ok(true);
        }
    }

    if !state.config.auth.disable_path_protection {
        let ip_pattern = cidr::admin_pattern_string(cidr::canonicalize(req.client_ip));

        if state
            .whitelist
            .probe_path_bound(&ip_pattern, ua_hash, match_key)
            .await
            .map_err(|e| ApiError::TransientRedis(e.to_string()))?
        {
            return Ok(true);
        }

        if state.config.auth.enable_static_file_ip_only_check
            && state.config.auth.static_file_extensions.contains(ext)
            && state
                .whitelist
                .probe_static(&ip_pattern, ua_hash)
                .await
                .map_err(|e| ApiError::TransientRedis(e.to_string()))?
        {
            return Ok(true);
        }
    }

    Ok(false)
}

async fn deny(state: &AppState, req: &AuthRequest<'_>, ip_str: &str, reason: &str) {
    let uid = req.token.uid.clone().filter(|u| !u.is_empty());
    let entry = access_log::new_entry(
        uid,
        ip_str.to_string(),
        req.user_agent.to_string(),
        req.path.to_string(),
        reason,
    );
    if let Err(e) = state.access_log.log_denied(&entry).await {
        warn!(error = %e, reason, "failed to write denied access-log entry");
    }
}

async fn allow_log(state: &AppState, req: &AuthRequest<'_>, ip_str: &str, uid: &str) {
    let entry = access_log::new_entry(
        Some(uid.to_string()).filter(|u| !u.is_empty()),
        ip_str.to_string(),
        req.user_agent.to_string(),
        req.path.to_string(),
        "allowed",
    );
    if let Err(e) = state.access_log.log_recent(&entry).await {
        warn!(error = %e, "failed to write recent access-log entry");
    }
}

fn extension_with_dot(path: &str) -> String {
    format!(".{}", riptide_streaming::headers::extension_of(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_with_dot_handles_no_extension() {
        assert_eq!(extension_with_dot("/a/b/README"), ".unknown");
    }

    #[test]
    fn extension_with_dot_lowercases() {
        assert_eq!(extension_with_dot("/a/B.TS"), ".ts");
    }
}
