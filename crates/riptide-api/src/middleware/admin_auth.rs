//! Bearer-API-key gate for the admin endpoints (§4.7, §9).
//!
//! Both `Bearer <key>` and a bare `<key>` are accepted in the
//! `Authorization` header — the bare form is historical and logs a
//! deprecation warning on use. An empty configured API key means there is
//! no valid key to compare against, so every request is rejected.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::errors::ApiError;
use crate::state::AppState;

pub async fn require_admin_key(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let configured = &state.config.auth.api_key;
    if configured.is_empty() {
        return Err(ApiError::Unauthorized);
    }

    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let presented = match header.strip_prefix("Bearer ") {
        Some(key) => key,
        None => {
            warn!("admin request used a bare API key instead of the `Bearer <key>` form");
            header
        }
    };

    if !constant_time_eq(presented.as_bytes(), configured.as_bytes()) {
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_rejects_mismatched_length() {
        assert!(!constant_time_eq(b"short", b"longer-value"));
    }

    #[test]
    fn constant_time_eq_accepts_identical() {
        assert!(constant_time_eq(b"same-key", b"same-key"));
    }
}
