//! `GET /api/access-logs/denied` and `GET /api/access-logs/recent` — no
//! authentication, bounded by an optional `?limit=N` query param (§6.1).

use axum::{extract::Query, extract::State, Json};
use riptide_cache::AccessLogEntry;
use serde::Deserialize;

use crate::errors::ApiError;
use crate::state::AppState;

const DEFAULT_LIMIT: isize = 100;

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    limit: Option<isize>,
}

pub async fn denied(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<AccessLogEntry>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    let entries = state.access_log.recent_denied(limit).await?;
    Ok(Json(entries))
}

pub async fn recent(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<AccessLogEntry>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    let entries = state.access_log.recent_allowed(limit).await?;
    Ok(Json(entries))
}
