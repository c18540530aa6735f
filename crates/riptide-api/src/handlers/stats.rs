//! `GET /stats` and `GET /traffic` — no authentication (§6.1, §4.7).

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn stats(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "active_transfers": state.transport.registry().len(),
        "redis_pool_size": state.config.redis.pool_size,
        "http_pool": {
            "connector_limit": state.config.http_pool.connector_limit,
            "per_host": state.config.http_pool.per_host,
        },
        "traffic": state.traffic.status(),
    }))
}

pub async fn traffic(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.traffic.status()))
}

pub async fn active_transfers(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.transport.registry().snapshot()))
}
