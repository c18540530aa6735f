//! `POST /api/whitelist` and `POST /api/static-whitelist` — bearer-protected
//! admin endpoints that seed the dynamic whitelist tables (§4.4, §6.1).

use std::net::IpAddr;

use axum::{extract::State, Json};
use riptide_cache::{cidr, hashing::sha256_hex_prefix, WhitelistEntry};
use serde::Deserialize;

use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddWhitelistRequest {
    pub uid: String,
    pub path: String,
    pub ip: String,
    pub user_agent: String,
}

#[derive(Debug, Deserialize)]
pub struct AddStaticWhitelistRequest {
    pub uid: String,
    pub ip: String,
    pub user_agent: String,
}

pub async fn add_whitelist(
    State(state): State<AppState>,
    Json(body): Json<AddWhitelistRequest>,
) -> Result<Json<WhitelistEntry>, ApiError> {
    let ip = parse_ip(&body.ip)?;
    let ip_pattern = cidr::admin_pattern_string(ip);
    let ua_hash = sha256_hex_prefix(&body.user_agent, 8);

    let entry = state
        .whitelist
        .add_whitelist(&body.uid, &body.path, &ip_pattern, &ua_hash, &body.user_agent)
        .await?;
    Ok(Json(entry))
}

pub async fn add_static_whitelist(
    State(state): State<AppState>,
    Json(body): Json<AddStaticWhitelistRequest>,
) -> Result<Json<WhitelistEntry>, ApiError> {
    let ip = parse_ip(&body.ip)?;
    let ip_pattern = cidr::admin_pattern_string(ip);
    let ua_hash = sha256_hex_prefix(&body.user_agent, 8);

    let entry = state
        .whitelist
        .add_static_whitelist(&body.uid, &ip_pattern, &ua_hash, &body.user_agent)
        .await?;
    Ok(Json(entry))
}

fn parse_ip(raw: &str) -> Result<IpAddr, ApiError> {
    raw.parse().map_err(|_| ApiError::BadRequest {
        detail: format!("'{raw}' is not a valid IP address"),
    })
}
