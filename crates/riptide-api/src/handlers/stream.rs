//! The catch-all proxy route: `GET|HEAD /{path}` (§6.1, §4.1, §4.5).
//!
//! Runs the authorization pipeline, then — on an `Allow` decision — hands
//! the request to [`riptide_streaming::StreamingTransport`] to compose the
//! actual response. A `Redirect` decision (the `enc.key` safe-key-protect
//! path) never touches the origin at all.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
};
use riptide_streaming::ProxyRequest;

use crate::auth::{authorize, AuthOutcome, AuthRequest, TokenParams};
use crate::errors::ApiError;
use crate::state::AppState;

pub async fn proxy(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    method: Method,
    headers: HeaderMap,
    Query(token): Query<TokenParams>,
    request: axum::extract::Request,
) -> Result<Response, ApiError> {
    let path = request.uri().path().to_string();
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let client_ip = client_ip(&headers, addr);
    let range_header = headers
        .get(axum::http::header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let auth_req = AuthRequest {
        method: &method,
        path: &path,
        client_ip,
        user_agent: &user_agent,
        token,
    };

    match authorize(&state, auth_req).await? {
        // §4.1 step 3 mandates exactly HTTP 302; axum's `Redirect` helper
        // only offers 303/307/308, none of which match, so this builds the
        // response by hand.
        AuthOutcome::Redirect(location) => Ok((
            StatusCode::FOUND,
            [(axum::http::header::LOCATION, location)],
        )
            .into_response()),
        AuthOutcome::Allow(allowed) => {
            let ip_string = client_ip.to_string();
            let proxy_req = ProxyRequest {
                method: &method,
                path: &path,
                range_header: range_header.as_deref(),
                uid: &allowed.uid,
                ip: &ip_string,
                session_id: &allowed.session_id,
            };
            Ok(state.transport.proxy(proxy_req).await?)
        }
    }
}

/// Trust `X-Forwarded-For`'s first hop only when the request actually came
/// through a proxy layer that sets it; otherwise fall back to the socket's
/// own peer address. This mirrors the teacher's reverse-proxy deployment
/// model, where the load balancer is the only thing allowed to set it.
fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> IpAddr {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(addr.ip())
}
