//! HTTP surface for the HLS authenticating reverse proxy.
//!
//! [`build_router`] wires the nine-step authorization pipeline, the proxy
//! transport, and the admin/monitoring surface onto one `axum::Router`. No
//! `CompressionLayer` is applied anywhere in this router: the streaming
//! routes compute `Content-Length` from the origin's own byte count, and
//! re-compressing on the way out would silently corrupt it.

pub mod auth;
pub mod browser_class;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod state;

use std::time::Duration;

use axum::{
    http::{header, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Build the full router over `state`.
pub fn build_router(state: AppState) -> Router {
    let timeout = state.config.http_pool.total_timeout;

    let admin_routes = Router::new()
        .route("/api/whitelist", post(handlers::whitelist::add_whitelist))
        .route(
            "/api/static-whitelist",
            post(handlers::whitelist::add_static_whitelist),
        )
        .route("/api/file/check", post(handlers::file_check::check_file))
        .route(
            "/api/file/check/batch",
            post(handlers::file_check::check_files_batch),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_admin_key,
        ));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/stats", get(handlers::stats::stats))
        .route("/traffic", get(handlers::stats::traffic))
        .route("/monitor", get(handlers::monitor::monitor))
        .route(
            "/active-transfers",
            get(handlers::stats::active_transfers),
        )
        .route("/api/access-logs/denied", get(handlers::access_logs::denied))
        .route("/api/access-logs/recent", get(handlers::access_logs::recent));

    let stream_routes = Router::new().route(
        "/*path",
        get(handlers::stream::proxy).head(handlers::stream::proxy),
    );

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .merge(stream_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(tower_http::timeout::TimeoutLayer::new(timeout))
                .layer(cors_layer()),
        )
        .with_state(state)
}

/// Dynamic CORS for the streaming routes (§4.5, §9): the request `Origin`
/// is echoed back rather than `*`, `Vary: Origin` is added automatically by
/// `AllowOrigin::mirror_request`, and credentials plus the handful of
/// headers an HLS player needs to read off a ranged response are exposed.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::RANGE])
        .expose_headers([
            header::CONTENT_LENGTH,
            header::CONTENT_RANGE,
            header::ACCEPT_RANGES,
            header::CONTENT_TYPE,
        ])
        .max_age(Duration::from_secs(3600))
}
