//! The proxy's client-facing error surface.
//!
//! Every variant maps onto one entry of the abstract error-kind table: an
//! HTTP status and a `kind` string the client sees, nothing more. Full
//! detail (the upstream error, the Redis failure, the offending path) is
//! logged server-side only — `bad_request` is the sole exception, which
//! carries a `detail` string safe to hand back to the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use riptide_streaming::TransportError;
use riptide_types::RiptideError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// The proxy's error surface, one variant per entry of the error-kind table.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Step 4 of the authorization pipeline rejected the presented token.
    #[error("invalid token")]
    InvalidToken,

    /// The request matched no whitelist entry and no fast path.
    #[error("not in whitelist")]
    NotInWhitelist,

    /// The m3u8 adaptive counter denied this access.
    #[error("m3u8 access limit exceeded")]
    M3u8LimitExceeded,

    /// The origin has no such resource.
    #[error("origin resource not found")]
    OriginNotFound,

    /// The origin was unreachable, timed out, or failed unexpectedly.
    #[error("origin error: {0}")]
    OriginError(String),

    /// A Redis call failed transiently; the pipeline did not crash but could
    /// not reach a decision.
    #[error("transient redis failure: {0}")]
    TransientRedis(String),

    /// `Range` named a window outside `[0, size)`.
    #[error("range not satisfiable")]
    RangeNotSatisfiable {
        /// Total resource size, echoed in `Content-Range: bytes */size`.
        size: u64,
    },

    /// The route exists but not for this HTTP method.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// The request itself was malformed, independent of authorization.
    #[error("bad request: {detail}")]
    BadRequest {
        /// Safe-to-disclose description of what was wrong with the request.
        detail: String,
    },

    /// An admin endpoint was called without a valid bearer API key.
    #[error("unauthorized")]
    Unauthorized,

    /// Anything else unexpected.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidToken => "invalid_token",
            ApiError::NotInWhitelist => "not_in_whitelist",
            ApiError::M3u8LimitExceeded => "m3u8_limit_exceeded",
            ApiError::OriginNotFound => "origin_not_found",
            ApiError::OriginError(_) => "origin_error",
            ApiError::TransientRedis(_) => "transient_redis",
            ApiError::RangeNotSatisfiable { .. } => "range_not_satisfiable",
            ApiError::MethodNotAllowed => "method_not_allowed",
            ApiError::BadRequest { .. } => "bad_request",
            ApiError::Unauthorized => "unauthorized",
            ApiError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidToken | ApiError::NotInWhitelist | ApiError::M3u8LimitExceeded => {
                StatusCode::FORBIDDEN
            }
            ApiError::OriginNotFound => StatusCode::NOT_FOUND,
            ApiError::OriginError(_) => StatusCode::BAD_GATEWAY,
            ApiError::TransientRedis(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match status.as_u16() {
            500..=599 => error!(error = %self, status = status.as_u16(), "request failed"),
            400..=499 => warn!(error = %self, status = status.as_u16(), "request denied"),
            _ => {}
        }

        let body = match &self {
            ApiError::BadRequest { detail } => {
                json!({ "error": self.kind(), "detail": detail })
            }
            _ => json!({ "error": self.kind() }),
        };

        let mut response = (status, Json(body)).into_response();
        if let ApiError::RangeNotSatisfiable { size } = self {
            if let Ok(value) = format!("bytes */{size}").parse() {
                response.headers_mut().insert("content-range", value);
            }
        }
        response
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NotFound => ApiError::OriginNotFound,
            TransportError::RangeNotSatisfiable { size } => ApiError::RangeNotSatisfiable { size },
            TransportError::Unreachable(msg) => ApiError::OriginError(msg),
            TransportError::Timeout => ApiError::OriginError("origin request timed out".to_string()),
            TransportError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<RiptideError> for ApiError {
    fn from(err: RiptideError) -> Self {
        match err {
            RiptideError::Cache(msg) => ApiError::TransientRedis(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
