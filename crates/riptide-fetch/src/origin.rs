//! Origin abstraction shared by the HTTP and filesystem backends.
//!
//! `Origin` is the seam `riptide-streaming`'s byte pump programs against —
//! it never knows whether bytes are coming off disk or an upstream socket.
//! [`parse_range`] lives here (not in `riptide-streaming`) because the
//! filesystem backend has to resolve a byte range into an actual seek/read
//! itself; the HTTP backend reuses the same function to pre-validate a
//! request before forwarding `Range` to the upstream verbatim.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

/// A stream of body chunks, sized by whatever chunk policy the caller chose.
pub type OriginBody = Pin<Box<dyn Stream<Item = Result<Bytes, OriginError>> + Send>>;

/// Failure modes an `Origin` implementation can surface. These map onto the
/// proxy's `kind` error surface (not the HTTP status directly) — the caller
/// decides the response status.
#[derive(Debug, Error)]
pub enum OriginError {
    /// The resolved path does not exist (filesystem) or the origin returned 404 (HTTP).
    #[error("origin resource not found")]
    NotFound,
    /// `Range` requested a window outside `[0, size)`, or `start > end`.
    #[error("range not satisfiable for size {size}")]
    RangeNotSatisfiable {
        /// Total resource size the range was evaluated against.
        size: u64,
    },
    /// A resolved filesystem path escaped the configured root.
    #[error("path escapes filesystem root")]
    PathTraversal,
    /// Local I/O failure reading from disk.
    #[error("I/O error: {0}")]
    Io(String),
    /// The upstream origin could not be reached, or failed after it accepted the request.
    #[error("origin unreachable: {0}")]
    Unreachable(String),
    /// The origin responded, but the total request duration exceeded the configured timeout.
    #[error("origin request timed out")]
    Timeout,
}

/// The byte range a request resolved to, relative to a known total size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOutcome {
    /// No `Range` header — serve the whole resource.
    Full,
    /// A valid, in-bounds inclusive byte range.
    Satisfiable {
        /// First byte served, inclusive.
        start: u64,
        /// Last byte served, inclusive.
        end: u64,
    },
    /// `Range` was present but malformed or out of bounds.
    NotSatisfiable,
}

/// Parse a `Range: bytes=...` header against a known resource `size`, per
/// RFC 7233 §2.1's three forms. Multiple ranges are deliberately not
/// supported — a `Range` header naming more than one range is treated the
/// same as no `Range` header at all (full content), matching the contract
/// that only single-range requests get partial-content treatment.
pub fn parse_range(header: Option<&str>, size: u64) -> RangeOutcome {
    let Some(header) = header else {
        return RangeOutcome::Full;
    };
    let Some(spec) = header.strip_prefix("bytes=") else {
        return RangeOutcome::Full;
    };
    if spec.contains(',') {
        return RangeOutcome::Full;
    }
    let Some((raw_start, raw_end)) = spec.split_once('-') else {
        return RangeOutcome::NotSatisfiable;
    };

    if size == 0 {
        return RangeOutcome::NotSatisfiable;
    }

    let (start, end) = if raw_start.is_empty() {
        // `bytes=-N`: last N bytes.
        let Ok(n) = raw_end.parse::<u64>() else {
            return RangeOutcome::NotSatisfiable;
        };
        if n == 0 {
            return RangeOutcome::NotSatisfiable;
        }
        let start = size.saturating_sub(n);
        (start, size - 1)
    } else {
        let Ok(start) = raw_start.parse::<u64>() else {
            return RangeOutcome::NotSatisfiable;
        };
        let end = if raw_end.is_empty() {
            size - 1
        } else {
            match raw_end.parse::<u64>() {
                Ok(e) => e.min(size - 1),
                Err(_) => return RangeOutcome::NotSatisfiable,
            }
        };
        (start, end)
    };

    if start > end || start >= size {
        return RangeOutcome::NotSatisfiable;
    }
    RangeOutcome::Satisfiable { start, end }
}

/// One fetch outcome from an origin.
pub struct OriginResponse {
    /// The status the origin actually answered with (HTTP mode) or the
    /// status the filesystem backend computed from [`RangeOutcome`].
    pub status: u16,
    /// Raw response headers, in origin order. The caller strips hop-by-hop
    /// headers and adds proxy-specific ones during response composition.
    pub headers: Vec<(String, String)>,
    /// Total resource size, when known up front.
    pub total_size: Option<u64>,
    /// The inclusive byte range actually being served, if this is a partial response.
    pub range: Option<(u64, u64)>,
    /// The body stream, chunked per the caller's chosen chunk size where the
    /// backend controls chunking (filesystem); HTTP mode passes through the
    /// upstream's own chunk boundaries.
    pub body: OriginBody,
}

/// One incoming request, as the transport layer has already normalized it:
/// an origin-relative path and a raw, unparsed `Range` header value.
pub struct OriginRequest<'a> {
    /// Origin-relative path (already percent-decoded, leading `/` included).
    pub path: &'a str,
    /// Raw `Range` header value, if the client sent one.
    pub range_header: Option<&'a str>,
    /// Read/transfer chunk size selected by the caller's chunking policy.
    pub chunk_size: usize,
}

/// A source of bytes the streaming transport can pull from without knowing
/// whether they come off disk or an upstream socket.
#[async_trait]
pub trait Origin: Send + Sync {
    /// Fetch `path`, honoring `range_header` if present. `chunk_size` is
    /// advisory: implementations that control their own chunking (the
    /// filesystem backend) use it as the read buffer size; implementations
    /// that relay another stream's natural chunk boundaries (the HTTP
    /// backend) ignore it.
    async fn fetch(
        &self,
        path: &str,
        range_header: Option<&str>,
        chunk_size: usize,
    ) -> Result<OriginResponse, OriginError>;
}
