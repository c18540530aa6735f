//! Streaming transport: turns an [`Origin`] fetch into a proxied HTTP
//! response, with back-pressure, traffic accounting and active-transfer
//! tracking wired through the byte pump.
//!
//! Back-pressure here is implicit rather than a tunable knob: the body
//! stream this module hands to axum is only polled for its next chunk
//! once the previous one has been written to the client socket, so a slow
//! client naturally stalls the origin read rather than buffering the whole
//! file in memory.

use crate::chunking::chunk_size_for;
use crate::headers::{cache_control_for, extension_of, is_hop_by_hop};
use crate::transfer::TransferRegistry;
use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::response::Response;
use futures::StreamExt;
use riptide_fetch::{Origin, OriginError};
use riptide_types::TrafficRecorder;
use std::sync::Arc;
use thiserror::Error;

/// Failure modes the caller (`riptide-api`'s handler) turns into the
/// uniform `{kind}` error response. Anything not listed here is a
/// successful proxy response (200/206/416 are all built inline).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("origin resource not found")]
    NotFound,
    #[error("requested range not satisfiable")]
    RangeNotSatisfiable { size: u64 },
    #[error("origin unreachable: {0}")]
    Unreachable(String),
    #[error("origin request timed out")]
    Timeout,
    #[error("internal streaming error: {0}")]
    Internal(String),
}

impl From<OriginError> for TransportError {
    fn from(err: OriginError) -> Self {
        match err {
            OriginError::NotFound => TransportError::NotFound,
            // A path that escapes the filesystem root is indistinguishable
            // from the outside from a path that simply doesn't exist.
            OriginError::PathTraversal => TransportError::NotFound,
            OriginError::RangeNotSatisfiable { size } => TransportError::RangeNotSatisfiable { size },
            OriginError::Unreachable(msg) => TransportError::Unreachable(msg),
            OriginError::Timeout => TransportError::Timeout,
            OriginError::Io(msg) => TransportError::Internal(msg),
        }
    }
}

/// One inbound request, already normalized by the auth pipeline: the
/// principal (`uid`) and session have been resolved, the path has been
/// authorized, and the caller just needs bytes pumped to the client.
pub struct ProxyRequest<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub range_header: Option<&'a str>,
    pub uid: &'a str,
    pub ip: &'a str,
    pub session_id: &'a str,
}

/// Wires an [`Origin`] to the HTTP layer: response composition, the
/// in-flight transfer registry, and per-chunk traffic accounting.
#[derive(Clone)]
pub struct StreamingTransport {
    origin: Arc<dyn Origin>,
    recorder: Arc<dyn TrafficRecorder>,
    registry: TransferRegistry,
}

impl StreamingTransport {
    pub fn new(origin: Arc<dyn Origin>, recorder: Arc<dyn TrafficRecorder>, registry: TransferRegistry) -> Self {
        Self { origin, recorder, registry }
    }

    pub fn registry(&self) -> &TransferRegistry {
        &self.registry
    }

    /// Fetch `req.path` from the origin and compose the proxied response.
    ///
    /// The chunk size passed to the origin is chosen before the resource's
    /// size is known — [`chunk_size_for`]'s `None` arm covers exactly this
    /// case. The filesystem backend still gets to pick a size-appropriate
    /// read buffer internally once it has stat'd the file; this is just the
    /// advisory value handed in up front.
    pub async fn proxy(&self, req: ProxyRequest<'_>) -> Result<Response, TransportError> {
        let chunk_size = chunk_size_for(None);
        let origin_resp = self.origin.fetch(req.path, req.range_header, chunk_size).await?;

        let is_head = req.method == Method::HEAD;
        let extension = extension_of(req.path);
        let file_type = if extension == "unknown" { "unknown".to_string() } else { extension };

        let mut builder = Response::builder().status(StatusCode::from_u16(origin_resp.status).unwrap_or(StatusCode::OK));

        for (name, value) in &origin_resp.headers {
            let lower = name.to_ascii_lowercase();
            if is_hop_by_hop(&lower) {
                continue;
            }
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(lower.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                builder = builder.header(name, value);
            }
        }

        if origin_resp.status < 300 {
            builder = builder.header("accept-ranges", "bytes");
        }
        builder = builder.header("cache-control", cache_control_for(req.path));

        if let (Some((start, end)), Some(total)) = (origin_resp.range, origin_resp.total_size) {
            builder = builder.header("content-range", format!("bytes {start}-{end}/{total}"));
            builder = builder.header("content-length", (end - start + 1).to_string());
        } else if let Some(total) = origin_resp.total_size {
            builder = builder.header("content-length", total.to_string());
        }

        if is_head {
            // Drop the body without polling it; the origin's connection or
            // open file handle closes when `origin_resp.body` is dropped here.
            drop(origin_resp.body);
            return builder
                .body(Body::empty())
                .map_err(|err| TransportError::Internal(err.to_string()));
        }

        let handle = self.registry.start(
            req.path.to_string(),
            req.path.to_string(),
            file_type.clone(),
            req.uid.to_string(),
            req.session_id.to_string(),
            req.ip.to_string(),
            origin_resp.total_size,
            origin_resp.range,
        );
        let recorder = self.recorder.clone();
        let uid = req.uid.to_string();
        let ip = req.ip.to_string();
        let session_id = req.session_id.to_string();

        let accounted = origin_resp.body.inspect(move |chunk| {
            match chunk {
                Ok(bytes) => {
                    let n = bytes.len() as u64;
                    handle.record_bytes(n);
                    recorder.record(&uid, n, &file_type, &ip, &session_id);
                }
                Err(_) => handle.mark_error(),
            }
        });

        builder
            .body(Body::from_stream(accounted))
            .map_err(|err| TransportError::Internal(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use riptide_fetch::{OriginBody, OriginResponse};
    use riptide_types::NullTrafficRecorder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubOrigin {
        status: u16,
        total_size: Option<u64>,
        range: Option<(u64, u64)>,
        chunks: Vec<&'static [u8]>,
    }

    #[async_trait]
    impl Origin for StubOrigin {
        async fn fetch(&self, _path: &str, _range: Option<&str>, _chunk_size: usize) -> Result<OriginResponse, OriginError> {
            let chunks: Vec<Result<Bytes, OriginError>> =
                self.chunks.iter().map(|c| Ok(Bytes::from_static(c))).collect();
            let body: OriginBody = Box::pin(futures::stream::iter(chunks));
            Ok(OriginResponse {
                status: self.status,
                headers: vec![("content-type".to_string(), "video/mp2t".to_string())],
                total_size: self.total_size,
                range: self.range,
                body,
            })
        }
    }

    struct CountingRecorder {
        calls: AtomicUsize,
    }

    impl TrafficRecorder for CountingRecorder {
        fn record(&self, _uid: &str, _bytes: u64, _file_type: &str, _ip: &str, _session_id: &str) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn transport(origin: StubOrigin) -> StreamingTransport {
        StreamingTransport::new(Arc::new(origin), Arc::new(NullTrafficRecorder), TransferRegistry::new())
    }

    #[tokio::test]
    async fn full_response_has_accept_ranges_and_cache_control() {
        let t = transport(StubOrigin { status: 200, total_size: Some(10), range: None, chunks: vec![b"0123456789"] });
        let resp = t
            .proxy(ProxyRequest { method: &Method::GET, path: "/seg.ts", range_header: None, uid: "u1", ip: "1.2.3.4", session_id: "s1" })
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("accept-ranges").unwrap(), "bytes");
        assert_eq!(resp.headers().get("cache-control").unwrap(), "public, max-age=600");
        assert_eq!(resp.headers().get("content-length").unwrap(), "10");
    }

    #[tokio::test]
    async fn m3u8_gets_no_store_cache_control() {
        let t = transport(StubOrigin { status: 200, total_size: Some(8), range: None, chunks: vec![b"#EXTM3U\n"] });
        let resp = t
            .proxy(ProxyRequest { method: &Method::GET, path: "/live/index.m3u8", range_header: None, uid: "u1", ip: "1.2.3.4", session_id: "s1" })
            .await
            .unwrap();
        assert_eq!(resp.headers().get("cache-control").unwrap(), "no-cache, no-store, must-revalidate");
    }

    #[tokio::test]
    async fn partial_response_sets_content_range() {
        let t = transport(StubOrigin { status: 206, total_size: Some(1000), range: Some((100, 199)), chunks: vec![&[0u8; 100]] });
        let resp = t
            .proxy(ProxyRequest { method: &Method::GET, path: "/seg.ts", range_header: Some("bytes=100-199"), uid: "u1", ip: "1.2.3.4", session_id: "s1" })
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(resp.headers().get("content-range").unwrap(), "bytes 100-199/1000");
        assert_eq!(resp.headers().get("content-length").unwrap(), "100");
    }

    #[tokio::test]
    async fn head_request_has_no_body_bytes() {
        let t = transport(StubOrigin { status: 200, total_size: Some(10), range: None, chunks: vec![b"0123456789"] });
        let resp = t
            .proxy(ProxyRequest { method: &Method::HEAD, path: "/seg.ts", range_header: None, uid: "u1", ip: "1.2.3.4", session_id: "s1" })
            .await
            .unwrap();
        let body_bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(body_bytes.is_empty());
    }

    #[tokio::test]
    async fn not_found_maps_to_transport_error() {
        struct MissingOrigin;
        #[async_trait]
        impl Origin for MissingOrigin {
            async fn fetch(&self, _p: &str, _r: Option<&str>, _c: usize) -> Result<OriginResponse, OriginError> {
                Err(OriginError::NotFound)
            }
        }
        let t = StreamingTransport::new(Arc::new(MissingOrigin), Arc::new(NullTrafficRecorder), TransferRegistry::new());
        let err = t
            .proxy(ProxyRequest { method: &Method::GET, path: "/missing.ts", range_header: None, uid: "u1", ip: "1.2.3.4", session_id: "s1" })
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NotFound));
    }

    #[tokio::test]
    async fn transfer_marked_completed_after_stream_is_fully_consumed() {
        let registry = TransferRegistry::new();
        let t = StreamingTransport::new(
            Arc::new(StubOrigin { status: 200, total_size: Some(5), range: None, chunks: vec![b"hello"] }),
            Arc::new(NullTrafficRecorder),
            registry.clone(),
        );
        let resp = t
            .proxy(ProxyRequest { method: &Method::GET, path: "/seg.ts", range_header: None, uid: "u1", ip: "1.2.3.4", session_id: "s1" })
            .await
            .unwrap();
        assert_eq!(registry.len(), 1);
        let _ = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        // The entry lingers (terminal) rather than vanishing the instant the
        // stream drains; the sweep loop reaps it later.
        assert_eq!(registry.len(), 1);
        let snap = registry.snapshot();
        assert_eq!(snap[0].status, crate::TransferStatus::Completed);
    }

    #[tokio::test]
    async fn traffic_recorder_is_invoked_per_chunk() {
        let recorder = Arc::new(CountingRecorder { calls: AtomicUsize::new(0) });
        let t = StreamingTransport::new(
            Arc::new(StubOrigin { status: 200, total_size: Some(6), range: None, chunks: vec![b"ab", b"cd", b"ef"] }),
            recorder.clone(),
            TransferRegistry::new(),
        );
        let resp = t
            .proxy(ProxyRequest { method: &Method::GET, path: "/seg.ts", range_header: None, uid: "u1", ip: "1.2.3.4", session_id: "s1" })
            .await
            .unwrap();
        let _ = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 3);
    }
}
