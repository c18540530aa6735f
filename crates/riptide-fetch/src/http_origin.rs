//! Upstream HTTP(S) origin.
//!
//! Forwards the inbound `Range` header verbatim and relays whatever status,
//! headers and body the upstream answers with — this backend never computes
//! its own `Content-Range`, unlike [`crate::filesystem_origin`]. Response
//! composition (header stripping, `Cache-Control`, CORS) happens one layer
//! up in `riptide-streaming`; this module only decides whether to fail fast
//! via the circuit breaker.

use crate::origin::{Origin, OriginBody, OriginError, OriginResponse};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use riptide_config::BackendConfig;
use riptide_utils::circuit_breaker::{CircuitBreaker, Config as CircuitConfig, RealClock};
use riptide_utils::http::{HttpClientFactory, HttpConfig};
use std::sync::Arc;
use std::time::Duration;

/// Upstream HTTP(S) origin client, gated by a circuit breaker per instance.
///
/// No retry wraps the actual streaming `GET` — retrying a request whose body
/// a client may already be receiving would double-send bytes. The circuit
/// breaker only protects against piling requests onto an upstream that's
/// already down; each individual request either succeeds or fails once.
pub struct HttpOrigin {
    client: Client,
    base: String,
    host_header: Option<String>,
    circuit: Arc<CircuitBreaker>,
}

impl HttpOrigin {
    /// Build the shared client from `backend` and the pool/timeout knobs in
    /// `pool_timeout_ms`/`pool_connect_timeout_ms`.
    pub fn new(
        backend: &BackendConfig,
        pool_timeout_ms: u64,
        pool_connect_timeout_ms: u64,
    ) -> Result<Self, reqwest::Error> {
        let http_config = HttpConfig {
            timeout_ms: pool_timeout_ms,
            connect_timeout_ms: pool_connect_timeout_ms,
            tls_verify: backend.ssl_verify,
            ..HttpConfig::default()
        };
        let client = HttpClientFactory::create(http_config)?;
        let circuit = CircuitBreaker::new(CircuitConfig::default(), Arc::new(RealClock));
        Ok(Self {
            client,
            base: backend.origin_base(),
            host_header: backend.proxy_host_header.clone(),
            circuit,
        })
    }
}

#[async_trait]
impl Origin for HttpOrigin {
    async fn fetch(
        &self,
        path: &str,
        range_header: Option<&str>,
        _chunk_size: usize,
    ) -> Result<OriginResponse, OriginError> {
        let permit = self
            .circuit
            .try_acquire()
            .map_err(|reason| OriginError::Unreachable(reason.to_string()))?;

        let url = format!("{}{}", self.base, path);
        let mut req = self.client.get(&url);
        if let Some(range) = range_header {
            req = req.header(reqwest::header::RANGE, range);
        }
        if let Some(host) = &self.host_header {
            req = req.header(reqwest::header::HOST, host.clone());
        }

        let result = req.send().await;
        let resp = match result {
            Ok(resp) => {
                self.circuit.on_success();
                resp
            }
            Err(err) => {
                self.circuit.on_failure();
                drop(permit);
                return Err(if err.is_timeout() {
                    OriginError::Timeout
                } else {
                    OriginError::Unreachable(err.to_string())
                });
            }
        };
        drop(permit);

        let status = resp.status().as_u16();
        let total_size = resp
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let range = resp
            .headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body: OriginBody = Box::pin(resp.bytes_stream().map(|chunk| {
            chunk.map_err(|err| {
                if err.is_timeout() {
                    OriginError::Timeout
                } else {
                    OriginError::Unreachable(err.to_string())
                }
            })
        }));

        Ok(OriginResponse {
            status,
            headers,
            total_size,
            range,
            body,
        })
    }
}

/// Pull the inclusive byte range out of a `Content-Range: bytes start-end/size` header.
fn parse_content_range_total(header: &str) -> Option<(u64, u64)> {
    let spec = header.strip_prefix("bytes ")?;
    let (range, _total) = spec.split_once('/')?;
    let (start, end) = range.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

/// Constant kept only so callers can tune the upstream connect budget without
/// reaching into `riptide-utils` directly.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_range_parses_window() {
        assert_eq!(
            parse_content_range_total("bytes 1048576-2097151/10485760"),
            Some((1_048_576, 2_097_151))
        );
    }

    #[test]
    fn content_range_rejects_garbage() {
        assert_eq!(parse_content_range_total("not-a-range"), None);
    }
}
