//! Streaming transport for the HLS proxy.
//!
//! Turns an [`riptide_fetch::Origin`] fetch into a composed HTTP response:
//! header stripping, `Cache-Control`/`Accept-Ranges` policy, the in-flight
//! [`transfer::TransferRegistry`], and per-chunk traffic accounting via
//! [`riptide_types::TrafficRecorder`]. CORS and compression are deliberately
//! not this crate's concern — CORS is a router-level `tower_http` layer and
//! compression is never applied at all, since it would break the
//! `Content-Length` this module computes from the origin's own byte count.

pub mod chunking;
pub mod headers;
pub mod transfer;
pub mod transport;

pub use chunking::chunk_size_for;
pub use transfer::{
    spawn_terminal_sweep_loop, ActiveTransfer, TransferHandle, TransferRegistry, TransferSnapshot,
    TransferStatus, TERMINAL_RETENTION,
};
pub use transport::{ProxyRequest, StreamingTransport, TransportError};
