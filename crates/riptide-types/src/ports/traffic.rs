//! Backend-agnostic traffic accounting sink.
//!
//! The streaming transport reports every chunk it pumps to the client
//! through this port. The accounting engine that implements it must never
//! block the byte pump — ingest is a synchronous, in-memory map mutation,
//! never a network call.

/// Sink for per-request byte accounting.
///
/// `record` is called once per pumped chunk (or once per completed
/// transfer, at the implementation's discretion) from the streaming
/// transport's hot path. Implementations must not perform I/O here.
pub trait TrafficRecorder: Send + Sync {
    /// Record `bytes` transferred for `uid` on `session_id`.
    ///
    /// `file_type` is the lowercased extension without the leading dot
    /// (e.g. `"m3u8"`, `"ts"`), or `"unknown"` when the path has none.
    fn record(&self, uid: &str, bytes: u64, file_type: &str, ip: &str, session_id: &str);
}

/// A [`TrafficRecorder`] that discards everything. Used where no traffic
/// accounting engine is wired up (tests, standalone filesystem serving).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTrafficRecorder;

impl TrafficRecorder for NullTrafficRecorder {
    fn record(&self, _uid: &str, _bytes: u64, _file_type: &str, _ip: &str, _session_id: &str) {}
}
