//! Registry of in-flight proxy transfers, backing the `/active-transfers`
//! admin endpoint.
//!
//! Writes happen once per transfer (on start, on each progress tick, on
//! finish) and are O(1) `DashMap` operations; the admin endpoint's
//! `snapshot` is the only O(N) path, and it's off the byte-pump hot loop.
//!
//! A transfer is not removed the instant its handle drops: it is marked
//! terminal and kept around for [`TERMINAL_RETENTION`] so the monitor UI's
//! 5s poll cycle can observe the final state before it disappears. A
//! background sweep ([`spawn_terminal_sweep_loop`]) evicts anything that has
//! been terminal longer than that, mirroring the periodic-sweep shape
//! `riptide-monitoring`'s traffic-accumulator cleanup loops use.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// How long a terminal transfer lingers in the registry before eviction.
pub const TERMINAL_RETENTION: Duration = Duration::from_secs(5);

const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

const NOT_TERMINAL: u64 = u64::MAX;
const NOT_RECORDED: u64 = u64::MAX;

/// Terminal/in-flight state of a tracked transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Active,
    Completed,
    Error,
    Disconnected,
}

impl TransferStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => TransferStatus::Completed,
            2 => TransferStatus::Error,
            3 => TransferStatus::Disconnected,
            _ => TransferStatus::Active,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            TransferStatus::Active => 0,
            TransferStatus::Completed => 1,
            TransferStatus::Error => 2,
            TransferStatus::Disconnected => 3,
        }
    }
}

/// A single proxy transfer, tracked from the moment the origin responds
/// until the last byte is written to the client (or the transfer fails).
pub struct ActiveTransfer {
    pub id: Uuid,
    pub path: String,
    pub full_path: String,
    pub file_type: String,
    pub uid: String,
    pub session_id: String,
    pub ip: String,
    pub total_size: Option<u64>,
    pub range: Option<(u64, u64)>,
    bytes_sent: AtomicU64,
    status: AtomicU8,
    /// Millis since `started_at` when the first chunk was written, or
    /// [`NOT_RECORDED`] if no chunk has been written yet.
    first_byte_latency_ms: AtomicU64,
    /// Millis since `started_at` when the transfer became terminal, or
    /// [`NOT_TERMINAL`] while still active.
    terminal_at_ms: AtomicU64,
    started_at: Instant,
    started_at_wall: chrono::DateTime<chrono::Utc>,
}

impl ActiveTransfer {
    #[allow(clippy::too_many_arguments)]
    fn new(
        path: String,
        full_path: String,
        file_type: String,
        uid: String,
        session_id: String,
        ip: String,
        total_size: Option<u64>,
        range: Option<(u64, u64)>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            path,
            full_path,
            file_type,
            uid,
            session_id,
            ip,
            total_size,
            range,
            bytes_sent: AtomicU64::new(0),
            status: AtomicU8::new(TransferStatus::Active.as_u8()),
            first_byte_latency_ms: AtomicU64::new(NOT_RECORDED),
            terminal_at_ms: AtomicU64::new(NOT_TERMINAL),
            started_at: Instant::now(),
            started_at_wall: chrono::Utc::now(),
        }
    }

    fn add_bytes(&self, n: u64) {
        if n > 0 {
            self.first_byte_latency_ms
                .compare_exchange(
                    NOT_RECORDED,
                    self.started_at.elapsed().as_millis() as u64,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
                .ok();
        }
        self.bytes_sent.fetch_add(n, Ordering::Relaxed);
    }

    fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    fn status(&self) -> TransferStatus {
        TransferStatus::from_u8(self.status.load(Ordering::Relaxed))
    }

    fn mark_terminal(&self, status: TransferStatus) {
        // First writer wins: a transfer is marked terminal exactly once.
        if self
            .status
            .compare_exchange(
                TransferStatus::Active.as_u8(),
                status.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
        {
            self.terminal_at_ms
                .store(self.started_at.elapsed().as_millis() as u64, Ordering::SeqCst);
        }
    }

    fn terminal_for(&self) -> Option<Duration> {
        let at = self.terminal_at_ms.load(Ordering::SeqCst);
        if at == NOT_TERMINAL {
            return None;
        }
        Some(self.started_at.elapsed().saturating_sub(Duration::from_millis(at)))
    }
}

/// JSON-serializable snapshot of one [`ActiveTransfer`] at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct TransferSnapshot {
    pub id: Uuid,
    pub path: String,
    pub full_path: String,
    pub file_type: String,
    pub uid: String,
    pub session_id: String,
    pub ip: String,
    pub total_size: Option<u64>,
    pub range: Option<(u64, u64)>,
    pub bytes_sent: u64,
    pub speed_bps: f64,
    pub progress_percent: Option<f64>,
    pub status: TransferStatus,
    pub first_byte_latency_ms: Option<u64>,
    pub elapsed_ms: u64,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// Concurrent map of in-flight transfers, keyed by transfer id.
#[derive(Default, Clone)]
pub struct TransferRegistry {
    inner: Arc<DashMap<Uuid, Arc<ActiveTransfer>>>,
}

/// RAII handle returned by [`TransferRegistry::start`]. Marks the transfer
/// terminal when the pump loop drops it; the entry itself is reaped later by
/// [`spawn_terminal_sweep_loop`], not by this drop.
pub struct TransferHandle {
    registry: TransferRegistry,
    transfer: Arc<ActiveTransfer>,
}

impl TransferHandle {
    pub fn id(&self) -> Uuid {
        self.transfer.id
    }

    pub fn record_bytes(&self, n: u64) {
        self.transfer.add_bytes(n);
    }

    pub fn bytes_sent(&self) -> u64 {
        self.transfer.bytes_sent()
    }

    pub fn elapsed(&self) -> Duration {
        self.transfer.started_at.elapsed()
    }

    /// Mark the transfer as having failed mid-stream (an `Err` chunk from
    /// the origin, or a write failure bubbled up from the caller).
    pub fn mark_error(&self) {
        self.transfer.mark_terminal(TransferStatus::Error);
    }

    /// Mark the transfer as cut off by the client before completion.
    pub fn mark_disconnected(&self) {
        self.transfer.mark_terminal(TransferStatus::Disconnected);
    }

    /// Mark the transfer as having completed successfully.
    pub fn mark_completed(&self) {
        self.transfer.mark_terminal(TransferStatus::Completed);
    }
}

impl Drop for TransferHandle {
    fn drop(&mut self) {
        // A drop with no explicit terminal mark means the stream future was
        // cancelled (client disconnect) before `mark_completed` ran, or ran
        // short of the advertised size; a drop where the full size was
        // delivered is patched up to `Completed`. Either way the entry stays
        // in the map, terminal, for the sweep loop to reap.
        if self.transfer.status() == TransferStatus::Active {
            let delivered_all = match self.transfer.total_size {
                Some(total) => self.transfer.bytes_sent() >= total,
                None => true,
            };
            self.transfer.mark_terminal(if delivered_all {
                TransferStatus::Completed
            } else {
                TransferStatus::Disconnected
            });
        }
    }
}

impl TransferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new transfer and return the handle the pump loop drives.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        &self,
        path: String,
        full_path: String,
        file_type: String,
        uid: String,
        session_id: String,
        ip: String,
        total_size: Option<u64>,
        range: Option<(u64, u64)>,
    ) -> TransferHandle {
        let transfer = Arc::new(ActiveTransfer::new(
            path, full_path, file_type, uid, session_id, ip, total_size, range,
        ));
        self.inner.insert(transfer.id, transfer.clone());
        TransferHandle {
            registry: self.clone(),
            transfer,
        }
    }

    /// O(N) snapshot of every transfer currently tracked (active or recently terminal).
    pub fn snapshot(&self) -> Vec<TransferSnapshot> {
        self.inner
            .iter()
            .map(|entry| {
                let t = entry.value();
                let bytes_sent = t.bytes_sent();
                let elapsed = t.started_at.elapsed();
                let speed_bps = if elapsed.as_secs_f64() > 0.0 {
                    bytes_sent as f64 / elapsed.as_secs_f64()
                } else {
                    0.0
                };
                let progress_percent = t
                    .total_size
                    .filter(|&total| total > 0)
                    .map(|total| (bytes_sent as f64 / total as f64) * 100.0);
                let first_byte_latency_ms = match t.first_byte_latency_ms.load(Ordering::SeqCst) {
                    NOT_RECORDED => None,
                    ms => Some(ms),
                };
                TransferSnapshot {
                    id: t.id,
                    path: t.path.clone(),
                    full_path: t.full_path.clone(),
                    file_type: t.file_type.clone(),
                    uid: t.uid.clone(),
                    session_id: t.session_id.clone(),
                    ip: t.ip.clone(),
                    total_size: t.total_size,
                    range: t.range,
                    bytes_sent,
                    speed_bps,
                    progress_percent,
                    status: t.status(),
                    first_byte_latency_ms,
                    elapsed_ms: elapsed.as_millis() as u64,
                    started_at: t.started_at_wall,
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Remove every entry that has been terminal for at least [`TERMINAL_RETENTION`].
    fn reap_terminal(&self) {
        self.inner.retain(|_, transfer| match transfer.terminal_for() {
            Some(age) => age < TERMINAL_RETENTION,
            None => true,
        });
    }
}

/// Spawn the background sweep that reaps transfers terminal for longer than
/// [`TERMINAL_RETENTION`]. Exits once `shutdown` fires.
pub fn spawn_terminal_sweep_loop(
    registry: TransferRegistry,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    registry.reap_terminal();
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(
        registry: &TransferRegistry,
        path: &str,
        uid: &str,
        ip: &str,
        total_size: Option<u64>,
    ) -> TransferHandle {
        registry.start(
            path.to_string(),
            path.to_string(),
            "ts".to_string(),
            uid.to_string(),
            "s1".to_string(),
            ip.to_string(),
            total_size,
            None,
        )
    }

    #[test]
    fn start_registers_and_tracks_bytes() {
        let registry = TransferRegistry::new();
        assert!(registry.is_empty());
        let handle = start(&registry, "/a.ts", "u1", "1.2.3.4", Some(100));
        handle.record_bytes(40);
        assert_eq!(registry.len(), 1);
        let snap = registry.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].bytes_sent, 40);
        assert_eq!(snap[0].path, "/a.ts");
        assert_eq!(snap[0].progress_percent, Some(40.0));
        assert!(snap[0].first_byte_latency_ms.is_some());
    }

    #[test]
    fn drop_marks_terminal_but_retains_entry() {
        let registry = TransferRegistry::new();
        {
            let handle = start(&registry, "/a.ts", "u1", "1.2.3.4", Some(10));
            handle.record_bytes(10);
        }
        assert_eq!(registry.len(), 1);
        let snap = registry.snapshot();
        assert_eq!(snap[0].status, TransferStatus::Completed);
    }

    #[test]
    fn drop_before_full_delivery_marks_disconnected() {
        let registry = TransferRegistry::new();
        {
            let handle = start(&registry, "/a.ts", "u1", "1.2.3.4", Some(100));
            handle.record_bytes(10);
        }
        let snap = registry.snapshot();
        assert_eq!(snap[0].status, TransferStatus::Disconnected);
    }

    #[test]
    fn explicit_error_mark_is_not_overwritten_by_drop() {
        let registry = TransferRegistry::new();
        {
            let handle = start(&registry, "/a.ts", "u1", "1.2.3.4", None);
            handle.mark_error();
        }
        let snap = registry.snapshot();
        assert_eq!(snap[0].status, TransferStatus::Error);
    }

    #[tokio::test]
    async fn sweep_loop_reaps_old_terminal_entries() {
        let registry = TransferRegistry::new();
        {
            let handle = start(&registry, "/a.ts", "u1", "1.2.3.4", Some(1));
            handle.record_bytes(1);
        }
        assert_eq!(registry.len(), 1);

        let (_tx, rx) = tokio::sync::watch::channel(false);
        let task = spawn_terminal_sweep_loop(registry.clone(), rx);
        tokio::time::sleep(TERMINAL_RETENTION + Duration::from_millis(200)).await;
        assert!(registry.is_empty());
        task.abort();
    }

    #[test]
    fn snapshot_reflects_multiple_concurrent_transfers() {
        let registry = TransferRegistry::new();
        let h1 = start(&registry, "/a.ts", "u1", "1.1.1.1", None);
        let h2 = start(&registry, "/b.ts", "u2", "2.2.2.2", None);
        h1.record_bytes(10);
        h2.record_bytes(20);
        let mut snap = registry.snapshot();
        snap.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].bytes_sent, 10);
        assert_eq!(snap[1].bytes_sent, 20);
    }
}
