//! Two-tier traffic accumulator: the ingest side of the accounting engine.
//!
//! Tier A holds per-uid records that haven't yet crossed
//! `min_bytes_threshold`; Tier B holds records that have, and are what the
//! report loop actually ships out. Splitting the tiers means a uid that
//! only ever sends a handful of small range requests never shows up in a
//! report at all — not every byte moved through the proxy is "traffic"
//! worth accounting for upstream.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use riptide_types::TrafficRecorder;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-uid unique-IP/session sets are capped independently of any
/// configuration surface — this bounds a single record's memory footprint
/// regardless of how long a uid stays active between reports.
const MAX_UNIQUE_IPS: usize = 20;
const MAX_UNIQUE_SESSIONS: usize = 10;

/// How many `record()` calls between opportunistic Tier A sweeps.
const MAYBE_CLEANUP_INTERVAL: u64 = 1000;

/// One uid's accumulated traffic, in either tier.
#[derive(Debug, Clone, Serialize)]
pub struct TrafficRecord {
    pub uid: String,
    pub total_bytes: u64,
    pub request_count: u64,
    pub file_types: HashMap<String, u64>,
    pub unique_ips: HashSet<String>,
    pub unique_sessions: HashSet<String>,
    pub start_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl TrafficRecord {
    fn new(uid: &str, now: DateTime<Utc>) -> Self {
        Self {
            uid: uid.to_string(),
            total_bytes: 0,
            request_count: 0,
            file_types: HashMap::new(),
            unique_ips: HashSet::new(),
            unique_sessions: HashSet::new(),
            start_time: now,
            last_activity: now,
        }
    }

    fn apply(&mut self, bytes: u64, file_type: &str, ip: &str, session_id: &str, now: DateTime<Utc>) {
        self.total_bytes += bytes;
        self.request_count += 1;
        *self.file_types.entry(file_type.to_string()).or_insert(0) += bytes;
        if self.unique_ips.len() < MAX_UNIQUE_IPS || self.unique_ips.contains(ip) {
            self.unique_ips.insert(ip.to_string());
        }
        if self.unique_sessions.len() < MAX_UNIQUE_SESSIONS || self.unique_sessions.contains(session_id) {
            self.unique_sessions.insert(session_id.to_string());
        }
        self.last_activity = now;
    }

    /// Merge another record's deltas into this one (Tier A promotion, or a
    /// failed report's drained batch rejoining Tier B).
    fn merge(&mut self, other: &TrafficRecord) {
        self.total_bytes += other.total_bytes;
        self.request_count += other.request_count;
        for (ext, bytes) in &other.file_types {
            *self.file_types.entry(ext.clone()).or_insert(0) += bytes;
        }
        for ip in &other.unique_ips {
            if self.unique_ips.len() < MAX_UNIQUE_IPS {
                self.unique_ips.insert(ip.clone());
            }
        }
        for sid in &other.unique_sessions {
            if self.unique_sessions.len() < MAX_UNIQUE_SESSIONS {
                self.unique_sessions.insert(sid.clone());
            }
        }
        if other.start_time < self.start_time {
            self.start_time = other.start_time;
        }
        if other.last_activity > self.last_activity {
            self.last_activity = other.last_activity;
        }
    }

    fn idle_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_activity
    }
}

/// Snapshot of the engine's internal state, backing `/traffic`.
#[derive(Debug, Clone, Serialize)]
pub struct TrafficEngineStatus {
    pub tier_a_records: usize,
    pub tier_b_records: usize,
    pub reports_sent: u64,
    pub reports_failed: u64,
    pub last_report_at: Option<DateTime<Utc>>,
}

/// The accounting engine's ingest-side state. Cheap to clone (it's an
/// `Arc`-free collection of already-`Arc`-backed maps internally via
/// `DashMap`, safe to share behind a single `Arc<TrafficAccumulator>`).
pub struct TrafficAccumulator {
    min_bytes_threshold: u64,
    accumulator_idle_timeout: chrono::Duration,
    long_idle_timeout: chrono::Duration,
    tier_a: DashMap<String, TrafficRecord>,
    tier_b: DashMap<String, TrafficRecord>,
    record_calls: AtomicU64,
    reports_sent: AtomicU64,
    reports_failed: AtomicU64,
    last_report_at: std::sync::RwLock<Option<DateTime<Utc>>>,
}

impl TrafficAccumulator {
    pub fn new(min_bytes_threshold: u64, accumulator_idle_timeout: std::time::Duration, long_idle_timeout: std::time::Duration) -> Self {
        Self {
            min_bytes_threshold,
            accumulator_idle_timeout: chrono::Duration::from_std(accumulator_idle_timeout)
                .unwrap_or_else(|_| chrono::Duration::seconds(600)),
            long_idle_timeout: chrono::Duration::from_std(long_idle_timeout)
                .unwrap_or_else(|_| chrono::Duration::seconds(1800)),
            tier_a: DashMap::new(),
            tier_b: DashMap::new(),
            record_calls: AtomicU64::new(0),
            reports_sent: AtomicU64::new(0),
            reports_failed: AtomicU64::new(0),
            last_report_at: std::sync::RwLock::new(None),
        }
    }

    /// Ingest one accounted chunk. Never blocks, never touches the network.
    pub fn record(&self, uid: &str, bytes: u64, file_type: &str, ip: &str, session_id: &str) {
        if uid.is_empty() {
            return;
        }
        let now = Utc::now();

        if let Some(mut existing) = self.tier_b.get_mut(uid) {
            existing.apply(bytes, file_type, ip, session_id, now);
        } else {
            let promote = {
                let mut entry = self
                    .tier_a
                    .entry(uid.to_string())
                    .or_insert_with(|| TrafficRecord::new(uid, now));
                entry.apply(bytes, file_type, ip, session_id, now);
                entry.total_bytes >= self.min_bytes_threshold
            };
            if promote {
                if let Some((_, record)) = self.tier_a.remove(uid) {
                    self.tier_b
                        .entry(uid.to_string())
                        .and_modify(|slot| slot.merge(&record))
                        .or_insert(record);
                }
            }
        }

        let calls = self.record_calls.fetch_add(1, Ordering::Relaxed) + 1;
        if calls % MAYBE_CLEANUP_INTERVAL == 0 {
            self.maybe_cleanup();
        }
    }

    /// Opportunistic Tier A sweep, run roughly every 1000 `record()` calls.
    fn maybe_cleanup(&self) {
        let now = Utc::now();
        self.tier_a
            .retain(|_, record| record.idle_for(now) <= self.accumulator_idle_timeout);
    }

    /// Drop records in either tier that have gone quiet past
    /// `long_idle_timeout`. Run from a 60s background loop, not on the
    /// ingest hot path.
    pub fn long_idle_cleanup(&self) {
        let now = Utc::now();
        self.tier_a.retain(|_, r| r.idle_for(now) <= self.long_idle_timeout);
        self.tier_b.retain(|_, r| r.idle_for(now) <= self.long_idle_timeout);
    }

    /// Atomically drain every Tier B record for the report loop. Ingest
    /// continues to land in Tier B (and promote from Tier A) concurrently —
    /// those new entries simply weren't part of this batch.
    pub fn drain_tier_b(&self) -> Vec<TrafficRecord> {
        let keys: Vec<String> = self.tier_b.iter().map(|e| e.key().clone()).collect();
        keys.into_iter()
            .filter_map(|k| self.tier_b.remove(&k).map(|(_, v)| v))
            .collect()
    }

    /// Reinsert a failed report's batch, merging with anything ingest wrote
    /// to Tier B in the meantime.
    pub fn requeue_tier_b(&self, records: Vec<TrafficRecord>) {
        for record in records {
            self.tier_b
                .entry(record.uid.clone())
                .and_modify(|slot| slot.merge(&record))
                .or_insert(record);
        }
    }

    pub fn mark_report_success(&self) {
        self.reports_sent.fetch_add(1, Ordering::Relaxed);
        *self.last_report_at.write().unwrap_or_else(|e| e.into_inner()) = Some(Utc::now());
    }

    pub fn mark_report_failure(&self) {
        self.reports_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Best-effort flush of both tiers, used on graceful shutdown. Returns
    /// everything that was sitting in Tier B (Tier A records haven't
    /// crossed the reporting threshold and are simply dropped).
    pub fn flush(&self) -> Vec<TrafficRecord> {
        self.drain_tier_b()
    }

    pub fn status(&self) -> TrafficEngineStatus {
        TrafficEngineStatus {
            tier_a_records: self.tier_a.len(),
            tier_b_records: self.tier_b.len(),
            reports_sent: self.reports_sent.load(Ordering::Relaxed),
            reports_failed: self.reports_failed.load(Ordering::Relaxed),
            last_report_at: *self.last_report_at.read().unwrap_or_else(|e| e.into_inner()),
        }
    }
}

impl TrafficRecorder for TrafficAccumulator {
    fn record(&self, uid: &str, bytes: u64, file_type: &str, ip: &str, session_id: &str) {
        TrafficAccumulator::record(self, uid, bytes, file_type, ip, session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn engine() -> TrafficAccumulator {
        TrafficAccumulator::new(1000, Duration::from_secs(600), Duration::from_secs(1800))
    }

    #[test]
    fn empty_uid_is_dropped() {
        let e = engine();
        e.record("", 500, "ts", "1.2.3.4", "s1");
        assert_eq!(e.status().tier_a_records, 0);
        assert_eq!(e.status().tier_b_records, 0);
    }

    #[test]
    fn stays_in_tier_a_below_threshold() {
        let e = engine();
        e.record("user1", 500, "ts", "1.2.3.4", "s1");
        let status = e.status();
        assert_eq!(status.tier_a_records, 1);
        assert_eq!(status.tier_b_records, 0);
    }

    #[test]
    fn promotes_to_tier_b_once_threshold_crossed() {
        let e = engine();
        e.record("user1", 500, "ts", "1.2.3.4", "s1");
        e.record("user1", 600, "ts", "1.2.3.4", "s1");
        let status = e.status();
        assert_eq!(status.tier_a_records, 0);
        assert_eq!(status.tier_b_records, 1);
    }

    #[test]
    fn subsequent_records_update_tier_b_in_place() {
        let e = engine();
        e.record("user1", 1000, "ts", "1.2.3.4", "s1");
        e.record("user1", 50, "m3u8", "5.6.7.8", "s2");
        let drained = e.drain_tier_b();
        assert_eq!(drained.len(), 1);
        let rec = &drained[0];
        assert_eq!(rec.total_bytes, 1050);
        assert_eq!(rec.request_count, 2);
        assert_eq!(rec.file_types.get("ts"), Some(&1000));
        assert_eq!(rec.file_types.get("m3u8"), Some(&50));
        assert_eq!(rec.unique_ips.len(), 2);
    }

    #[test]
    fn unique_ip_cap_is_respected() {
        let e = engine();
        for i in 0..(MAX_UNIQUE_IPS + 10) {
            e.record("user1", 2000, "ts", &format!("10.0.0.{i}"), "s1");
        }
        let drained = e.drain_tier_b();
        assert_eq!(drained[0].unique_ips.len(), MAX_UNIQUE_IPS);
    }

    #[test]
    fn drain_removes_from_tier_b() {
        let e = engine();
        e.record("user1", 2000, "ts", "1.1.1.1", "s1");
        assert_eq!(e.status().tier_b_records, 1);
        let drained = e.drain_tier_b();
        assert_eq!(drained.len(), 1);
        assert_eq!(e.status().tier_b_records, 0);
    }

    #[test]
    fn requeue_merges_with_new_writes() {
        let e = engine();
        e.record("user1", 2000, "ts", "1.1.1.1", "s1");
        let drained = e.drain_tier_b();
        e.record("user1", 500, "ts", "2.2.2.2", "s2");
        e.requeue_tier_b(drained);
        let status = e.status();
        assert_eq!(status.tier_b_records, 1);
        let drained_again = e.drain_tier_b();
        assert_eq!(drained_again[0].total_bytes, 2500);
    }

    #[test]
    fn long_idle_cleanup_drops_stale_records() {
        let e = TrafficAccumulator::new(1000, Duration::from_secs(600), Duration::from_secs(0));
        e.record("user1", 2000, "ts", "1.1.1.1", "s1");
        assert_eq!(e.status().tier_b_records, 1);
        e.long_idle_cleanup();
        assert_eq!(e.status().tier_b_records, 0);
    }
}
