//! Long-idle cleanup loop: a second, coarser sweep than the opportunistic
//! Tier A scan `TrafficAccumulator::record` runs inline. This one covers
//! both tiers and runs on a fixed wall-clock cadence regardless of ingest
//! volume, so a uid parked in Tier B is still evicted even if nobody else
//! ever calls `record` again.

use crate::accumulator::TrafficAccumulator;
use std::sync::Arc;
use std::time::Duration;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub fn spawn_long_idle_cleanup_loop(
    accumulator: Arc<TrafficAccumulator>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    accumulator.long_idle_cleanup();
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
