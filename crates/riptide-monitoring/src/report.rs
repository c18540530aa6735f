//! Report loop: periodically ships Tier B off to the configured sink.

use crate::accumulator::{TrafficAccumulator, TrafficRecord};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

#[derive(Debug, Serialize)]
struct ReportPayload<'a> {
    records: &'a [TrafficRecord],
    reporter: &'static str,
    ts: i64,
}

/// Drain Tier B and POST it to `report_url`. On any non-2xx response or
/// transport error, the drained batch is merged back into Tier B so no
/// bytes are lost — only delayed to the next tick.
pub async fn report_once(
    accumulator: &TrafficAccumulator,
    client: &reqwest::Client,
    report_url: &str,
    api_key: Option<&str>,
) {
    let drained = accumulator.drain_tier_b();
    if drained.is_empty() {
        return;
    }
    send_batch(accumulator, client, report_url, api_key, drained).await;
}

async fn send_batch(
    accumulator: &TrafficAccumulator,
    client: &reqwest::Client,
    report_url: &str,
    api_key: Option<&str>,
    drained: Vec<TrafficRecord>,
) {
    let payload = ReportPayload {
        records: &drained,
        reporter: "file-proxy",
        ts: chrono::Utc::now().timestamp(),
    };

    let mut req = client.post(report_url).json(&payload);
    if let Some(key) = api_key {
        req = req.bearer_auth(key);
    }

    match req.send().await {
        Ok(resp) if resp.status().is_success() => {
            debug!(records = drained.len(), "traffic report delivered");
            accumulator.mark_report_success();
        }
        Ok(resp) => {
            warn!(status = %resp.status(), records = drained.len(), "traffic report rejected, requeuing");
            accumulator.mark_report_failure();
            accumulator.requeue_tier_b(drained);
        }
        Err(err) => {
            error!(error = %err, records = drained.len(), "traffic report send failed, requeuing");
            accumulator.mark_report_failure();
            accumulator.requeue_tier_b(drained);
        }
    }
}

/// Spawn the periodic report loop. Exits once `shutdown` fires, after one
/// final best-effort flush.
pub fn spawn_report_loop(
    accumulator: Arc<TrafficAccumulator>,
    client: reqwest::Client,
    report_url: String,
    api_key: Option<String>,
    interval: Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    report_once(&accumulator, &client, &report_url, api_key.as_deref()).await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        let remaining = accumulator.flush();
                        if !remaining.is_empty() {
                            send_batch(&accumulator, &client, &report_url, api_key.as_deref(), remaining).await;
                        }
                        break;
                    }
                }
            }
        }
    })
}
