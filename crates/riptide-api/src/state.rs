//! Shared application state, wired together once at startup and cloned
//! cheaply into every request handler.

use std::sync::Arc;

use async_trait::async_trait;
use riptide_cache::{AccessLogStore, M3u8AccessCounter, RedisHandle, SessionStore, WhitelistStore};
use riptide_config::{AppConfig, BackendMode};
use riptide_fetch::{FilesystemOrigin, HttpOrigin, Origin};
use riptide_monitoring::{
    spawn_long_idle_cleanup_loop, spawn_report_loop, TrafficAccumulator,
};
use riptide_streaming::{spawn_terminal_sweep_loop, StreamingTransport, TransferRegistry};
use riptide_types::{HealthCheck, HealthRegistry, HealthStatus, TrafficRecorder};
use riptide_utils::{HttpClientFactory, HttpConfig, InMemoryHealthRegistry};
use tokio::sync::watch;

/// Everything request handlers need. Cheap to clone: every field is either
/// an `Arc`, or (like `RedisHandle`/the store wrappers) already cheap to
/// clone by design.
#[derive(Clone)]
pub struct AppState {
    /// Process configuration, loaded once at startup.
    pub config: Arc<AppConfig>,
    /// Shared multiplexed Redis connection.
    pub redis: RedisHandle,
    /// Session bind/lookup/renew store.
    pub sessions: SessionStore,
    /// Path-bound and static-file whitelist tables.
    pub whitelist: WhitelistStore,
    /// Adaptive m3u8 playlist access counter.
    pub m3u8_counter: M3u8AccessCounter,
    /// Bounded denied/recent access-log ring buffers.
    pub access_log: AccessLogStore,
    /// Origin-agnostic byte pump with Range support and the transfer registry.
    pub transport: Arc<StreamingTransport>,
    /// Two-tier traffic accounting engine.
    pub traffic: Arc<TrafficAccumulator>,
    /// Liveness/readiness checks surfaced at `/health`.
    pub health: Arc<InMemoryHealthRegistry>,
    /// Shared shutdown signal; `main` sends `true` on SIGTERM/Ctrl+C.
    pub shutdown: watch::Sender<bool>,
}

impl AppState {
    /// Build the full dependency graph: Redis, the selected origin, the
    /// traffic accumulator and its background loops, and the health
    /// registry. Spawns the report, long-idle-cleanup, and terminal-sweep
    /// loops, all fed from one `watch::channel`.
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let redis = RedisHandle::connect(&config.redis.url()).await?;

        let sessions = SessionStore::new(redis.clone(), config.auth.session_ttl);
        let whitelist = WhitelistStore::new(
            redis.clone(),
            config.auth.ip_access_ttl,
            config.auth.max_paths_per_entry,
            config.auth.max_ua_ip_pairs_per_uid,
        );
        let m3u8_counter = M3u8AccessCounter::new(redis.clone());
        let access_log = AccessLogStore::new(redis.clone(), config.access_log_capacity);

        let origin: Arc<dyn Origin> = match config.backend.mode {
            BackendMode::Http => Arc::new(HttpOrigin::new(
                &config.backend,
                config.http_pool.total_timeout.as_millis() as u64,
                config.http_pool.connect_timeout.as_millis() as u64,
            )?),
            BackendMode::Filesystem => {
                let root = config.backend.filesystem_root.clone().ok_or_else(|| {
                    anyhow::anyhow!("BACKEND_FILESYSTEM_ROOT is required when BACKEND_MODE=filesystem")
                })?;
                Arc::new(FilesystemOrigin::new(root)?)
            }
        };

        let traffic = Arc::new(TrafficAccumulator::new(
            config.traffic.min_bytes_threshold,
            config.traffic.accumulator_idle_timeout,
            config.traffic.long_idle_timeout,
        ));

        let transport = Arc::new(StreamingTransport::new(
            origin,
            traffic.clone() as Arc<dyn TrafficRecorder>,
            TransferRegistry::new(),
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        if config.traffic.enabled {
            match config.traffic.report_url.clone() {
                Some(report_url) => {
                    let client = HttpClientFactory::create(HttpConfig {
                        timeout_ms: config.http_pool.total_timeout.as_millis() as u64,
                        connect_timeout_ms: config.http_pool.connect_timeout.as_millis() as u64,
                        ..Default::default()
                    })?;
                    spawn_report_loop(
                        traffic.clone(),
                        client,
                        report_url,
                        config.traffic.api_key.clone(),
                        config.traffic.report_interval,
                        shutdown_rx.clone(),
                    );
                }
                None => {
                    tracing::warn!(
                        "traffic accounting is enabled but TRAFFIC_REPORT_URL is unset; \
                         Tier B records will only ever be dropped by long-idle cleanup"
                    );
                }
            }
            spawn_long_idle_cleanup_loop(traffic.clone(), shutdown_rx.clone());
        }

        spawn_terminal_sweep_loop(transport.registry().clone(), shutdown_rx.clone());

        let mut health = InMemoryHealthRegistry::new();
        health
            .register(Arc::new(RedisHealthCheck {
                redis: redis.clone(),
            }))
            .await;

        Ok(Self {
            config: Arc::new(config),
            redis,
            sessions,
            whitelist,
            m3u8_counter,
            access_log,
            transport,
            traffic,
            health: Arc::new(health),
            shutdown: shutdown_tx,
        })
    }
}

/// Probes Redis with a `PING` on every `/health` poll.
struct RedisHealthCheck {
    redis: RedisHandle,
}

#[async_trait]
impl HealthCheck for RedisHealthCheck {
    async fn check(&self) -> riptide_types::Result<HealthStatus> {
        match self.redis.ping().await {
            Ok(true) => Ok(HealthStatus::Healthy),
            Ok(false) => Ok(HealthStatus::Unhealthy {
                error: "redis PING returned an unexpected reply".to_string(),
            }),
            Err(e) => Ok(HealthStatus::Unhealthy {
                error: e.to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "redis"
    }

    fn description(&self) -> Option<&str> {
        Some("Redis connectivity (PING)")
    }
}
