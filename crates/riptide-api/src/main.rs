use std::net::SocketAddr;

use riptide_api::{build_router, state::AppState};
use riptide_config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _tracing_guard = riptide_monitoring::init_tracing("riptide-api")?;

    let config = AppConfig::from_env();
    let bind_address = config.bind_address.clone();
    let addr: SocketAddr = bind_address.parse()?;

    let state = AppState::new(config).await?;
    let shutdown = state.shutdown.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        bind_address = %addr,
        version = env!("CARGO_PKG_VERSION"),
        "riptide-api listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown))
    .await?;

    tracing::info!("riptide-api shutdown complete");
    Ok(())
}

/// Fans a single shutdown decision out to the background report, long-idle
/// cleanup, and terminal-sweep loops via the `watch` channel `AppState`
/// built at startup, then lets axum itself drain in-flight connections.
async fn shutdown_signal(shutdown: tokio::sync::watch::Sender<bool>) {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal_handler) => {
                signal_handler.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("received SIGTERM, initiating graceful shutdown");
        },
    }

    let _ = shutdown.send(true);
}
