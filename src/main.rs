//! Advocate Cache - ops server for the advocate directory cache
//!
//! Connects the cache, optionally runs the pressure monitor and serves the
//! ops API until interrupted.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use advocate_cache::{create_router, spawn_pressure_monitor, AppState, Config};

/// Main entry point for the cache ops server.
///
/// # Startup Sequence
/// 1. Load `.env` and initialize tracing
/// 2. Load configuration from environment variables
/// 3. Build the cache client and connect eagerly
/// 4. Start the pressure monitor when an interval is configured
/// 5. Serve the ops API until Ctrl+C/SIGTERM
/// 6. Stop the monitor and close the cache connection
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "advocate_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting advocate cache");

    let config = Config::from_env();
    info!(
        namespace = %config.namespace,
        version = %config.key_version,
        port = config.server_port,
        environment = ?config.environment,
        "Configuration loaded"
    );
    if config.redis_url.is_none() {
        warn!("REDIS_URL not set, caching disabled");
    }

    let state = AppState::from_config(&config).await;
    let client = state.client().clone();

    let monitor = (config.pressure_check_interval > 0).then(|| {
        spawn_pressure_monitor(
            state.analytics.clone(),
            config.pressure_check_interval,
            config.memory_threshold_percent,
        )
    });

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(monitor) = monitor {
        monitor.abort();
        warn!("Pressure monitor aborted");
    }
    client.shutdown().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
