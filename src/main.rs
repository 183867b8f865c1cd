//! Offline Cache - an expiring key-value cache for offline-tolerant clients
//!
//! Runs the offline cache as an HTTP service, optionally in front of a REST
//! backend whose reads it serves through the cache.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use offline_cache::api::{create_router, Upstream};
use offline_cache::clock::{Clock, SystemClock};
use offline_cache::storage::{is_valid_slot_name, FileStorage, MemoryStorage, Storage};
use offline_cache::{AppState, Config, ConnectivityMonitor, ManagerOptions, OfflineManager};

/// Main entry point for the offline cache service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open storage and create the offline manager (starts background tasks)
/// 4. Create Axum router with all endpoints
/// 5. Start HTTP server on configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "offline_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Offline Cache service");

    let config = Config::from_env();
    info!(
        "Configuration loaded: port={}, sync_interval={}s, cleanup_interval={}s, storage={}",
        config.server_port,
        config.sync_interval,
        config.cleanup_interval,
        config
            .storage_dir
            .as_ref()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|| "memory".to_string())
    );

    if config.storage_dir.is_some() && !is_valid_slot_name(&config.storage_key) {
        anyhow::bail!(
            "STORAGE_KEY '{}' must only contain ASCII letters, digits, '-' or '_'",
            config.storage_key
        );
    }

    let storage: Arc<dyn Storage> = match &config.storage_dir {
        Some(dir) => Arc::new(
            FileStorage::open(dir)
                .with_context(|| format!("opening storage directory {}", dir.display()))?,
        ),
        None => Arc::new(MemoryStorage::new()),
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let connectivity = ConnectivityMonitor::new(config.start_online, clock.clone());

    let manager = OfflineManager::create(
        &ManagerOptions::from(&config),
        storage,
        clock,
        connectivity,
    );

    let mut state = AppState::new(manager.clone());
    if let Some(url) = &config.upstream_url {
        let ttl = config.default_ttl_ms.map(Duration::from_millis);
        state = state.with_upstream(Upstream::new(url.clone(), ttl));
        info!("Serving {} under /api", url);
    }

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    manager.destroy();
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
