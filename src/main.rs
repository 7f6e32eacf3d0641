//! League Cache Sweeper
//!
//! Opens the configured stores and keeps them free of stale records until
//! interrupted.

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use league_cache::{spawn_expiry_task, Config, DiskStore, SqlStore};

/// Main entry point for the expiry sweeper.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the disk store, and the relational store if a database is set
/// 4. Start one background sweeper per store
/// 5. Wait for SIGINT/SIGTERM, then abort the sweepers
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "league_cache=info,league_cache_sweeper=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting League cache sweeper");

    let config = Config::from_env().context("invalid configuration")?;
    info!(
        "Configuration loaded: disk_path={}, database={:?}, pool_size={}, sweep_interval={}s, overrides={}",
        config.disk_path.display(),
        config.database,
        config.pool_size,
        config.sweep_interval,
        config.expirations.len()
    );

    let mut handles = Vec::new();

    let disk = DiskStore::open_with(
        &config.disk_path,
        config.expirations.clone(),
        league_cache::clock::system_clock(),
    )
    .with_context(|| format!("cannot open disk store at {}", config.disk_path.display()))?;
    handles.push(spawn_expiry_task(Arc::new(disk), "disk", config.sweep_interval));

    if let Some(database) = &config.database {
        let sql = SqlStore::open_with(
            database,
            config.pool_size,
            config.expirations.clone(),
            league_cache::clock::system_clock(),
        )
        .with_context(|| format!("cannot open database {}", database.display()))?;
        handles.push(spawn_expiry_task(Arc::new(sql), "sql", config.sweep_interval));
    } else {
        info!("No database configured, relational sweeper disabled");
    }

    shutdown_signal(handles).await;
    info!("Sweeper shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then aborts the sweepers.
async fn shutdown_signal(handles: Vec<JoinHandle<()>>) {
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

    for handle in &handles {
        handle.abort();
    }
    warn!("{} sweeper task(s) aborted", handles.len());
}
