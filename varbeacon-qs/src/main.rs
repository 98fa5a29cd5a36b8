//! varbeacon-qs (Query Service) - variant beacon HTTP endpoint
//!
//! Answers allele queries with the detail each remote site's consortia allow.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;
use varbeacon_common::config::load_config;
use varbeacon_qs::{build_router, build_state};

/// Command-line arguments for varbeacon-qs
#[derive(Parser, Debug)]
#[command(name = "varbeacon-qs")]
#[command(about = "Variant beacon query service")]
#[command(version)]
struct Args {
    /// Config file (overrides VARBEACON_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:5740
    #[arg(short, long)]
    bind: Option<String>,

    /// SQLite database path
    #[arg(short, long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(database) = args.database {
        config.database_path = database;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "Starting variant beacon query service (varbeacon-qs) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let state = build_state(&config).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!("varbeacon-qs listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
