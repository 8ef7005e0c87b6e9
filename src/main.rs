//! Dashboard proxy server.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────┐
//!                       │                 DASHBOARD PROXY                  │
//!                       │                                                  │
//!   Browser frame       │  ┌─────────┐   ┌──────────┐   ┌──────────────┐   │
//!   ────────────────────┼─▶│  http   │──▶│ identity │──▶│  forwarder   │───┼──▶ Dashboard
//!                       │  │ server  │   │ resolver │   │ path/headers │   │    service
//!                       │  └─────────┘   └──────────┘   │ timeout      │   │
//!   ◀───────────────────┼───────────────────────────────┴──────────────┘◀──┼───
//!                       │                                                  │
//!                       │  config (TOML, hot reload) · observability ·     │
//!                       │  lifecycle (signals, graceful shutdown)          │
//!                       └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use dashboard_proxy::config::{load_or_default, watcher::ConfigWatcher};
use dashboard_proxy::lifecycle::{signals, Shutdown};
use dashboard_proxy::observability::{logging, metrics};
use dashboard_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "dashboard-proxy")]
#[command(about = "Identity-injecting reverse proxy for embedded dashboards", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Watched for changes.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_or_default(args.config.as_deref())?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("dashboard-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        path_prefix = %config.upstream.path_prefix,
        request_timeout_ms = config.upstream.request_timeout_ms,
        static_identity = config.identity.is_some(),
        "Configuration loaded"
    );
    if config.identity.is_none() {
        tracing::warn!("No static identity configured; every proxied request will be rejected with 401");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Hot reload only when a file backs the configuration.
    let (config_updates, _watcher) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?))
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (updates, None)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
