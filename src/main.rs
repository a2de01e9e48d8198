//! Docker Registry v2 Reverse Proxy
//!
//! Exposes several public registries (Docker Hub, Quay, GCR, GHCR, ...) behind
//! one domain. The first label of the request host, or the `ns` query
//! parameter, picks the upstream registry.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────▶ http::server ──▶ routing (context, route table, path)
//!                      │
//!                      ├──▶ security::user_agent ──▶ decoy page
//!                      ├──▶ proxy::landing ──▶ home / redirect / Hub web API
//!                      ├──▶ proxy::token ──▶ auth server (unmodified answer)
//!                      └──▶ proxy::upstream ──▶ registry
//!                                 │
//!     Client Response             ▼
//!     ◀────────── http::response (WWW-Authenticate, Location ──▶ proxy::redirect)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use registry_proxy::config::{load_config, load_from_env};
use registry_proxy::lifecycle::{shutdown_signal, Shutdown};
use registry_proxy::observability::{logging, metrics};
use registry_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "registry-proxy")]
#[command(about = "Docker Registry v2 reverse proxy", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability.log_level);
    tracing::info!("registry-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        default_registry = %config.upstream.default_registry,
        routes = config.upstream.routes.len(),
        header_policy = ?config.security.header_policy,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let server_shutdown = shutdown.subscribe();

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
