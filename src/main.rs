//! CORS cache proxy.
//!
//! Forwards browser requests to an API that sends no CORS headers, adds the
//! headers, and caches successful GET and POST responses.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────────┐
//!                      │                     CORS CACHE PROXY                      │
//!  Browser request     │  ┌─────────┐   ┌─────────────┐   ┌──────────────────┐    │
//!  ────────────────────┼─▶│  http   │──▶│  dispatch   │──▶│   orchestrator   │    │
//!                      │  │ server  │   │ by method   │   │ key → lookup     │    │
//!                      │  └─────────┘   └──────┬──────┘   └────┬────────┬────┘    │
//!                      │                  OPTIONS              │ hit    │ miss    │
//!                      │                       ▼               │        ▼         │
//!                      │                ┌─────────────┐        │  ┌───────────┐   │   ┌──────────┐
//!                      │                │ cors        │        │  │ forwarder │───┼──▶│ upstream │
//!                      │                │ preflight   │        │  └─────┬─────┘   │   │   API    │
//!                      │                └─────────────┘        │        ▼         │   └──────────┘
//!                      │                                       │  ┌───────────┐   │
//!                      │                                       │  │normalizer │   │
//!                      │                                       │  └─────┬─────┘   │
//!                      │                                       │        ├──▶ background put
//!  Browser response    │                                       ▼        ▼         │
//!  ◀───────────────────┼──────────────────────────────── cors decorate            │
//!                      └──────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use cors_cache_proxy::config::{load_config, ProxyConfig};
use cors_cache_proxy::observability::{logging, metrics};
use cors_cache_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "cors-cache-proxy")]
#[command(about = "CORS-adding caching proxy for a third-party API", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    logging::init(&config.observability)?;
    tracing::info!("cors-cache-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        edge_max_age_secs = config.cache.edge_max_age_secs,
        cache_enabled = config.cache.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
