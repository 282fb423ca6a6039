//! Order gateway (v1)
//!
//! HTTP/JSON front end for the order engine, built with Tokio, Axum and Tonic.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                  ORDER GATEWAY                    │
//!                        │                                                   │
//!    HTTP / WebSocket    │  ┌────────┐   ┌──────────┐   ┌───────────────┐   │
//!    ────────────────────┼─▶│  http  │──▶│ gateway  │──▶│    backend    │───┼──▶ Order engine
//!                        │  │ server │   │ classify │   │ gRPC channel  │   │    (gRPC)
//!                        │  └────────┘   └────┬─────┘   └───────────────┘   │
//!                        │                    │                              │
//!                        │                    ▼                              │
//!                        │  ┌─────────────────────────────────────────────┐ │
//!                        │  │  config · observability · lifecycle         │ │
//!                        │  └─────────────────────────────────────────────┘ │
//!                        └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use order_gateway::config::{load_config, Overrides};
use order_gateway::http::HttpServer;
use order_gateway::lifecycle::{build_services, signals, Shutdown};
use order_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "order-gateway")]
#[command(about = "HTTP/JSON gateway for the order engine", long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Order engine host (overrides ORDERENGINE_HOST)
    #[arg(long)]
    backend_host: Option<String>,

    /// Order engine port (overrides ORDERENGINE_PORT)
    #[arg(long)]
    backend_port: Option<u16>,

    /// HTTP listen address (overrides ORDER_GATEWAY_BIND)
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let overrides = Overrides {
        backend_host: args.backend_host,
        backend_port: args.backend_port,
        bind_address: args.bind,
    };
    let config = load_config(args.config.as_deref(), &overrides)?;

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "order-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend_host = %config.backend.host,
        backend_port = config.backend.port,
        deadline_ms = config.backend.deadline_ms,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let services = build_services(&config)?;
    let shutdown = Shutdown::new();

    let metrics_task = services.metrics.map(|endpoint| {
        let rx = shutdown.subscribe();
        tokio::spawn(async move {
            if let Err(err) = metrics::serve(endpoint.address, endpoint.handle, rx).await {
                tracing::error!(error = %err, "Metrics endpoint failed");
            }
        })
    });

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    signals::spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(&config, services.gateway.clone());
    let result = server.run(listener, shutdown.subscribe()).await;

    // Stop the metrics endpoint even when the server failed on its own.
    shutdown.trigger();
    if let Some(task) = metrics_task {
        let _ = task.await;
    }
    services.channel.close();

    result?;
    tracing::info!("Shutdown complete");
    Ok(())
}
