//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the metrics registry on the chosen recorder
//! - Open the backend channel (lazily connected)
//! - Assemble the gateway shared by all handlers
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - An unreachable backend is not a startup error
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusHandle};
use thiserror::Error;

use crate::backend::{BackendChannel, BackendError, GrpcBackend};
use crate::config::GatewayConfig;
use crate::gateway::OrderGateway;
use crate::observability::metrics::{GatewayMetrics, PrometheusExporter};

/// Fatal errors while wiring the gateway.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build metrics exporter: {0}")]
    Metrics(#[from] BuildError),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Scrape endpoint to serve once the runtime is up.
pub struct MetricsEndpoint {
    pub address: SocketAddr,
    pub handle: PrometheusHandle,
}

/// Everything `main` needs to serve traffic and shut down cleanly.
pub struct Services {
    pub gateway: Arc<OrderGateway>,
    pub channel: Arc<BackendChannel>,
    pub metrics: Option<MetricsEndpoint>,
}

/// Wire recorder, channel and gateway from a validated config.
pub fn build_services(config: &GatewayConfig) -> Result<Services, StartupError> {
    let (metrics, endpoint) = if config.observability.metrics_enabled {
        let address: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        let exporter = PrometheusExporter::build()?;
        let metrics = GatewayMetrics::register(exporter.recorder());
        let endpoint = MetricsEndpoint {
            address,
            handle: exporter.handle(),
        };
        (metrics, Some(endpoint))
    } else {
        tracing::info!("Metrics disabled");
        (GatewayMetrics::noop(), None)
    };

    let channel = Arc::new(BackendChannel::open(&config.backend)?);

    let backend = Arc::new(GrpcBackend::new(channel.clone()));
    let gateway = Arc::new(OrderGateway::new(
        backend,
        metrics,
        Duration::from_millis(config.backend.deadline_ms),
    ));
    tracing::info!(
        backend = %channel.target(),
        deadline_ms = config.backend.deadline_ms,
        "Gateway assembled"
    );

    Ok(Services {
        gateway,
        channel,
        metrics: endpoint,
    })
}
