//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, request ID)
//! - Bind server to listener
//! - Drain in-flight requests on shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::backend::{BackendStatus, ChannelState};
use crate::config::GatewayConfig;
use crate::gateway::OrderGateway;
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::http::{orders, websocket};

const SERVER_HEADER: &str = concat!("order-gateway/", env!("CARGO_PKG_VERSION"));

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<OrderGateway>,
}

/// HTTP front end of the order gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &GatewayConfig, gateway: Arc<OrderGateway>) -> Self {
        let state = AppState { gateway };
        let router = Self::build_router(config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/v1/orders", post(orders::submit_order))
            .route(
                "/v1/orders/{order_ref}",
                post(orders::order_action).patch(orders::modify_order),
            )
            .route("/v1/orderbook/{symbol}", get(orders::get_order_book))
            .route("/v1/trades/{symbol}", get(websocket::trade_stream))
            .route("/health", get(health))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::SERVER,
                HeaderValue::from_static(SERVER_HEADER),
            ))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    request_id = %request_id,
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    /// The router, for serving on a custom transport.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    backend: BackendStatus,
}

/// `GET /health`: liveness of the gateway and the state of its channel.
///
/// The backend is never called here; the channel is lazy, so "open" says
/// nothing about whether the engine is reachable.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let backend = state.gateway.backend_status();
    let (code, status) = match backend.state {
        ChannelState::Open => (StatusCode::OK, "ok"),
        ChannelState::Closed => (StatusCode::SERVICE_UNAVAILABLE, "degraded"),
    };
    let body = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        backend,
    };
    (code, Json(body))
}
