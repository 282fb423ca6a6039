//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics per operation (attempts, outcomes, latency)
//! - Register them on an injected recorder at startup
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `order_gateway_<op>_requests_total` (counter): attempts that reached dispatch
//! - `order_gateway_submit_order_{accepted,rejected}_total` (counter): submit outcomes
//! - `order_gateway_{cancel,modify}_order_errors_total` (counter): non-success status
//! - `order_gateway_<op>_backend_failures_total` (counter): transport failures and timeouts
//! - `order_gateway_<op>_duration_seconds` (histogram): backend call latency
//! - `order_gateway_trade_subscriptions_active` (gauge): open trade streams
//!
//! # Design Decisions
//! - Handles are registered once and cloned into the gateway (atomic updates)
//! - Transport failures never touch outcome counters
//! - Histogram buckets tuned for sub-second RPC latencies

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{routing::get, Router};
use metrics::{
    Counter, Gauge, Histogram, Key, KeyName, Level, Metadata, Recorder, SharedString, Unit,
};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::gateway::outcome::Outcome;

/// Latency buckets in seconds.
pub const LATENCY_BUCKETS: [f64; 13] = [
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// The synchronous operations the gateway instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SubmitOrder,
    GetOrderBook,
    CancelOrder,
    ModifyOrder,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::SubmitOrder => "submit_order",
            Operation::GetOrderBook => "get_orderbook",
            Operation::CancelOrder => "cancel_order",
            Operation::ModifyOrder => "modify_order",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registers described metrics on one recorder.
struct Registrar<'a> {
    recorder: &'a dyn Recorder,
    metadata: Metadata<'static>,
}

impl<'a> Registrar<'a> {
    fn new(recorder: &'a dyn Recorder) -> Self {
        Self {
            recorder,
            metadata: Metadata::new(module_path!(), Level::INFO, Some(module_path!())),
        }
    }

    fn counter(&self, name: &'static str, description: &'static str) -> Counter {
        self.recorder.describe_counter(
            KeyName::from_const_str(name),
            Some(Unit::Count),
            SharedString::const_str(description),
        );
        self.recorder
            .register_counter(&Key::from_static_name(name), &self.metadata)
    }

    fn gauge(&self, name: &'static str, description: &'static str) -> Gauge {
        self.recorder.describe_gauge(
            KeyName::from_const_str(name),
            Some(Unit::Count),
            SharedString::const_str(description),
        );
        self.recorder
            .register_gauge(&Key::from_static_name(name), &self.metadata)
    }

    fn histogram(&self, name: &'static str, description: &'static str) -> Histogram {
        self.recorder.describe_histogram(
            KeyName::from_const_str(name),
            Some(Unit::Seconds),
            SharedString::const_str(description),
        );
        self.recorder
            .register_histogram(&Key::from_static_name(name), &self.metadata)
    }
}

/// Counters and latency histogram for one operation kind.
///
/// Counters that do not exist for an operation are `None` (the order book
/// query has no attempt or outcome counters).
#[derive(Clone)]
pub struct OperationMetrics {
    operation: Operation,
    requests: Option<Counter>,
    accepted: Option<Counter>,
    rejected: Option<Counter>,
    backend_failures: Counter,
    duration: Histogram,
}

impl OperationMetrics {
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Count an attempt. Called once the input passed shape validation.
    pub fn record_attempt(&self) {
        if let Some(counter) = &self.requests {
            counter.increment(1);
        }
    }

    /// Count the classified outcome of a completed call.
    pub fn record_outcome(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Accepted => &self.accepted,
            Outcome::Rejected => &self.rejected,
        };
        if let Some(counter) = counter {
            counter.increment(1);
        }
    }

    /// Count a call that never produced a backend response.
    pub fn record_backend_failure(&self) {
        self.backend_failures.increment(1);
    }

    /// Start a latency sample for one dispatch.
    pub fn start_timer(&self) -> LatencyTimer {
        LatencyTimer::start(self.duration.clone())
    }
}

/// Metrics for the trade subscription stream.
#[derive(Clone)]
pub struct StreamMetrics {
    active: Gauge,
    updates: Counter,
}

impl StreamMetrics {
    /// Mark a subscription open until the returned guard is dropped.
    pub fn track(&self) -> SubscriptionGuard {
        self.active.increment(1.0);
        SubscriptionGuard {
            active: self.active.clone(),
        }
    }

    pub fn record_update(&self) {
        self.updates.increment(1);
    }
}

/// Decrements the active subscription gauge on drop.
pub struct SubscriptionGuard {
    active: Gauge,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.active.decrement(1.0);
    }
}

/// All gateway instrumentation, created once and shared by every request.
#[derive(Clone)]
pub struct GatewayMetrics {
    pub submit_order: OperationMetrics,
    pub get_order_book: OperationMetrics,
    pub cancel_order: OperationMetrics,
    pub modify_order: OperationMetrics,
    pub trade_stream: StreamMetrics,
}

impl GatewayMetrics {
    /// Register every gateway metric on `recorder`.
    pub fn register(recorder: &dyn Recorder) -> Self {
        let r = Registrar::new(recorder);

        let submit_order = OperationMetrics {
            operation: Operation::SubmitOrder,
            requests: Some(r.counter(
                "order_gateway_submit_order_requests_total",
                "Submit requests dispatched to the order engine",
            )),
            accepted: Some(r.counter(
                "order_gateway_submit_order_accepted_total",
                "Submits answered with ACCEPTED",
            )),
            rejected: Some(r.counter(
                "order_gateway_submit_order_rejected_total",
                "Submits answered with any other status",
            )),
            backend_failures: r.counter(
                "order_gateway_submit_order_backend_failures_total",
                "Submits that failed at the transport level",
            ),
            duration: r.histogram(
                "order_gateway_submit_order_duration_seconds",
                "SubmitOrder call latency",
            ),
        };

        let get_order_book = OperationMetrics {
            operation: Operation::GetOrderBook,
            requests: None,
            accepted: None,
            rejected: None,
            backend_failures: r.counter(
                "order_gateway_get_orderbook_backend_failures_total",
                "Order book queries that failed at the transport level",
            ),
            duration: r.histogram(
                "order_gateway_get_orderbook_duration_seconds",
                "GetOrderBook call latency",
            ),
        };

        let cancel_order = OperationMetrics {
            operation: Operation::CancelOrder,
            requests: Some(r.counter(
                "order_gateway_cancel_order_requests_total",
                "Cancel requests dispatched to the order engine",
            )),
            accepted: None,
            rejected: Some(r.counter(
                "order_gateway_cancel_order_errors_total",
                "Cancels answered with a status other than CANCELLED",
            )),
            backend_failures: r.counter(
                "order_gateway_cancel_order_backend_failures_total",
                "Cancels that failed at the transport level",
            ),
            duration: r.histogram(
                "order_gateway_cancel_order_duration_seconds",
                "CancelOrder call latency",
            ),
        };

        let modify_order = OperationMetrics {
            operation: Operation::ModifyOrder,
            requests: Some(r.counter(
                "order_gateway_modify_order_requests_total",
                "Modify requests dispatched to the order engine",
            )),
            accepted: None,
            rejected: Some(r.counter(
                "order_gateway_modify_order_errors_total",
                "Modifies answered with a status other than MODIFIED",
            )),
            backend_failures: r.counter(
                "order_gateway_modify_order_backend_failures_total",
                "Modifies that failed at the transport level",
            ),
            duration: r.histogram(
                "order_gateway_modify_order_duration_seconds",
                "ModifyOrder call latency",
            ),
        };

        let trade_stream = StreamMetrics {
            active: r.gauge(
                "order_gateway_trade_subscriptions_active",
                "Open trade stream subscriptions",
            ),
            updates: r.counter(
                "order_gateway_trade_updates_total",
                "Trade updates forwarded to subscribers",
            ),
        };

        Self {
            submit_order,
            get_order_book,
            cancel_order,
            modify_order,
            trade_stream,
        }
    }

    /// Metrics that go nowhere, for when the endpoint is disabled.
    pub fn noop() -> Self {
        Self::register(&metrics::NoopRecorder)
    }
}

/// One latency sample, recorded exactly once.
///
/// The sample is closed by `stop()` or, on any other exit path, by drop.
pub struct LatencyTimer {
    histogram: Option<Histogram>,
    start: Instant,
}

impl LatencyTimer {
    pub fn start(histogram: Histogram) -> Self {
        Self {
            histogram: Some(histogram),
            start: Instant::now(),
        }
    }

    /// Close the sample and return the measured duration.
    pub fn stop(mut self) -> Duration {
        self.finish()
    }

    fn finish(&mut self) -> Duration {
        let elapsed = self.start.elapsed();
        if let Some(histogram) = self.histogram.take() {
            histogram.record(elapsed.as_secs_f64());
        }
        elapsed
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Prometheus recorder and its render handle.
pub struct PrometheusExporter {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl PrometheusExporter {
    pub fn build() -> Result<Self, BuildError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("_duration_seconds".to_string()),
                &LATENCY_BUCKETS,
            )?
            .build_recorder();
        let handle = recorder.handle();
        Ok(Self { recorder, handle })
    }

    pub fn recorder(&self) -> &PrometheusRecorder {
        &self.recorder
    }

    pub fn handle(&self) -> PrometheusHandle {
        self.handle.clone()
    }
}

/// Serve `GET /metrics` until shutdown is signalled.
pub async fn serve(
    addr: SocketAddr,
    handle: PrometheusHandle,
    mut shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(address = %listener.local_addr()?, "Metrics endpoint listening");

    let upkeep_handle = handle.clone();
    let upkeep = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(UPKEEP_INTERVAL);
        loop {
            ticker.tick().await;
            upkeep_handle.run_upkeep();
        }
    });

    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await;

    upkeep.abort();
    tracing::info!("Metrics endpoint stopped");
    result
}
