//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use metrics::{
    Counter, Gauge, Histogram, HistogramFn, Key, KeyName, Metadata, Recorder, SharedString, Unit,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use order_gateway::backend::proto::{
    CancelOrderRequest, CancelOrderResponse, GetOrderBookRequest, GetOrderBookResponse,
    ModifyOrderRequest, ModifyOrderResponse, OrderBookEntry, SubmitOrderRequest,
    SubmitOrderResponse, SubscribeTradesRequest, TradeUpdate,
};
use order_gateway::backend::{
    BackendError, BackendStatus, CallContext, ChannelState, OrderBackend, TradeStream,
};
use order_gateway::config::GatewayConfig;
use order_gateway::http::HttpServer;
use order_gateway::lifecycle::Shutdown;
use order_gateway::observability::metrics::GatewayMetrics;
use order_gateway::OrderGateway;

/// A request as the stub backend received it.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Submit(SubmitOrderRequest),
    OrderBook(GetOrderBookRequest),
    Cancel(CancelOrderRequest),
    Modify(ModifyOrderRequest),
    Subscribe(SubscribeTradesRequest),
}

/// How the stub fails every call, when it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubFailure {
    Unavailable,
    Internal,
}

/// In-memory order engine with a fixed answer per call.
pub struct StubBackend {
    status: String,
    failure: Option<StubFailure>,
    delay: Option<Duration>,
    trades: Vec<TradeUpdate>,
    stream_error: Option<String>,
    hold_stream_open: bool,
    state: ChannelState,
    calls: Mutex<Vec<Recorded>>,
    contexts: Mutex<Vec<CallContext>>,
    streams_dropped: Arc<AtomicU64>,
}

impl StubBackend {
    /// Answer submit, cancel, and modify with `status`.
    pub fn replying(status: &str) -> Self {
        Self {
            status: status.to_string(),
            failure: None,
            delay: None,
            trades: Vec::new(),
            stream_error: None,
            hold_stream_open: false,
            state: ChannelState::Open,
            calls: Mutex::new(Vec::new()),
            contexts: Mutex::new(Vec::new()),
            streams_dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn failing(failure: StubFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::replying("")
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_trades(mut self, trades: Vec<TradeUpdate>) -> Self {
        self.trades = trades;
        self
    }

    /// End the trade stream with an RPC error after the trades.
    pub fn with_stream_error(mut self, message: &str) -> Self {
        self.stream_error = Some(message.to_string());
        self
    }

    /// Keep the trade stream open after the trades until it is dropped.
    pub fn holding_stream_open(mut self) -> Self {
        self.hold_stream_open = true;
        self
    }

    pub fn with_state(mut self, state: ChannelState) -> Self {
        self.state = state;
        self
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    pub fn contexts(&self) -> Vec<CallContext> {
        self.contexts.lock().unwrap().clone()
    }

    pub fn streams_dropped(&self) -> u64 {
        self.streams_dropped.load(Ordering::SeqCst)
    }

    async fn answer(&self, ctx: &CallContext, call: Recorded) -> Result<(), BackendError> {
        self.calls.lock().unwrap().push(call);
        self.contexts.lock().unwrap().push(ctx.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.failure {
            Some(StubFailure::Unavailable) => {
                Err(BackendError::Unavailable("tcp connect error".into()))
            }
            Some(StubFailure::Internal) => Err(BackendError::Rpc {
                code: tonic::Code::Internal,
                message: "engine crashed".into(),
            }),
            None => Ok(()),
        }
    }
}

/// Counts its own drop, standing in for RPC cancellation.
struct DropSignal(Arc<AtomicU64>);

impl Drop for DropSignal {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl OrderBackend for StubBackend {
    async fn submit_order(
        &self,
        ctx: &CallContext,
        request: SubmitOrderRequest,
    ) -> Result<SubmitOrderResponse, BackendError> {
        self.answer(ctx, Recorded::Submit(request)).await?;
        Ok(SubmitOrderResponse {
            order_id: "1001".into(),
            status: self.status.clone(),
            message: format!("status {}", self.status),
        })
    }

    async fn get_order_book(
        &self,
        ctx: &CallContext,
        request: GetOrderBookRequest,
    ) -> Result<GetOrderBookResponse, BackendError> {
        self.answer(ctx, Recorded::OrderBook(request)).await?;
        Ok(GetOrderBookResponse {
            bids: vec![OrderBookEntry {
                price: 149.5,
                quantity: 200,
            }],
            asks: vec![OrderBookEntry {
                price: 150.25,
                quantity: 75,
            }],
        })
    }

    async fn cancel_order(
        &self,
        ctx: &CallContext,
        request: CancelOrderRequest,
    ) -> Result<CancelOrderResponse, BackendError> {
        self.answer(ctx, Recorded::Cancel(request)).await?;
        Ok(CancelOrderResponse {
            status: self.status.clone(),
            message: String::new(),
        })
    }

    async fn modify_order(
        &self,
        ctx: &CallContext,
        request: ModifyOrderRequest,
    ) -> Result<ModifyOrderResponse, BackendError> {
        self.answer(ctx, Recorded::Modify(request)).await?;
        Ok(ModifyOrderResponse {
            status: self.status.clone(),
            message: String::new(),
        })
    }

    async fn subscribe_trades(
        &self,
        ctx: &CallContext,
        request: SubscribeTradesRequest,
    ) -> Result<TradeStream, BackendError> {
        self.answer(ctx, Recorded::Subscribe(request)).await?;

        let mut items: Vec<Result<TradeUpdate, BackendError>> =
            self.trades.iter().cloned().map(Ok).collect();
        if let Some(message) = &self.stream_error {
            items.push(Err(BackendError::Rpc {
                code: tonic::Code::Internal,
                message: message.clone(),
            }));
        }

        let signal = DropSignal(self.streams_dropped.clone());
        let updates = futures_util::stream::iter(items);
        let stream = if self.hold_stream_open {
            updates.chain(futures_util::stream::pending()).boxed()
        } else {
            updates.boxed()
        };
        Ok(stream
            .map(move |item| {
                let _held = &signal;
                item
            })
            .boxed())
    }

    fn status(&self) -> BackendStatus {
        BackendStatus {
            target: "stub:50051".into(),
            state: self.state,
        }
    }
}

pub fn trade(buy: &str, sell: &str, price: f64, quantity: i32) -> TradeUpdate {
    TradeUpdate {
        buy_order_id: buy.into(),
        sell_order_id: sell.into(),
        price,
        quantity,
        symbol: "AAPL".into(),
        timestamp: "Tue Nov 14 22:13:20 2023\n".into(),
    }
}

#[derive(Default)]
struct SampleCount(AtomicU64);

impl HistogramFn for SampleCount {
    fn record(&self, _value: f64) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Recorder keeping every metric in memory, keyed by name.
#[derive(Default)]
pub struct MemoryRecorder {
    counters: Mutex<HashMap<String, Arc<AtomicU64>>>,
    gauges: Mutex<HashMap<String, Arc<AtomicU64>>>,
    histograms: Mutex<HashMap<String, Arc<SampleCount>>>,
}

impl MemoryRecorder {
    pub fn has_counter(&self, name: &str) -> bool {
        self.counters.lock().unwrap().contains_key(name)
    }

    /// Value of a counter; panics if it was never registered.
    pub fn counter(&self, name: &str) -> u64 {
        self.counters
            .lock()
            .unwrap()
            .get(name)
            .unwrap_or_else(|| panic!("counter {} not registered", name))
            .load(Ordering::SeqCst)
    }

    pub fn gauge(&self, name: &str) -> f64 {
        let bits = self
            .gauges
            .lock()
            .unwrap()
            .get(name)
            .unwrap_or_else(|| panic!("gauge {} not registered", name))
            .load(Ordering::SeqCst);
        f64::from_bits(bits)
    }

    /// Number of samples recorded on a histogram.
    pub fn samples(&self, name: &str) -> u64 {
        self.histograms
            .lock()
            .unwrap()
            .get(name)
            .unwrap_or_else(|| panic!("histogram {} not registered", name))
            .0
            .load(Ordering::SeqCst)
    }
}

impl Recorder for MemoryRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        let inner = self
            .counters
            .lock()
            .unwrap()
            .entry(key.name().to_string())
            .or_default()
            .clone();
        Counter::from_arc(inner)
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        let inner = self
            .gauges
            .lock()
            .unwrap()
            .entry(key.name().to_string())
            .or_default()
            .clone();
        Gauge::from_arc(inner)
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        let inner = self
            .histograms
            .lock()
            .unwrap()
            .entry(key.name().to_string())
            .or_default()
            .clone();
        Histogram::from_arc(inner)
    }
}

/// Gateway wired to a backend, with metrics on a fresh in-memory recorder.
pub fn gateway_with(
    backend: Arc<dyn OrderBackend>,
    deadline: Duration,
) -> (Arc<OrderGateway>, Arc<MemoryRecorder>) {
    let recorder = Arc::new(MemoryRecorder::default());
    let metrics = GatewayMetrics::register(recorder.as_ref());
    let gateway = Arc::new(OrderGateway::new(backend, metrics, deadline));
    (gateway, recorder)
}

/// A gateway HTTP server on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub recorder: Arc<MemoryRecorder>,
    shutdown: Shutdown,
    task: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = tokio::time::timeout(Duration::from_secs(5), self.task).await;
    }
}

/// Serve `backend` over HTTP with the default config and given deadline.
pub async fn spawn_server(backend: Arc<dyn OrderBackend>, deadline: Duration) -> TestServer {
    let (gateway, recorder) = gateway_with(backend, deadline);
    let config = GatewayConfig::default();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config, gateway);
    let task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    TestServer {
        addr,
        recorder,
        shutdown,
        task,
    }
}
