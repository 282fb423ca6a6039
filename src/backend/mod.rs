//! Backend order-engine subsystem.
//!
//! # Data Flow
//! ```text
//! OrderGateway
//!     → OrderBackend (capability trait, one shared instance)
//!     → grpc.rs (GrpcBackend: metadata, deadline, error mapping)
//!     → proto.rs (generated messages and client)
//!     → channel.rs (single lazily-connected, multiplexed channel)
//!     → order engine
//! ```
//!
//! # Design Decisions
//! - One channel for the process lifetime, cloned per call (clones share the connection)
//! - Transport failures surface as `BackendError`, never as business outcomes
//! - The trait is object safe so tests substitute in-memory backends

pub mod channel;
pub mod grpc;
pub mod proto;

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::Stream;
use serde::Serialize;
use thiserror::Error;

pub use channel::{BackendChannel, ChannelState};
pub use grpc::GrpcBackend;
use proto::{
    CancelOrderRequest, CancelOrderResponse, GetOrderBookRequest, GetOrderBookResponse,
    ModifyOrderRequest, ModifyOrderResponse, SubmitOrderRequest, SubmitOrderResponse,
    SubscribeTradesRequest, TradeUpdate,
};

/// Lazily-produced sequence of trade updates, ended by the backend or by drop.
pub type TradeStream = Pin<Box<dyn Stream<Item = Result<TradeUpdate, BackendError>> + Send>>;

/// Errors raised while talking to the order engine.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The engine could not be reached (connection refused, reset, DNS).
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The engine reported that the call deadline expired.
    #[error("backend deadline exceeded")]
    DeadlineExceeded,

    /// The shared channel was closed during shutdown.
    #[error("backend channel is closed")]
    ChannelClosed,

    /// The configured endpoint could not be turned into a channel.
    #[error("invalid backend endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// Any other RPC-level failure.
    #[error("backend call failed ({code:?}): {message}")]
    Rpc { code: tonic::Code, message: String },
}

impl From<tonic::Status> for BackendError {
    fn from(status: tonic::Status) -> Self {
        match status.code() {
            tonic::Code::Unavailable => BackendError::Unavailable(status.message().to_string()),
            tonic::Code::DeadlineExceeded => BackendError::DeadlineExceeded,
            code => BackendError::Rpc {
                code,
                message: status.message().to_string(),
            },
        }
    }
}

/// Per-call metadata forwarded alongside each RPC.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Correlation id of the inbound HTTP request.
    pub request_id: String,
    /// Deadline advertised to the backend.
    pub deadline: Option<Duration>,
}

impl CallContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Snapshot of the backend connection for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    pub target: String,
    pub state: ChannelState,
}

/// The five operations of the order engine, as consumed by the gateway.
///
/// Implementations must be safe for concurrent use from many requests.
#[async_trait]
pub trait OrderBackend: Send + Sync {
    async fn submit_order(
        &self,
        ctx: &CallContext,
        request: SubmitOrderRequest,
    ) -> Result<SubmitOrderResponse, BackendError>;

    async fn get_order_book(
        &self,
        ctx: &CallContext,
        request: GetOrderBookRequest,
    ) -> Result<GetOrderBookResponse, BackendError>;

    async fn cancel_order(
        &self,
        ctx: &CallContext,
        request: CancelOrderRequest,
    ) -> Result<CancelOrderResponse, BackendError>;

    async fn modify_order(
        &self,
        ctx: &CallContext,
        request: ModifyOrderRequest,
    ) -> Result<ModifyOrderResponse, BackendError>;

    /// Open a server stream of trades for one symbol.
    async fn subscribe_trades(
        &self,
        ctx: &CallContext,
        request: SubscribeTradesRequest,
    ) -> Result<TradeStream, BackendError>;

    fn status(&self) -> BackendStatus {
        BackendStatus {
            target: "unknown".to_string(),
            state: ChannelState::Open,
        }
    }
}
