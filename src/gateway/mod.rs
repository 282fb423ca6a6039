//! Translation core: HTTP-shaped requests in, order engine calls out.
//!
//! # Request Flow
//! ```text
//! handler (shape-validated request)
//!     → record attempt
//!     → dispatch (timer + deadline around one backend call)
//!     → classify status token
//!     → record outcome
//!     → backend response, unchanged
//! ```
//!
//! # Design Decisions
//! - Attempts are counted only after input validation succeeded
//! - Transport failures and deadline expiry count as backend failures, never as outcomes
//! - The latency sample closes on every exit path of the dispatch
//! - No locks are held across the backend call

pub mod envelope;
pub mod outcome;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::proto::{
    CancelOrderRequest, CancelOrderResponse, GetOrderBookRequest, GetOrderBookResponse,
    ModifyOrderRequest, ModifyOrderResponse, SubmitOrderRequest, SubmitOrderResponse,
    SubscribeTradesRequest,
};
use crate::backend::{BackendError, BackendStatus, CallContext, OrderBackend, TradeStream};
use crate::error::{GatewayError, Result};
use crate::observability::metrics::{GatewayMetrics, OperationMetrics};
use outcome::{Outcome, CANCEL_ACCEPTED, MODIFY_ACCEPTED, SUBMIT_ACCEPTED};

/// Shared translation handler. One instance serves every request.
pub struct OrderGateway {
    backend: Arc<dyn OrderBackend>,
    metrics: GatewayMetrics,
    deadline: Duration,
}

impl OrderGateway {
    pub fn new(backend: Arc<dyn OrderBackend>, metrics: GatewayMetrics, deadline: Duration) -> Self {
        Self {
            backend,
            metrics,
            deadline,
        }
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.metrics
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn backend_status(&self) -> BackendStatus {
        self.backend.status()
    }

    fn context(&self, request_id: &str) -> CallContext {
        CallContext::new(request_id).with_deadline(self.deadline)
    }

    /// Forward an order submission and count it as accepted or rejected.
    pub async fn submit_order(
        &self,
        request_id: &str,
        request: SubmitOrderRequest,
    ) -> Result<SubmitOrderResponse> {
        let metrics = &self.metrics.submit_order;
        metrics.record_attempt();

        let ctx = self.context(request_id);
        tracing::debug!(
            request_id = %request_id,
            symbol = %request.symbol,
            side = %request.side,
            "Submitting order"
        );
        let response = self
            .dispatch(metrics, self.backend.submit_order(&ctx, request))
            .await?;

        let outcome = Outcome::classify(&response.status, SUBMIT_ACCEPTED);
        metrics.record_outcome(outcome);
        tracing::info!(
            request_id = %request_id,
            order_id = %response.order_id,
            status = %response.status,
            outcome = outcome.as_str(),
            "Order submitted"
        );
        Ok(response)
    }

    /// Read the order book. No attempt or outcome counting, only latency.
    pub async fn get_order_book(
        &self,
        request_id: &str,
        request: GetOrderBookRequest,
    ) -> Result<GetOrderBookResponse> {
        let metrics = &self.metrics.get_order_book;
        let ctx = self.context(request_id);
        let response = self
            .dispatch(metrics, self.backend.get_order_book(&ctx, request))
            .await?;
        tracing::debug!(
            request_id = %request_id,
            bids = response.bids.len(),
            asks = response.asks.len(),
            "Order book fetched"
        );
        Ok(response)
    }

    /// Forward a cancel. Any status other than CANCELLED counts as an error.
    pub async fn cancel_order(
        &self,
        request_id: &str,
        request: CancelOrderRequest,
    ) -> Result<CancelOrderResponse> {
        let metrics = &self.metrics.cancel_order;
        metrics.record_attempt();

        let ctx = self.context(request_id);
        let order_id = request.order_id.clone();
        let response = self
            .dispatch(metrics, self.backend.cancel_order(&ctx, request))
            .await?;

        let outcome = Outcome::classify(&response.status, CANCEL_ACCEPTED);
        metrics.record_outcome(outcome);
        tracing::info!(
            request_id = %request_id,
            order_id = %order_id,
            status = %response.status,
            outcome = outcome.as_str(),
            "Cancel forwarded"
        );
        Ok(response)
    }

    /// Forward a modify. Any status other than MODIFIED counts as an error.
    pub async fn modify_order(
        &self,
        request_id: &str,
        request: ModifyOrderRequest,
    ) -> Result<ModifyOrderResponse> {
        let metrics = &self.metrics.modify_order;
        metrics.record_attempt();

        let ctx = self.context(request_id);
        let order_id = request.order_id.clone();
        let response = self
            .dispatch(metrics, self.backend.modify_order(&ctx, request))
            .await?;

        let outcome = Outcome::classify(&response.status, MODIFY_ACCEPTED);
        metrics.record_outcome(outcome);
        tracing::info!(
            request_id = %request_id,
            order_id = %order_id,
            status = %response.status,
            outcome = outcome.as_str(),
            "Modify forwarded"
        );
        Ok(response)
    }

    /// Open a trade stream. Only the opening call is bounded by the deadline;
    /// the stream itself lives until the backend ends it or the caller drops it.
    pub async fn subscribe_trades(
        &self,
        request_id: &str,
        request: SubscribeTradesRequest,
    ) -> Result<TradeStream> {
        let ctx = CallContext::new(request_id);
        let symbol = request.symbol.clone();
        let opened = tokio::time::timeout(self.deadline, self.backend.subscribe_trades(&ctx, request))
            .await
            .map_err(|_| GatewayError::Timeout(self.deadline))??;
        tracing::info!(request_id = %request_id, symbol = %symbol, "Trade subscription opened");
        Ok(opened)
    }

    /// Run one backend call under the latency timer and the gateway deadline.
    async fn dispatch<T, F>(&self, metrics: &OperationMetrics, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, BackendError>>,
    {
        let timer = metrics.start_timer();
        let result = tokio::time::timeout(self.deadline, call).await;
        let elapsed = timer.stop();

        match result {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => {
                metrics.record_backend_failure();
                tracing::warn!(
                    operation = %metrics.operation(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %err,
                    "Backend call failed"
                );
                Err(GatewayError::Backend(err))
            }
            Err(_) => {
                metrics.record_backend_failure();
                tracing::warn!(
                    operation = %metrics.operation(),
                    deadline_ms = self.deadline.as_millis() as u64,
                    "Backend call timed out"
                );
                Err(GatewayError::Timeout(self.deadline))
            }
        }
    }
}

impl std::fmt::Debug for OrderGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderGateway")
            .field("backend", &self.backend.status())
            .field("deadline", &self.deadline)
            .finish()
    }
}
