//! Production `OrderBackend` over the shared gRPC channel.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use tonic::metadata::AsciiMetadataValue;
use tonic::transport::Channel;

use crate::backend::proto::order_service_client::OrderServiceClient;
use crate::backend::proto::{
    CancelOrderRequest, CancelOrderResponse, GetOrderBookRequest, GetOrderBookResponse,
    ModifyOrderRequest, ModifyOrderResponse, SubmitOrderRequest, SubmitOrderResponse,
    SubscribeTradesRequest,
};
use crate::backend::{
    BackendChannel, BackendError, BackendStatus, CallContext, OrderBackend, TradeStream,
};

/// Metadata key carrying the gateway request id to the engine.
pub const REQUEST_ID_METADATA: &str = "x-request-id";

/// Order engine reached through a single shared `BackendChannel`.
#[derive(Debug, Clone)]
pub struct GrpcBackend {
    channel: Arc<BackendChannel>,
}

impl GrpcBackend {
    pub fn new(channel: Arc<BackendChannel>) -> Self {
        Self { channel }
    }

    fn client(&self) -> Result<OrderServiceClient<Channel>, BackendError> {
        Ok(OrderServiceClient::new(self.channel.handle()?))
    }
}

/// Wrap a message with request id metadata and, for unary calls, the deadline.
fn outbound<T>(ctx: &CallContext, message: T, unary: bool) -> tonic::Request<T> {
    let mut request = tonic::Request::new(message);
    match ctx.request_id.parse::<AsciiMetadataValue>() {
        Ok(value) => {
            request.metadata_mut().insert(REQUEST_ID_METADATA, value);
        }
        Err(_) => {
            tracing::debug!(request_id = %ctx.request_id, "Request id is not valid metadata, not forwarded");
        }
    }
    if unary {
        if let Some(deadline) = ctx.deadline {
            request.set_timeout(deadline);
        }
    }
    request
}

#[async_trait]
impl OrderBackend for GrpcBackend {
    async fn submit_order(
        &self,
        ctx: &CallContext,
        request: SubmitOrderRequest,
    ) -> Result<SubmitOrderResponse, BackendError> {
        let mut client = self.client()?;
        let response = client.submit_order(outbound(ctx, request, true)).await?;
        Ok(response.into_inner())
    }

    async fn get_order_book(
        &self,
        ctx: &CallContext,
        request: GetOrderBookRequest,
    ) -> Result<GetOrderBookResponse, BackendError> {
        let mut client = self.client()?;
        let response = client.get_order_book(outbound(ctx, request, true)).await?;
        Ok(response.into_inner())
    }

    async fn cancel_order(
        &self,
        ctx: &CallContext,
        request: CancelOrderRequest,
    ) -> Result<CancelOrderResponse, BackendError> {
        let mut client = self.client()?;
        let response = client.cancel_order(outbound(ctx, request, true)).await?;
        Ok(response.into_inner())
    }

    async fn modify_order(
        &self,
        ctx: &CallContext,
        request: ModifyOrderRequest,
    ) -> Result<ModifyOrderResponse, BackendError> {
        let mut client = self.client()?;
        let response = client.modify_order(outbound(ctx, request, true)).await?;
        Ok(response.into_inner())
    }

    async fn subscribe_trades(
        &self,
        ctx: &CallContext,
        request: SubscribeTradesRequest,
    ) -> Result<TradeStream, BackendError> {
        let mut client = self.client()?;
        let stream = client
            .subscribe_trades(outbound(ctx, request, false))
            .await?
            .into_inner();
        Ok(Box::pin(stream.map(|item| item.map_err(BackendError::from))))
    }

    fn status(&self) -> BackendStatus {
        BackendStatus {
            target: self.channel.target().to_string(),
            state: self.channel.state(),
        }
    }
}
