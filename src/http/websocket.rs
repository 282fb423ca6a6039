//! Trade stream over WebSocket.
//!
//! # Responsibilities
//! - Open the backend trade subscription before upgrading
//! - Forward each trade update as one JSON text frame
//! - Close with 1000 when the backend completes, 1011 when it fails
//!
//! # Data Flow
//! ```text
//! Client ←──── text frames ──── Gateway ←──── gRPC server stream ──── Order engine
//! ```
//!
//! # Design Decisions
//! - One update is pulled from the backend per frame sent (no buffering)
//! - Client disconnect drops the backend stream, which cancels the RPC
//! - Inbound client frames other than Close are ignored

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;

use crate::backend::TradeStream;
use crate::gateway::envelope;
use crate::http::request::RequestId;
use crate::http::server::AppState;
use crate::observability::metrics::StreamMetrics;

/// Close reasons are limited to 123 bytes by the protocol.
const MAX_CLOSE_REASON: usize = 123;

/// `GET /v1/trades/{symbol}` (WebSocket upgrade)
pub async fn trade_stream(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    request_id: RequestId,
    Path(symbol): Path<String>,
) -> Response {
    let request = match envelope::subscribe_request(&symbol) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };
    let trades = match state
        .gateway
        .subscribe_trades(request_id.as_str(), request)
        .await
    {
        Ok(trades) => trades,
        Err(err) => return err.into_response(),
    };

    let metrics = state.gateway.metrics().trade_stream.clone();
    ws.on_upgrade(move |socket| forward_trades(socket, trades, metrics, request_id, symbol))
}

async fn forward_trades(
    mut socket: WebSocket,
    mut trades: TradeStream,
    metrics: StreamMetrics,
    request_id: RequestId,
    symbol: String,
) {
    let _active = metrics.track();
    let mut forwarded: u64 = 0;

    let close = loop {
        tokio::select! {
            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Close(_))) | None => break None,
                Some(Ok(_)) => continue,
                Some(Err(err)) => {
                    tracing::debug!(request_id = %request_id, error = %err, "WebSocket receive failed");
                    break None;
                }
            },
            next = trades.next() => match next {
                Some(Ok(update)) => {
                    let text = match serde_json::to_string(&update) {
                        Ok(text) => text,
                        Err(err) => break Some(close_frame(close_code::ERROR, &err.to_string())),
                    };
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break None;
                    }
                    metrics.record_update();
                    forwarded += 1;
                }
                Some(Err(err)) => {
                    tracing::warn!(request_id = %request_id, symbol = %symbol, error = %err, "Trade stream failed");
                    break Some(close_frame(close_code::ERROR, &err.to_string()));
                }
                None => break Some(close_frame(close_code::NORMAL, "trade stream completed")),
            },
        }
    };

    if let Some(frame) = close {
        let _ = socket.send(Message::Close(Some(frame))).await;
    }
    tracing::info!(
        request_id = %request_id,
        symbol = %symbol,
        forwarded,
        "Trade subscription closed"
    );
}

fn close_frame(code: u16, reason: &str) -> CloseFrame {
    let mut end = reason.len().min(MAX_CLOSE_REASON);
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    CloseFrame {
        code,
        reason: reason[..end].to_string().into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_reason_is_truncated_on_char_boundary() {
        let long = "é".repeat(100);
        let frame = close_frame(close_code::ERROR, &long);
        assert!(frame.reason.as_str().len() <= MAX_CLOSE_REASON);
        assert_eq!(frame.reason.as_str().len() % 2, 0);
        assert_eq!(frame.code, 1011);
    }
}
