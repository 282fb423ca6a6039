//! Order REST handlers.
//!
//! Each handler checks the request shape, hands the typed request to the
//! gateway and renders the engine's response as JSON. Business rejections
//! come back as 200 with the engine's status token.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::de::DeserializeOwned;

use crate::backend::proto::{
    CancelOrderResponse, GetOrderBookResponse, ModifyOrderResponse, SubmitOrderResponse,
};
use crate::error::{GatewayError, Result};
use crate::gateway::envelope::{self, CancelOrderBody, ModifyOrderBody, SubmitOrderBody};
use crate::http::request::RequestId;
use crate::http::server::AppState;

/// Action suffix of the cancel route, `/v1/orders/{orderId}:cancel`.
const CANCEL_SUFFIX: &str = ":cancel";

fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| GatewayError::InvalidRequest(rejection.body_text()))
}

/// Parse an optional JSON body: empty means all fields absent.
fn optional_json_body<T: DeserializeOwned + Default>(bytes: &Bytes) -> Result<T> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes)
        .map_err(|err| GatewayError::InvalidRequest(format!("malformed JSON body: {}", err)))
}

/// `POST /v1/orders`
pub async fn submit_order(
    State(state): State<AppState>,
    request_id: RequestId,
    body: std::result::Result<Json<SubmitOrderBody>, JsonRejection>,
) -> Result<Json<SubmitOrderResponse>> {
    let request = json_body(body)?.into_request()?;
    let response = state
        .gateway
        .submit_order(request_id.as_str(), request)
        .await?;
    Ok(Json(response))
}

/// `GET /v1/orderbook/{symbol}`
pub async fn get_order_book(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(symbol): Path<String>,
) -> Result<Json<GetOrderBookResponse>> {
    let request = envelope::order_book_request(&symbol)?;
    let response = state
        .gateway
        .get_order_book(request_id.as_str(), request)
        .await?;
    Ok(Json(response))
}

/// `POST /v1/orders/{orderId}:cancel`
///
/// The router captures the whole last segment; only the `:cancel` action
/// exists, anything else is 404.
pub async fn order_action(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(order_ref): Path<String>,
    body: Bytes,
) -> Result<Json<CancelOrderResponse>> {
    let order_id = order_ref.strip_suffix(CANCEL_SUFFIX).ok_or_else(|| {
        GatewayError::NotFound(format!("no action on order resource '{}'", order_ref))
    })?;
    let request = optional_json_body::<CancelOrderBody>(&body)?.into_request(order_id)?;
    let response = state
        .gateway
        .cancel_order(request_id.as_str(), request)
        .await?;
    Ok(Json(response))
}

/// `PATCH /v1/orders/{orderId}`
pub async fn modify_order(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(order_id): Path<String>,
    body: std::result::Result<Json<ModifyOrderBody>, JsonRejection>,
) -> Result<Json<ModifyOrderResponse>> {
    let request = json_body(body)?.into_request(&order_id)?;
    let response = state
        .gateway
        .modify_order(request_id.as_str(), request)
        .await?;
    Ok(Json(response))
}
