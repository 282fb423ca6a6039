//! HTTP request envelopes and their presence checks.
//!
//! Bodies are checked for shape only (required fields present, JSON types
//! right). Whether a price or side makes sense is the order engine's call.

use serde::Deserialize;

use crate::backend::proto::{
    CancelOrderRequest, GetOrderBookRequest, ModifyOrderRequest, SubmitOrderRequest,
    SubscribeTradesRequest,
};
use crate::error::GatewayError;

/// Collects the names of absent required fields.
#[derive(Default)]
struct Required {
    missing: Vec<&'static str>,
}

impl Required {
    fn field<T>(&mut self, name: &'static str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.missing.push(name);
        }
        value
    }

    fn check(self) -> Result<(), GatewayError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(GatewayError::InvalidRequest(format!(
                "missing required field(s): {}",
                self.missing.join(", ")
            )))
        }
    }
}

/// A path segment is forwarded exactly as received; only a blank one is refused.
fn path_identifier(name: &str, value: &str) -> Result<String, GatewayError> {
    if value.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(format!("{} is required in the path", name)));
    }
    Ok(value.to_string())
}

/// Body of `POST /v1/orders`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderBody {
    pub symbol: Option<String>,
    pub side: Option<String>,
    #[serde(rename = "type", alias = "orderType")]
    pub order_type: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i32>,
    #[serde(alias = "client_id")]
    pub client_id: Option<String>,
}

impl SubmitOrderBody {
    pub fn into_request(self) -> Result<SubmitOrderRequest, GatewayError> {
        let mut required = Required::default();
        let symbol = required.field("symbol", self.symbol);
        let side = required.field("side", self.side);
        let price = required.field("price", self.price);
        let quantity = required.field("quantity", self.quantity);
        let client_id = required.field("clientId", self.client_id);
        required.check()?;

        Ok(SubmitOrderRequest {
            symbol: symbol.unwrap_or_default(),
            side: side.unwrap_or_default(),
            order_type: self.order_type.unwrap_or_default(),
            price: price.unwrap_or_default(),
            quantity: quantity.unwrap_or_default(),
            client_id: client_id.unwrap_or_default(),
        })
    }
}

/// Body of `POST /v1/orders/{orderId}:cancel`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderBody {
    /// Accepted for compatibility; the path id always wins.
    #[serde(alias = "order_id")]
    pub order_id: Option<String>,
    #[serde(alias = "client_id")]
    pub client_id: Option<String>,
}

impl CancelOrderBody {
    pub fn into_request(self, path_order_id: &str) -> Result<CancelOrderRequest, GatewayError> {
        let order_id = path_identifier("orderId", path_order_id)?;

        let mut required = Required::default();
        let client_id = required.field("clientId", self.client_id);
        required.check()?;

        warn_if_overridden(self.order_id.as_deref(), &order_id);

        Ok(CancelOrderRequest {
            order_id,
            client_id: client_id.unwrap_or_default(),
        })
    }
}

/// Body of `PATCH /v1/orders/{orderId}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyOrderBody {
    /// Accepted for compatibility; the path id always wins.
    #[serde(alias = "order_id")]
    pub order_id: Option<String>,
    #[serde(alias = "new_price")]
    pub new_price: Option<f64>,
    #[serde(alias = "new_quantity")]
    pub new_quantity: Option<i32>,
    #[serde(alias = "client_id")]
    pub client_id: Option<String>,
}

impl ModifyOrderBody {
    pub fn into_request(self, path_order_id: &str) -> Result<ModifyOrderRequest, GatewayError> {
        let order_id = path_identifier("orderId", path_order_id)?;

        let mut required = Required::default();
        let new_price = required.field("newPrice", self.new_price);
        let new_quantity = required.field("newQuantity", self.new_quantity);
        let client_id = required.field("clientId", self.client_id);
        required.check()?;

        warn_if_overridden(self.order_id.as_deref(), &order_id);

        Ok(ModifyOrderRequest {
            order_id,
            new_price: new_price.unwrap_or_default(),
            new_quantity: new_quantity.unwrap_or_default(),
            client_id: client_id.unwrap_or_default(),
        })
    }
}

fn warn_if_overridden(body_order_id: Option<&str>, path_order_id: &str) {
    if let Some(body_id) = body_order_id {
        if body_id != path_order_id {
            tracing::debug!(
                path_order_id = %path_order_id,
                body_order_id = %body_id,
                "Body orderId differs from path; using path"
            );
        }
    }
}

pub fn order_book_request(symbol: &str) -> Result<GetOrderBookRequest, GatewayError> {
    Ok(GetOrderBookRequest {
        symbol: path_identifier("symbol", symbol)?,
    })
}

pub fn subscribe_request(symbol: &str) -> Result<SubscribeTradesRequest, GatewayError> {
    Ok(SubscribeTradesRequest {
        symbol: path_identifier("symbol", symbol)?,
    })
}
