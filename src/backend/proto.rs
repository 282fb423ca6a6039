//! Message schema and client of the `tradeflow.order.OrderService` backend.
//!
//! Generated from `proto/order_service.proto`. The schema is owned by the
//! order engine; the gateway only populates and reads fields. JSON rendering
//! follows the protobuf JSON mapping (lowerCamelCase names).

tonic::include_proto!("tradeflow.order");
