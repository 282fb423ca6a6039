//! HTTP/JSON gateway in front of a gRPC order engine.

pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::GatewayConfig;
pub use error::GatewayError;
pub use gateway::OrderGateway;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
