//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → orders.rs / websocket.rs (shape checks, call the gateway)
//!     → response.rs (error rendering)
//!     → Send to client
//! ```

pub mod orders;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use request::{MakeRequestUuid, RequestId, X_REQUEST_ID};
pub use response::ErrorResponse;
pub use server::{AppState, HttpServer};
