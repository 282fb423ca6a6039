//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms through an injected recorder)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging with request id on every request span
//! - Gateway metrics are registered on an injected recorder, never a global one
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
