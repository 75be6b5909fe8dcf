//! Prometheus metrics and structured logging for XTS market data.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Prometheus counters for retrieval, decoding and persistence

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
