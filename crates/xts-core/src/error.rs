//! Error types for xts-core.

use thiserror::Error;

/// Validation errors raised before any I/O is attempted.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid time range: end {end} precedes start {start}")]
    InvalidRange { start: String, end: String },

    #[error("Invalid granularity: {0} seconds (must be positive)")]
    InvalidGranularity(u64),

    #[error("Invalid instrument id: {0}")]
    InvalidInstrumentId(u64),

    #[error("Unknown exchange segment: {0}")]
    UnknownSegment(i64),

    #[error("Unknown stream event type: {0}")]
    UnknownEventType(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
