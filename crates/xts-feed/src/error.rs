//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    /// A value inside an accepted row could not be decoded as its column type.
    #[error("Parse error in row {row}, column {column}: {message}")]
    ParseError {
        row: usize,
        column: &'static str,
        message: String,
    },

    /// The payload node is neither absent, a string, nor an array.
    #[error("Unsupported OHLC payload kind: {0}")]
    UnsupportedPayload(&'static str),

    /// The response envelope itself is malformed.
    #[error("Invalid response envelope: {0}")]
    InvalidEnvelope(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FeedResult<T> = Result<T, FeedError>;
