//! OHLC payload decoding for XTS market data.
//!
//! The OHLC endpoint returns its bars either as a pipe-delimited string or
//! as a JSON array of rows, depending on endpoint version. [`BarDecoder`]
//! detects the shape from the JSON node itself and normalizes both into
//! `Vec<Bar>`.

pub mod error;
pub mod parser;

pub use error::{FeedError, FeedResult};
pub use parser::{BarDecoder, Column, DecodeStats, OhlcPayload};
