//! Core domain types for XTS market data retrieval.
//!
//! This crate provides the types shared by every other crate:
//! - `Price`: exact decimal price
//! - `Bar`: one normalized OHLC candle
//! - `InstrumentRef`, `ExchangeSegment`: request keys
//! - `RetrievalRequest`, `Granularity`: validated retrieval parameters
//! - `Session`, `Credentials`: authenticated context
//! - `StreamEvent`: one observed streaming occurrence

pub mod bar;
pub mod decimal;
pub mod error;
pub mod instrument;
pub mod request;
pub mod session;
pub mod stream;

pub use bar::{is_chronological, Bar};
pub use decimal::Price;
pub use error::{CoreError, Result};
pub use instrument::{ExchangeSegment, InstrumentRef};
pub use request::{validate_range, Granularity, RetrievalRequest, SERVER_TIME_FORMAT};
pub use session::{Credentials, Session};
pub use stream::{StreamEvent, StreamEventType};
