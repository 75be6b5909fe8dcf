//! Session, OHLC retrieval and batch orchestration for XTS market data.
//!
//! - [`authenticate`]: credentials in, [`Session`](xts_core::Session) out
//! - [`InstrumentFetcher`]: one OHLC request per instrument, decoded by
//!   [`BarDecoder`](xts_feed::BarDecoder)
//! - [`BatchRetriever`]: many instruments, per-instrument failure isolation
//!
//! The network sits behind [`MarketDataTransport`] so everything above it
//! can be exercised with [`MockTransport`].

pub mod auth;
pub mod batch;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod mock;
pub mod transport;

pub use auth::authenticate;
pub use batch::{BarSummary, BatchRetriever, InstrumentUniverse, NamedResultSet};
pub use error::{ClientError, ClientResult};
pub use fetcher::InstrumentFetcher;
pub use http::HttpTransport;
pub use mock::{MockReply, MockTransport};
pub use transport::{BoxFuture, DynTransport, LoginRequest, MarketDataTransport, OhlcQuery, RawResponse};
