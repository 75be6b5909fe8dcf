//! Retrieval transport abstraction.
//!
//! [`MarketDataTransport`] is the only place the client touches the network.
//! It returns raw status + body; interpreting them (auth envelope, OHLC
//! decoding, status policy) stays above this seam.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use xts_core::{Credentials, RetrievalRequest};

use crate::error::ClientResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Status and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Login body: `{"appKey", "secretKey", "source"}`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    app_key: &'a str,
    secret_key: &'a str,
    source: &'a str,
}

impl<'a> LoginRequest<'a> {
    pub fn from_credentials(credentials: &'a Credentials) -> Self {
        Self {
            app_key: credentials.app_key(),
            secret_key: credentials.secret_key(),
            source: credentials.source(),
        }
    }

    pub fn app_key(&self) -> &str {
        self.app_key
    }

    pub fn source(&self) -> &str {
        self.source
    }
}

impl fmt::Debug for LoginRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("app_key", &self.app_key)
            .field("secret_key", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Query string of the OHLC endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OhlcQuery {
    #[serde(rename = "exchangeSegment")]
    pub exchange_segment: i64,
    #[serde(rename = "exchangeInstrumentID")]
    pub exchange_instrument_id: u64,
    #[serde(rename = "startTime")]
    pub start_time: String,
    #[serde(rename = "endTime")]
    pub end_time: String,
    #[serde(rename = "compressionValue")]
    pub compression_value: u32,
}

impl From<&RetrievalRequest> for OhlcQuery {
    fn from(request: &RetrievalRequest) -> Self {
        let instrument = request.instrument();
        Self {
            exchange_segment: instrument.segment().code(),
            exchange_instrument_id: instrument.instrument_id(),
            start_time: request.start_param(),
            end_time: request.end_param(),
            compression_value: request.granularity().secs(),
        }
    }
}

/// Request/response access to the market-data REST API.
///
/// Network failures and timeouts come back as
/// [`ClientError::Transport`](crate::ClientError::Transport) with no status.
/// Non-2xx responses are returned as `Ok` so callers decide the policy.
pub trait MarketDataTransport: Send + Sync {
    /// POST the login body.
    fn login<'a>(&'a self, request: &'a LoginRequest<'a>) -> BoxFuture<'a, ClientResult<RawResponse>>;

    /// GET one OHLC window with the session token.
    fn fetch_ohlc<'a>(
        &'a self,
        query: &'a OhlcQuery,
        token: &'a str,
    ) -> BoxFuture<'a, ClientResult<RawResponse>>;
}

/// Arc wrapper for transport trait objects.
pub type DynTransport = Arc<dyn MarketDataTransport>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use xts_core::{ExchangeSegment, Granularity, InstrumentRef};

    #[test]
    fn test_raw_response_success_range() {
        assert!(RawResponse::new(200, "").is_success());
        assert!(RawResponse::new(204, "").is_success());
        assert!(!RawResponse::new(301, "").is_success());
        assert!(!RawResponse::new(401, "").is_success());
        assert!(!RawResponse::new(500, "").is_success());
    }

    #[test]
    fn test_ohlc_query_from_request() {
        let instrument = InstrumentRef::new(ExchangeSegment::NseCm, 2885).unwrap();
        let start = Local.with_ymd_and_hms(2024, 1, 5, 9, 15, 0).unwrap();
        let end = Local.with_ymd_and_hms(2024, 1, 5, 9, 45, 0).unwrap();
        let request =
            RetrievalRequest::new(instrument, start, end, Granularity::ONE_MINUTE).unwrap();

        let query = OhlcQuery::from(&request);
        assert_eq!(query.exchange_segment, 1);
        assert_eq!(query.exchange_instrument_id, 2885);
        assert_eq!(query.start_time, "Jan 05 2024 091500");
        assert_eq!(query.end_time, "Jan 05 2024 094500");
        assert_eq!(query.compression_value, 60);
    }

    #[test]
    fn test_login_request_wire_names_and_redaction() {
        let credentials = Credentials::new("key", "secret", "WEBAPI");
        let request = LoginRequest::from_credentials(&credentials);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["appKey"], "key");
        assert_eq!(json["secretKey"], "secret");
        assert_eq!(json["source"], "WEBAPI");

        let debug = format!("{request:?}");
        assert!(!debug.contains("secret\""));
        assert!(debug.contains("<redacted>"));
    }
}
