//! Single-instrument OHLC retrieval.

use std::time::Instant;

use chrono::{DateTime, Local};
use tracing::{debug, trace};
use xts_core::{Bar, Granularity, InstrumentRef, RetrievalRequest, Session};
use xts_feed::BarDecoder;
use xts_telemetry::Metrics;

use crate::error::{ClientError, ClientResult};
use crate::transport::{DynTransport, OhlcQuery};

/// Issues one OHLC request per call and decodes the response.
///
/// No retries: a failure is returned to the caller as-is.
pub struct InstrumentFetcher {
    transport: DynTransport,
    decoder: BarDecoder,
}

impl InstrumentFetcher {
    pub fn new(transport: DynTransport) -> Self {
        Self {
            transport,
            decoder: BarDecoder::new(),
        }
    }

    /// Decoder, for its accepted/dropped row counters.
    pub fn decoder(&self) -> &BarDecoder {
        &self.decoder
    }

    /// Validate the bounds, then fetch.
    ///
    /// A range with `end < start` fails with [`ClientError::Validation`]
    /// before the transport is called.
    pub async fn fetch_range(
        &self,
        session: &Session,
        instrument: InstrumentRef,
        start: DateTime<Local>,
        end: DateTime<Local>,
        granularity: Granularity,
    ) -> ClientResult<Vec<Bar>> {
        let request = RetrievalRequest::new(instrument, start, end, granularity)?;
        self.fetch(session, &request).await
    }

    /// Fetch and decode one request.
    ///
    /// - unauthenticated session: [`ClientError::NotLoggedIn`], no I/O
    /// - non-2xx: [`ClientError::Transport`] with the status
    /// - undecodable body: [`ClientError::Parse`]
    pub async fn fetch(&self, session: &Session, request: &RetrievalRequest) -> ClientResult<Vec<Bar>> {
        if !session.is_authenticated() {
            return Err(ClientError::NotLoggedIn);
        }

        let result = self.fetch_inner(session, request).await;
        match &result {
            Ok(_) => Metrics::ohlc_request("ok"),
            Err(e) => Metrics::ohlc_request(e.metric_label()),
        }
        result
    }

    async fn fetch_inner(&self, session: &Session, request: &RetrievalRequest) -> ClientResult<Vec<Bar>> {
        let query = OhlcQuery::from(request);
        let instrument = request.instrument();

        let started = Instant::now();
        let response = self.transport.fetch_ohlc(&query, session.token()).await?;
        Metrics::ohlc_latency(started.elapsed().as_secs_f64() * 1000.0);

        if !response.is_success() {
            return Err(ClientError::Transport {
                status: Some(response.status),
                message: truncate(&response.body),
            });
        }
        trace!(instrument = %instrument, body_len = response.body.len(), "OHLC response received");

        let dropped_before = self.decoder.stats().dropped();
        let bars = self.decoder.decode_response(&response.body)?;
        let dropped = self.decoder.stats().dropped().saturating_sub(dropped_before);

        Metrics::bars_decoded(bars.len() as u64);
        if dropped > 0 {
            Metrics::rows_dropped(dropped);
        }

        debug!(instrument = %instrument, bars = bars.len(), dropped, "OHLC decoded");
        Ok(bars)
    }
}

/// Keep error messages readable when the server returns an HTML page.
fn truncate(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockReply, MockTransport};
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::sync::Arc;
    use xts_core::{ExchangeSegment, Price};
    use xts_feed::FeedError;

    fn reliance() -> InstrumentRef {
        InstrumentRef::new(ExchangeSegment::NseCm, 2885).unwrap()
    }

    fn window() -> (DateTime<Local>, DateTime<Local>) {
        let start = Local.with_ymd_and_hms(2024, 1, 5, 9, 15, 0).unwrap();
        (start, start + Duration::minutes(30))
    }

    fn session() -> Session {
        Session::authenticated("tok-123", "USER1")
    }

    fn setup() -> (Arc<MockTransport>, InstrumentFetcher) {
        let transport = Arc::new(MockTransport::new());
        let fetcher = InstrumentFetcher::new(transport.clone());
        (transport, fetcher)
    }

    #[tokio::test]
    async fn test_fetch_decodes_text_payload() {
        let (transport, fetcher) = setup();
        transport.set_ohlc_reply(
            2885,
            MockReply::ohlc(json!("1704426300|2500.5|2510|2495.25|2505.75|1200|0\n1704426360|2505.75|2506|2501|2502|800")),
        );
        let (start, end) = window();

        let bars = fetcher
            .fetch_range(&session(), reliance(), start, end, Granularity::ONE_MINUTE)
            .await
            .unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].open(), Price::new(dec!(2500.5)));
        assert_eq!(bars[1].volume(), 800);
        assert_eq!(bars[1].open_interest(), 0);

        let queries = transport.get_queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].start_time, "Jan 05 2024 091500");
        assert_eq!(queries[0].end_time, "Jan 05 2024 094500");
        assert_eq!(transport.get_tokens(), vec!["tok-123".to_string()]);
    }

    #[tokio::test]
    async fn test_unauthenticated_session_makes_no_call() {
        let (transport, fetcher) = setup();
        let (start, end) = window();

        let err = fetcher
            .fetch_range(&Session::anonymous(), reliance(), start, end, Granularity::ONE_MINUTE)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::NotLoggedIn));
        assert_eq!(transport.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_reversed_range_fails_before_transport() {
        let (transport, fetcher) = setup();
        let (start, end) = window();

        let err = fetcher
            .fetch_range(&session(), reliance(), end, start, Granularity::ONE_MINUTE)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Validation(_)));
        assert_eq!(transport.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_non_success_status_is_transport_error() {
        let (transport, fetcher) = setup();
        transport.set_ohlc_reply(2885, MockReply::status(500, "Internal Server Error"));
        let (start, end) = window();

        let err = fetcher
            .fetch_range(&session(), reliance(), start, end, Granularity::ONE_MINUTE)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert!(matches!(err, ClientError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_bad_value_propagates_parse_error() {
        let (transport, fetcher) = setup();
        transport.set_ohlc_reply(
            2885,
            MockReply::ohlc(json!("1704426300|2500.5|2510|2495.25|2505.75|lots")),
        );
        let (start, end) = window();

        let err = fetcher
            .fetch_range(&session(), reliance(), start, end, Granularity::ONE_MINUTE)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Parse(FeedError::ParseError { .. })));
    }

    #[tokio::test]
    async fn test_missing_payload_is_empty_not_error() {
        let (transport, fetcher) = setup();
        transport.set_ohlc_reply(2885, MockReply::ohlc(serde_json::Value::Null));
        let (start, end) = window();

        let bars = fetcher
            .fetch_range(&session(), reliance(), start, end, Granularity::ONE_MINUTE)
            .await
            .unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn test_truncate_long_body() {
        let body = "x".repeat(500);
        let short = truncate(&body);
        assert_eq!(short.len(), 203);
        assert!(short.ends_with("..."));
        assert_eq!(truncate("short"), "short");
    }
}
