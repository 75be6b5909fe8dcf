//! Multi-instrument retrieval with per-instrument failure isolation.

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use tracing::{info, warn};
use xts_core::{validate_range, Bar, Granularity, InstrumentRef, RetrievalRequest, Session};

use crate::error::{ClientError, ClientResult};
use crate::fetcher::InstrumentFetcher;

/// Display name → instrument, in the order the caller wants them fetched.
pub type InstrumentUniverse = IndexMap<String, InstrumentRef>;

/// Outcome of one batch.
///
/// A failed instrument is absent from `bars` and present in `failures`
/// with its error text. Both maps keep universe order.
#[derive(Debug, Default)]
pub struct NamedResultSet {
    pub bars: IndexMap<String, Vec<Bar>>,
    pub failures: IndexMap<String, String>,
}

impl NamedResultSet {
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty() && self.failures.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&[Bar]> {
        self.bars.get(name).map(Vec::as_slice)
    }

    /// Total bars across all successful instruments.
    pub fn total_bars(&self) -> usize {
        self.bars.values().map(Vec::len).sum()
    }
}

/// Last-bar line of the console summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarSummary {
    Last { name: String, bars: usize, last: Bar },
    NoData { name: String },
}

/// Runs [`InstrumentFetcher`] over an [`InstrumentUniverse`].
pub struct BatchRetriever {
    fetcher: InstrumentFetcher,
}

impl BatchRetriever {
    pub fn new(fetcher: InstrumentFetcher) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &InstrumentFetcher {
        &self.fetcher
    }

    /// Fetch every instrument sequentially, in universe order.
    ///
    /// Fails only for an unauthenticated session or an invalid range, both
    /// checked before any request. Per-instrument failures are logged and
    /// recorded in [`NamedResultSet::failures`].
    pub async fn retrieve(
        &self,
        session: &Session,
        universe: &InstrumentUniverse,
        start: DateTime<Local>,
        end: DateTime<Local>,
        granularity: Granularity,
    ) -> ClientResult<NamedResultSet> {
        if !session.is_authenticated() {
            return Err(ClientError::NotLoggedIn);
        }
        validate_range(start, end)?;

        let mut results = NamedResultSet::default();
        if universe.is_empty() {
            return Ok(results);
        }

        info!(
            instruments = universe.len(),
            start = %start,
            end = %end,
            granularity = granularity.secs(),
            "Retrieving OHLC batch"
        );

        for (name, instrument) in universe {
            let request = RetrievalRequest::new(*instrument, start, end, granularity)?;
            match self.fetcher.fetch(session, &request).await {
                Ok(bars) => {
                    info!(instrument = %name, bars = bars.len(), "OHLC retrieved");
                    results.bars.insert(name.clone(), bars);
                }
                Err(e) => {
                    warn!(instrument = %name, error = %e, "OHLC retrieval failed, continuing");
                    results.failures.insert(name.clone(), e.to_string());
                }
            }
        }

        info!(
            succeeded = results.bars.len(),
            failed = results.failures.len(),
            bars = results.total_bars(),
            "OHLC batch complete"
        );
        Ok(results)
    }

    /// Last bar per successful instrument, in result order.
    pub fn summarize(results: &NamedResultSet) -> Vec<BarSummary> {
        results
            .bars
            .iter()
            .map(|(name, bars)| match bars.last() {
                Some(last) => BarSummary::Last {
                    name: name.clone(),
                    bars: bars.len(),
                    last: last.clone(),
                },
                None => BarSummary::NoData { name: name.clone() },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockReply, MockTransport};
    use chrono::{Duration, TimeZone};
    use serde_json::json;
    use std::sync::Arc;
    use xts_core::ExchangeSegment;

    fn universe(entries: &[(&str, u64)]) -> InstrumentUniverse {
        entries
            .iter()
            .map(|(name, id)| {
                (
                    name.to_string(),
                    InstrumentRef::new(ExchangeSegment::NseCm, *id).unwrap(),
                )
            })
            .collect()
    }

    fn window() -> (DateTime<Local>, DateTime<Local>) {
        let start = Local.with_ymd_and_hms(2024, 1, 5, 9, 15, 0).unwrap();
        (start, start + Duration::minutes(30))
    }

    fn setup() -> (Arc<MockTransport>, BatchRetriever) {
        let transport = Arc::new(MockTransport::new());
        let retriever = BatchRetriever::new(InstrumentFetcher::new(transport.clone()));
        (transport, retriever)
    }

    fn three_bars() -> MockReply {
        MockReply::ohlc(json!(
            "1704426300|1|2|0.5|1.5|10\n1704426360|1.5|2|1|1.75|20\n1704426420|1.75|2|1.5|1.6|30"
        ))
    }

    #[tokio::test]
    async fn test_failed_instrument_is_isolated() {
        let (transport, retriever) = setup();
        transport.set_ohlc_reply(2885, three_bars());
        transport.set_ohlc_reply(1333, MockReply::status(503, "Service Unavailable"));
        let (start, end) = window();
        let session = Session::authenticated("tok", "U");

        let results = retriever
            .retrieve(
                &session,
                &universe(&[("A", 2885), ("B", 1333)]),
                start,
                end,
                Granularity::ONE_MINUTE,
            )
            .await
            .unwrap();

        assert_eq!(results.bars.len(), 1);
        assert_eq!(results.get("A").map(<[Bar]>::len), Some(3));
        assert!(results.get("B").is_none());
        assert!(results.failures["B"].contains("503"));
        assert_eq!(transport.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_caller_order_preserved() {
        let (transport, retriever) = setup();
        let (start, end) = window();
        let session = Session::authenticated("tok", "U");

        let results = retriever
            .retrieve(
                &session,
                &universe(&[("TCS", 11536), ("INFY", 1594), ("RELIANCE", 2885)]),
                start,
                end,
                Granularity::ONE_MINUTE,
            )
            .await
            .unwrap();

        let names: Vec<&str> = results.bars.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["TCS", "INFY", "RELIANCE"]);

        let ids: Vec<u64> = transport
            .get_queries()
            .iter()
            .map(|q| q.exchange_instrument_id)
            .collect();
        assert_eq!(ids, vec![11536, 1594, 2885]);
    }

    #[tokio::test]
    async fn test_reversed_range_fails_before_any_call() {
        let (transport, retriever) = setup();
        let (start, end) = window();
        let session = Session::authenticated("tok", "U");

        let err = retriever
            .retrieve(
                &session,
                &universe(&[("A", 2885)]),
                end,
                start,
                Granularity::ONE_MINUTE,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Validation(_)));
        assert_eq!(transport.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_unauthenticated_fails_fast() {
        let (transport, retriever) = setup();
        let (start, end) = window();

        let err = retriever
            .retrieve(
                &Session::anonymous(),
                &universe(&[("A", 2885)]),
                start,
                end,
                Granularity::ONE_MINUTE,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::NotLoggedIn));
        assert_eq!(transport.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_universe_is_empty_result() {
        let (transport, retriever) = setup();
        let (start, end) = window();
        let session = Session::authenticated("tok", "U");

        let results = retriever
            .retrieve(&session, &InstrumentUniverse::new(), start, end, Granularity::ONE_MINUTE)
            .await
            .unwrap();

        assert!(results.is_empty());
        assert_eq!(transport.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_summarize_last_bar_or_no_data() {
        let (transport, retriever) = setup();
        transport.set_ohlc_reply(2885, three_bars());
        let (start, end) = window();
        let session = Session::authenticated("tok", "U");

        let results = retriever
            .retrieve(
                &session,
                &universe(&[("A", 2885), ("B", 1333)]),
                start,
                end,
                Granularity::ONE_MINUTE,
            )
            .await
            .unwrap();

        let summary = BatchRetriever::summarize(&results);
        assert_eq!(summary.len(), 2);
        match &summary[0] {
            BarSummary::Last { name, bars, last } => {
                assert_eq!(name, "A");
                assert_eq!(*bars, 3);
                assert_eq!(last.volume(), 30);
            }
            other => panic!("unexpected summary: {other:?}"),
        }
        assert_eq!(
            summary[1],
            BarSummary::NoData {
                name: "B".to_string()
            }
        );
    }
}
