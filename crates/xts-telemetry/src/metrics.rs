//! Prometheus metrics for OHLC retrieval and persistence.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`: a failure means duplicate metric
//! names, which is a programming error caught at first use.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, register_int_counter, CounterVec, Encoder,
    Histogram, IntCounter, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// OHLC requests by outcome.
/// Labels: result (ok/transport_error/parse_error/other_error)
pub static OHLC_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "xts_ohlc_requests_total",
        "Total OHLC retrieval requests by outcome",
        &["result"]
    )
    .unwrap()
});

/// OHLC round-trip latency in milliseconds.
pub static OHLC_FETCH_LATENCY_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "xts_ohlc_fetch_latency_ms",
        "OHLC request round-trip latency in milliseconds",
        vec![10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap()
});

/// Bars produced by the decoder.
pub static BARS_DECODED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("xts_bars_decoded_total", "Total OHLC bars decoded").unwrap()
});

/// Rows skipped for having too few fields.
pub static ROWS_DROPPED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "xts_rows_dropped_total",
        "Total malformed OHLC rows dropped during decoding"
    )
    .unwrap()
});

/// Stream events persisted.
/// Labels: event_type (CONNECTED/TOUCHLINE/MARKET_DEPTH/ERROR)
pub static STREAM_EVENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "xts_stream_events_total",
        "Total stream events appended to the stream log",
        &["event_type"]
    )
    .unwrap()
});

/// Batch CSV files written.
pub static BATCH_FILES_WRITTEN_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "xts_batch_files_written_total",
        "Total OHLC batch files written"
    )
    .unwrap()
});

/// Metrics helper.
pub struct Metrics;

impl Metrics {
    /// Record the outcome of one OHLC request.
    pub fn ohlc_request(result: &str) {
        OHLC_REQUESTS_TOTAL.with_label_values(&[result]).inc();
    }

    /// Record OHLC round-trip latency.
    pub fn ohlc_latency(latency_ms: f64) {
        OHLC_FETCH_LATENCY_MS.observe(latency_ms);
    }

    /// Record decoded bars.
    pub fn bars_decoded(count: u64) {
        BARS_DECODED_TOTAL.inc_by(count);
    }

    /// Record dropped rows.
    pub fn rows_dropped(count: u64) {
        ROWS_DROPPED_TOTAL.inc_by(count);
    }

    /// Record one persisted stream event.
    pub fn stream_event(event_type: &str) {
        STREAM_EVENTS_TOTAL.with_label_values(&[event_type]).inc();
    }

    /// Record one batch file written.
    pub fn batch_file_written() {
        BATCH_FILES_WRITTEN_TOTAL.inc();
    }

    /// Render all registered metrics in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
