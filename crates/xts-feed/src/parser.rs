//! OHLC payload parsing.
//!
//! Supports the two payload shapes observed from the OHLC endpoint:
//! 1. Delimited text: `"1704426300|2885.5|2890|2880.05|2887.2|15230|0\n..."`
//! 2. Structured rows: `[[1704426300, 2885.5, 2890, 2880.05, 2887.2, 15230, 0], ...]`
//!
//! Rows that are too short are dropped (sparse upstream data). A value that
//! cannot be decoded inside an accepted row fails the whole call.

use crate::error::{FeedError, FeedResult};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};
use xts_core::{is_chronological, Bar, Price, SERVER_TIME_FORMAT};

/// Minimum number of fields for a row to be considered a bar.
const MIN_FIELDS: usize = 6;

/// Field separator inside a delimited-text record.
const FIELD_DELIMITER: char = '|';

/// Naive date-time layouts tried after RFC 3339, interpreted as local time.
const NAIVE_LAYOUTS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", SERVER_TIME_FORMAT];

/// Row/column counters for decoded payloads.
#[derive(Debug, Default)]
pub struct DecodeStats {
    /// Rows turned into bars.
    pub accepted_count: AtomicU64,
    /// Rows skipped for having too few fields.
    pub dropped_count: AtomicU64,
}

impl DecodeStats {
    pub fn record_accepted(&self) {
        self.accepted_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn accepted(&self) -> u64 {
        self.accepted_count.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }
}

/// Bar columns in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Timestamp,
    Open,
    High,
    Low,
    Close,
    Volume,
    OpenInterest,
}

impl Column {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Timestamp => "Timestamp",
            Self::Open => "Open",
            Self::High => "High",
            Self::Low => "Low",
            Self::Close => "Close",
            Self::Volume => "Volume",
            Self::OpenInterest => "OpenInterest",
        }
    }
}

/// Shape of the `dataReponse` node, discriminated at runtime.
#[derive(Debug, Clone, Copy)]
pub enum OhlcPayload<'a> {
    /// Null or missing: no bars.
    Absent,
    /// Newline-separated records of pipe-separated fields.
    DelimitedText(&'a str),
    /// Array of row arrays.
    StructuredRows(&'a [Value]),
}

impl<'a> OhlcPayload<'a> {
    /// Classify a JSON node by its kind.
    pub fn classify(value: &'a Value) -> FeedResult<Self> {
        match value {
            Value::Null => Ok(Self::Absent),
            Value::String(text) => Ok(Self::DelimitedText(text)),
            Value::Array(rows) => Ok(Self::StructuredRows(rows)),
            Value::Bool(_) => Err(FeedError::UnsupportedPayload("bool")),
            Value::Number(_) => Err(FeedError::UnsupportedPayload("number")),
            Value::Object(_) => Err(FeedError::UnsupportedPayload("object")),
        }
    }
}

/// OHLC response envelope.
///
/// Format: `{"type": "success", "code": "...", "description": "...",
/// "result": {"exchangeSegment": 1, "exchangeInstrumentID": 2885, "dataReponse": ...}}`
#[derive(Debug, Deserialize)]
pub struct OhlcResponse {
    #[serde(rename = "type", default)]
    pub response_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub result: Option<OhlcResult>,
}

/// `result` node of the OHLC envelope.
#[derive(Debug, Deserialize)]
pub struct OhlcResult {
    #[serde(rename = "exchangeSegment", default)]
    pub exchange_segment: Option<i64>,
    #[serde(rename = "exchangeInstrumentID", default)]
    pub exchange_instrument_id: Option<u64>,
    /// The server spells this field `dataReponse`.
    #[serde(rename = "dataReponse", alias = "data", default)]
    pub data: Value,
}

/// Decoder from raw OHLC payloads to bars.
pub struct BarDecoder {
    stats: DecodeStats,
}

impl BarDecoder {
    /// Create a new decoder.
    pub fn new() -> Self {
        Self {
            stats: DecodeStats::default(),
        }
    }

    /// Get decode statistics.
    pub fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    /// Decode a full OHLC response body (envelope included).
    pub fn decode_response(&self, body: &str) -> FeedResult<Vec<Bar>> {
        let response: OhlcResponse = serde_json::from_str(body)?;

        let result = response.result.ok_or_else(|| {
            FeedError::InvalidEnvelope(format!(
                "missing result (type={:?}, description={:?})",
                response.response_type, response.description
            ))
        })?;

        debug!(
            segment = ?result.exchange_segment,
            instrument_id = ?result.exchange_instrument_id,
            code = ?response.code,
            "Decoding OHLC response"
        );

        self.decode(&result.data)
    }

    /// Decode a payload node of unknown shape.
    pub fn decode(&self, payload: &Value) -> FeedResult<Vec<Bar>> {
        let bars = match OhlcPayload::classify(payload)? {
            OhlcPayload::Absent => Vec::new(),
            OhlcPayload::DelimitedText(text) => self.decode_text(text)?,
            OhlcPayload::StructuredRows(rows) => self.decode_rows(rows)?,
        };

        // Server order is kept as-is; a regression is only reported.
        if !is_chronological(&bars) {
            warn!(bars = bars.len(), "OHLC payload timestamps are not chronological");
        }

        Ok(bars)
    }

    /// Decode the delimited-text shape.
    fn decode_text(&self, text: &str) -> FeedResult<Vec<Bar>> {
        let mut bars = Vec::new();

        // Rows are numbered by raw line so errors point at the payload line.
        for (row, record) in text
            .split('\n')
            .enumerate()
            .filter(|(_, r)| !r.trim().is_empty())
        {
            let fields: Vec<&str> = record.split(FIELD_DELIMITER).map(str::trim).collect();
            if fields.len() < MIN_FIELDS {
                self.stats.record_dropped();
                debug!(row, fields = fields.len(), "Dropping short OHLC record");
                continue;
            }

            let open_interest = match fields.get(6) {
                Some(field) => parse_count_text(row, Column::OpenInterest, field)?,
                None => 0,
            };

            bars.push(Bar::new(
                parse_time_text(row, fields[0])?,
                parse_price_text(row, Column::Open, fields[1])?,
                parse_price_text(row, Column::High, fields[2])?,
                parse_price_text(row, Column::Low, fields[3])?,
                parse_price_text(row, Column::Close, fields[4])?,
                parse_count_text(row, Column::Volume, fields[5])?,
                open_interest,
            ));
            self.stats.record_accepted();
        }

        Ok(bars)
    }

    /// Decode the structured-rows shape.
    fn decode_rows(&self, rows: &[Value]) -> FeedResult<Vec<Bar>> {
        let mut bars = Vec::with_capacity(rows.len());

        for (row, value) in rows.iter().enumerate() {
            let cells = match value.as_array() {
                Some(cells) if cells.len() >= MIN_FIELDS => cells,
                Some(cells) => {
                    self.stats.record_dropped();
                    debug!(row, cells = cells.len(), "Dropping short OHLC row");
                    continue;
                }
                None => {
                    self.stats.record_dropped();
                    debug!(row, "Dropping non-array OHLC row");
                    continue;
                }
            };

            let open_interest = match cells.get(6) {
                Some(cell) => parse_count_cell(row, Column::OpenInterest, cell)?,
                None => 0,
            };

            bars.push(Bar::new(
                parse_time_cell(row, &cells[0])?,
                parse_price_cell(row, Column::Open, &cells[1])?,
                parse_price_cell(row, Column::High, &cells[2])?,
                parse_price_cell(row, Column::Low, &cells[3])?,
                parse_price_cell(row, Column::Close, &cells[4])?,
                parse_count_cell(row, Column::Volume, &cells[5])?,
                open_interest,
            ));
            self.stats.record_accepted();
        }

        Ok(bars)
    }
}

impl Default for BarDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_error(row: usize, column: Column, message: String) -> FeedError {
    FeedError::ParseError {
        row,
        column: column.name(),
        message,
    }
}

fn from_unix(row: usize, secs: i64) -> FeedResult<DateTime<Local>> {
    DateTime::from_timestamp(secs, 0)
        .map(|utc| utc.with_timezone(&Local))
        .ok_or_else(|| parse_error(row, Column::Timestamp, format!("epoch {secs} out of range")))
}

/// Delimited-text timestamps are always unix epoch seconds.
fn parse_time_text(row: usize, field: &str) -> FeedResult<DateTime<Local>> {
    let secs: i64 = field
        .parse()
        .map_err(|e| parse_error(row, Column::Timestamp, format!("'{field}': {e}")))?;
    from_unix(row, secs)
}

fn parse_price_text(row: usize, column: Column, field: &str) -> FeedResult<Price> {
    Price::parse_text(field).map_err(|e| parse_error(row, column, format!("'{field}': {e}")))
}

fn parse_count_text(row: usize, column: Column, field: &str) -> FeedResult<u64> {
    field
        .parse()
        .map_err(|e| parse_error(row, column, format!("'{field}': {e}")))
}

/// Structured timestamps are either unix seconds or a date-time string.
fn parse_time_cell(row: usize, cell: &Value) -> FeedResult<DateTime<Local>> {
    match cell {
        Value::Number(n) => {
            let secs = n.as_i64().ok_or_else(|| {
                parse_error(row, Column::Timestamp, format!("'{n}' is not an integer epoch"))
            })?;
            from_unix(row, secs)
        }
        Value::String(text) => parse_datetime(text)
            .ok_or_else(|| parse_error(row, Column::Timestamp, format!("'{text}' is not a date-time"))),
        other => Err(parse_error(
            row,
            Column::Timestamp,
            format!("unexpected JSON value {other}"),
        )),
    }
}

/// Generic date-time parsing: RFC 3339, naive ISO forms, the server format,
/// then bare epoch seconds.
fn parse_datetime(text: &str) -> Option<DateTime<Local>> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Local));
    }

    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
            return Local.from_local_datetime(&naive).earliest();
        }
    }

    text.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|utc| utc.with_timezone(&Local))
}

fn parse_price_cell(row: usize, column: Column, cell: &Value) -> FeedResult<Price> {
    match cell {
        // With arbitrary_precision the number keeps its source text.
        Value::Number(n) => parse_price_text(row, column, &n.to_string()),
        Value::String(text) => parse_price_text(row, column, text),
        other => Err(parse_error(row, column, format!("unexpected JSON value {other}"))),
    }
}

fn parse_count_cell(row: usize, column: Column, cell: &Value) -> FeedResult<u64> {
    match cell {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| parse_error(row, column, format!("'{n}' is not a non-negative integer"))),
        Value::String(text) => parse_count_text(row, column, text.trim()),
        other => Err(parse_error(row, column, format!("unexpected JSON value {other}"))),
    }
}
