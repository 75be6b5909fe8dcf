//! Read batch files and stream logs back.

use std::path::Path;

use chrono::{DateTime, Local};
use csv::{ReaderBuilder, StringRecord};
use xts_core::{Bar, Price, StreamEventType};

use crate::error::{PersistenceError, PersistenceResult};
use crate::writer::{BATCH_HEADER, STREAM_HEADER};

/// One row of a stream log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRecord {
    pub timestamp: DateTime<Local>,
    pub event_type: StreamEventType,
    pub message: String,
}

/// Parse a batch file into bars, in file order.
pub fn read_batch(path: &Path) -> PersistenceResult<Vec<Bar>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    check_header(path, reader.headers()?, &BATCH_HEADER)?;

    let mut bars = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let get = |idx: usize| field(path, row, &record, idx);
        let price = |idx: usize| -> PersistenceResult<Price> {
            get(idx)?
                .parse::<Price>()
                .map_err(|e| malformed(path, row, format!("{}: {e}", BATCH_HEADER[idx])))
        };
        let count = |idx: usize| -> PersistenceResult<u64> {
            get(idx)?
                .parse::<u64>()
                .map_err(|e| malformed(path, row, format!("{}: {e}", BATCH_HEADER[idx])))
        };

        bars.push(Bar::new(
            parse_timestamp(path, row, get(0)?)?,
            price(1)?,
            price(2)?,
            price(3)?,
            price(4)?,
            count(5)?,
            count(6)?,
        ));
    }
    Ok(bars)
}

/// Parse a stream log into records, in file order.
pub fn read_stream_log(path: &Path) -> PersistenceResult<Vec<StreamRecord>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    check_header(path, reader.headers()?, &STREAM_HEADER)?;

    let mut records = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let timestamp = parse_timestamp(path, row, field(path, row, &record, 0)?)?;
        let event_type = field(path, row, &record, 1)?
            .parse::<StreamEventType>()
            .map_err(|e| malformed(path, row, e.to_string()))?;
        let message = field(path, row, &record, 2)?.to_string();
        records.push(StreamRecord {
            timestamp,
            event_type,
            message,
        });
    }
    Ok(records)
}

fn check_header(path: &Path, header: &StringRecord, expected: &[&str]) -> PersistenceResult<()> {
    if header.iter().ne(expected.iter().copied()) {
        return Err(malformed(
            path,
            0,
            format!("unexpected header {:?}", header.iter().collect::<Vec<_>>()),
        ));
    }
    Ok(())
}

fn field<'r>(path: &Path, row: usize, record: &'r StringRecord, idx: usize) -> PersistenceResult<&'r str> {
    record
        .get(idx)
        .ok_or_else(|| malformed(path, row, format!("missing field {idx}")))
}

fn parse_timestamp(path: &Path, row: usize, text: &str) -> PersistenceResult<DateTime<Local>> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Local))
        .map_err(|e| malformed(path, row, format!("Timestamp: {e}")))
}

fn malformed(path: &Path, row: usize, message: impl Into<String>) -> PersistenceError {
    PersistenceError::Malformed {
        path: path.to_path_buf(),
        row,
        message: message.into(),
    }
}
