//! CSV writer for OHLC batch files and stream logs.
//!
//! - Batch files are written to a temp file in the data directory and
//!   renamed over the target, so readers never see a partial batch.
//! - Stream logs are created once with a header and then only appended to.
//!   Each event is encoded in memory and written with a single `write_all`.
//! - Every write to a given path holds that path's lock from a
//!   process-wide registry.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use xts_core::{Bar, Granularity, StreamEvent, StreamEventType};
use xts_telemetry::Metrics;

use crate::error::{PersistenceError, PersistenceResult};
use crate::naming::{batch_file_name, stream_file_name};

/// Header row of a batch file.
pub const BATCH_HEADER: [&str; 7] = [
    "Timestamp",
    "Open",
    "High",
    "Low",
    "Close",
    "Volume",
    "OpenInterest",
];

/// Header row of a stream log.
pub const STREAM_HEADER: [&str; 3] = ["Timestamp", "EventType", "Message"];

/// One lock per file, shared by every writer in the process.
///
/// Entries are never evicted: the map holds one entry per distinct file
/// written during the process lifetime (one stream log plus one batch file
/// per instrument per run).
static FILE_LOCKS: Lazy<DashMap<PathBuf, Arc<Mutex<()>>>> = Lazy::new(DashMap::new);

/// Registry key for `path`: the canonical parent directory joined with the
/// file name, so `DATA/x.csv` and `./DATA/x.csv` share a lock. Falls back to
/// the path as given when the parent cannot be resolved.
fn lock_key(path: &Path) -> PathBuf {
    let Some(file_name) = path.file_name() else {
        return path.to_path_buf();
    };
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    match fs::canonicalize(parent) {
        Ok(dir) => dir.join(file_name),
        Err(_) => path.to_path_buf(),
    }
}

fn lock_for(path: &Path) -> Arc<Mutex<()>> {
    FILE_LOCKS
        .entry(lock_key(path))
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .value()
        .clone()
}

/// Quote only when a field contains `,`, `"`, `\r` or `\n`; `\n` line ends.
fn csv_builder() -> WriterBuilder {
    let mut builder = WriterBuilder::new();
    builder
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'));
    builder
}

/// Encode one CSV record to bytes.
fn encode_record<I, T>(fields: I) -> PersistenceResult<Vec<u8>>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut writer = csv_builder().from_writer(Vec::new());
    writer.write_record(fields)?;
    writer
        .into_inner()
        .map_err(|e| PersistenceError::Io(e.into_error()))
}

fn bar_record(bar: &Bar) -> [String; 7] {
    [
        bar.timestamp().to_rfc3339(),
        bar.open().to_string(),
        bar.high().to_string(),
        bar.low().to_string(),
        bar.close().to_string(),
        bar.volume().to_string(),
        bar.open_interest().to_string(),
    ]
}

/// Writer for batch files and stream logs under one data directory.
#[derive(Debug, Clone)]
pub struct CsvLogWriter {
    data_dir: PathBuf,
}

impl CsvLogWriter {
    /// Create a writer rooted at `data_dir`.
    ///
    /// The directory is created here if possible; a failure is only logged
    /// and surfaces again on the first write.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        if let Err(e) = fs::create_dir_all(&data_dir) {
            warn!(?e, dir = %data_dir.display(), "Failed to create data directory");
        }
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Write one instrument's bars as a fresh batch file.
    ///
    /// An existing file with the same computed name is replaced, never
    /// appended to. Returns the file path.
    pub fn write_batch(
        &self,
        name: &str,
        bars: &[Bar],
        start: DateTime<Local>,
        end: DateTime<Local>,
        granularity: Granularity,
    ) -> PersistenceResult<PathBuf> {
        let path = self
            .data_dir
            .join(batch_file_name(name, start, end, granularity));

        fs::create_dir_all(&self.data_dir)?;
        let lock = lock_for(&path);
        let _guard = lock.lock();

        let tmp = NamedTempFile::new_in(&self.data_dir)?;
        {
            let mut writer = csv_builder().from_writer(tmp.as_file());
            writer.write_record(BATCH_HEADER)?;
            for bar in bars {
                writer.write_record(&bar_record(bar))?;
            }
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| PersistenceError::Persist {
            path: path.clone(),
            source: e.error,
        })?;

        Metrics::batch_file_written();
        info!(
            instrument = %name,
            bars = bars.len(),
            path = %path.display(),
            "Wrote OHLC batch file"
        );
        Ok(path)
    }

    /// Create the stream log for `started_at` if it does not exist.
    ///
    /// Idempotent: a second call returns the same path and leaves the file
    /// untouched.
    pub fn ensure_stream_log(&self, started_at: DateTime<Local>) -> PersistenceResult<PathBuf> {
        let path = self.data_dir.join(stream_file_name(started_at));

        fs::create_dir_all(&self.data_dir)?;
        let lock = lock_for(&path);
        let _guard = lock.lock();

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(&encode_record(STREAM_HEADER)?)?;
                file.flush()?;
                info!(path = %path.display(), "Created stream log");
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "Stream log already exists");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(path)
    }

    /// Append one event stamped with the current time.
    ///
    /// `None` is written as an empty message field.
    pub fn append_stream_event(
        &self,
        path: &Path,
        event_type: StreamEventType,
        message: Option<&str>,
    ) -> PersistenceResult<()> {
        self.append_row(path, Local::now(), event_type, message)
    }

    /// Append an observed event with its own timestamp.
    pub fn append_event(&self, path: &Path, event: &StreamEvent) -> PersistenceResult<()> {
        self.append_row(
            path,
            event.timestamp,
            event.event_type,
            event.message.as_deref(),
        )
    }

    fn append_row(
        &self,
        path: &Path,
        timestamp: DateTime<Local>,
        event_type: StreamEventType,
        message: Option<&str>,
    ) -> PersistenceResult<()> {
        let timestamp = timestamp.to_rfc3339();
        let record = encode_record([
            timestamp.as_str(),
            event_type.as_str(),
            message.unwrap_or(""),
        ])?;

        let lock = lock_for(path);
        let _guard = lock.lock();

        // Append mode: existing rows are never rewritten.
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(&record)?;

        Metrics::stream_event(event_type.as_str());
        debug!(event_type = %event_type, path = %path.display(), "Appended stream event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;
    use xts_core::Price;

    fn bar(minute: u32, close: rust_decimal::Decimal) -> Bar {
        Bar::new(
            Local.with_ymd_and_hms(2024, 1, 5, 9, minute, 0).unwrap(),
            Price::new(dec!(2500.50)),
            Price::new(dec!(2510)),
            Price::new(dec!(2495.25)),
            Price::new(close),
            1200,
            0,
        )
    }

    fn window() -> (DateTime<Local>, DateTime<Local>) {
        (
            Local.with_ymd_and_hms(2024, 1, 5, 9, 15, 0).unwrap(),
            Local.with_ymd_and_hms(2024, 1, 5, 9, 45, 0).unwrap(),
        )
    }

    #[test]
    fn test_lock_shared_across_path_spellings() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("x.csv");
        let dotted = dir.path().join(".").join("x.csv");
        let via_parent = dir
            .path()
            .join("sub")
            .join("..")
            .join("x.csv");
        fs::create_dir(dir.path().join("sub")).unwrap();

        assert_eq!(lock_key(&plain), lock_key(&dotted));
        assert_eq!(lock_key(&plain), lock_key(&via_parent));
        assert!(Arc::ptr_eq(&lock_for(&plain), &lock_for(&dotted)));
        assert!(!Arc::ptr_eq(
            &lock_for(&plain),
            &lock_for(&dir.path().join("y.csv"))
        ));
    }

    #[test]
    fn test_lock_key_unresolvable_parent_falls_back() {
        let path = Path::new("/nonexistent-xts-dir/x.csv");
        assert_eq!(lock_key(path), path.to_path_buf());
    }

    #[test]
    fn test_encode_record_quotes_only_when_needed() {
        let plain = encode_record(["a", "b c", ""]).unwrap();
        assert_eq!(plain, b"a,b c,\n");

        let quoted = encode_record(["x", "He said, \"hi\"\n"]).unwrap();
        assert_eq!(quoted, b"x,\"He said, \"\"hi\"\"\n\"\n");

        let cr = encode_record(["line\rbreak"]).unwrap();
        assert_eq!(cr, b"\"line\rbreak\"\n");
    }

    #[test]
    fn test_write_batch_contents() {
        let dir = TempDir::new().unwrap();
        let writer = CsvLogWriter::new(dir.path());
        let (start, end) = window();

        let path = writer
            .write_batch(
                "RELIANCE",
                &[bar(15, dec!(2505.75)), bar(16, dec!(2502))],
                start,
                end,
                Granularity::ONE_MINUTE,
            )
            .unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "OHLC_RELIANCE_20240105_091500_20240105_094500_C60.csv"
        );

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Timestamp,Open,High,Low,Close,Volume,OpenInterest");
        assert!(lines[1].ends_with(",2500.50,2510,2495.25,2505.75,1200,0"));
        assert!(lines[2].ends_with(",2502,1200,0"));
    }

    #[test]
    fn test_write_batch_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let writer = CsvLogWriter::new(dir.path());
        let (start, end) = window();

        let bars = [bar(15, dec!(1)), bar(16, dec!(2)), bar(17, dec!(3))];
        let first = writer
            .write_batch("TCS", &bars, start, end, Granularity::ONE_MINUTE)
            .unwrap();
        let second = writer
            .write_batch("TCS", &bars[..1], start, end, Granularity::ONE_MINUTE)
            .unwrap();

        assert_eq!(first, second);
        let content = fs::read_to_string(&second).unwrap();
        assert_eq!(content.lines().count(), 2);

        // Only the batch file remains; the temp file was renamed away.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_ensure_stream_log_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let writer = CsvLogWriter::new(dir.path());
        let started = Local.with_ymd_and_hms(2024, 1, 5, 9, 15, 7).unwrap();

        let first = writer.ensure_stream_log(started).unwrap();
        writer
            .append_stream_event(&first, StreamEventType::Connected, Some("Socket connected"))
            .unwrap();
        let second = writer.ensure_stream_log(started).unwrap();

        assert_eq!(first, second);
        let content = fs::read_to_string(&second).unwrap();
        assert_eq!(content.matches("Timestamp,EventType,Message").count(), 1);
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_absent_message_is_empty_field() {
        let dir = TempDir::new().unwrap();
        let writer = CsvLogWriter::new(dir.path());
        let path = writer.ensure_stream_log(Local::now()).unwrap();

        writer
            .append_stream_event(&path, StreamEventType::Error, None)
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let last = content.lines().last().unwrap();
        assert!(last.ends_with(",ERROR,"));
    }

    #[test]
    fn test_new_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("DATA");
        let writer = CsvLogWriter::new(&nested);
        assert!(nested.is_dir());
        assert_eq!(writer.data_dir(), nested.as_path());
    }
}
