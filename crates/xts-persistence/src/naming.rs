//! Deterministic log file names.

use chrono::{DateTime, Local};
use xts_core::Granularity;

/// Timestamp layout used inside file names.
const FILE_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Characters not allowed in file names on any supported platform.
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replace characters illegal in file names with `_`. Blank → `UNKNOWN`.
pub fn sanitize_name(name: &str) -> String {
    if name.trim().is_empty() {
        return "UNKNOWN".to_string();
    }
    name.chars()
        .map(|c| {
            if ILLEGAL_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// `OHLC_<name>_<start>_<end>_C<granularity>.csv`
pub fn batch_file_name(
    name: &str,
    start: DateTime<Local>,
    end: DateTime<Local>,
    granularity: Granularity,
) -> String {
    format!(
        "OHLC_{}_{}_{}_C{}.csv",
        sanitize_name(name),
        start.format(FILE_TIME_FORMAT),
        end.format(FILE_TIME_FORMAT),
        granularity.secs()
    )
}

/// `STREAM_<started_at>.csv`
pub fn stream_file_name(started_at: DateTime<Local>) -> String {
    format!("STREAM_{}.csv", started_at.format(FILE_TIME_FORMAT))
}
