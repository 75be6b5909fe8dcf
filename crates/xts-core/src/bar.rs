//! Canonical in-memory OHLC bar.
//!
//! Every payload shape the server may return is normalized into [`Bar`].

use crate::Price;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// A single OHLC candle for one time bucket.
///
/// Immutable once constructed: fields are private and only exposed by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    timestamp: DateTime<Local>,
    open: Price,
    high: Price,
    low: Price,
    close: Price,
    volume: u64,
    open_interest: u64,
}

impl Bar {
    /// Create a new bar.
    pub fn new(
        timestamp: DateTime<Local>,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: u64,
        open_interest: u64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            open_interest,
        }
    }

    /// Start of the bucket, in local time.
    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn open(&self) -> Price {
        self.open
    }

    pub fn high(&self) -> Price {
        self.high
    }

    pub fn low(&self) -> Price {
        self.low
    }

    pub fn close(&self) -> Price {
        self.close
    }

    pub fn volume(&self) -> u64 {
        self.volume
    }

    /// Open interest; 0 when the server did not supply it.
    pub fn open_interest(&self) -> u64 {
        self.open_interest
    }
}

/// Check that timestamps never go backwards.
pub fn is_chronological(bars: &[Bar]) -> bool {
    bars.windows(2).all(|w| w[0].timestamp <= w[1].timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn bar_at(secs: i64) -> Bar {
        let ts = Local.timestamp_opt(secs, 0).unwrap();
        let px = Price::new(dec!(100));
        Bar::new(ts, px, px, px, px, 10, 0)
    }

    #[test]
    fn test_is_chronological() {
        assert!(is_chronological(&[]));
        assert!(is_chronological(&[bar_at(60), bar_at(60), bar_at(120)]));
        assert!(!is_chronological(&[bar_at(120), bar_at(60)]));
    }

    #[test]
    fn test_accessors() {
        let bar = bar_at(1_700_000_000);
        assert_eq!(bar.timestamp().timestamp(), 1_700_000_000);
        assert_eq!(bar.close().inner(), dec!(100));
        assert_eq!(bar.volume(), 10);
        assert_eq!(bar.open_interest(), 0);
    }
}
