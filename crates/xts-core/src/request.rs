//! Validated retrieval parameters.

use crate::error::{CoreError, Result};
use crate::InstrumentRef;
use chrono::{DateTime, Local};
use std::fmt;
use std::num::NonZeroU32;

/// Time format the OHLC endpoint expects for `startTime`/`endTime`
/// (e.g. `Jan 05 2024 091500`).
pub const SERVER_TIME_FORMAT: &str = "%b %d %Y %H%M%S";

/// Bar width in seconds (the server's "compression value").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Granularity(NonZeroU32);

impl Granularity {
    /// One-minute bars.
    pub const ONE_MINUTE: Self = Self(match NonZeroU32::new(60) {
        Some(v) => v,
        None => unreachable!(),
    });

    pub fn from_secs(secs: u32) -> Result<Self> {
        NonZeroU32::new(secs)
            .map(Self)
            .ok_or(CoreError::InvalidGranularity(u64::from(secs)))
    }

    pub fn secs(&self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One OHLC retrieval: instrument, closed time range and bar width.
///
/// Construction rejects `end < start`, so a value of this type is always
/// safe to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalRequest {
    instrument: InstrumentRef,
    start: DateTime<Local>,
    end: DateTime<Local>,
    granularity: Granularity,
}

impl RetrievalRequest {
    pub fn new(
        instrument: InstrumentRef,
        start: DateTime<Local>,
        end: DateTime<Local>,
        granularity: Granularity,
    ) -> Result<Self> {
        validate_range(start, end)?;
        Ok(Self {
            instrument,
            start,
            end,
            granularity,
        })
    }

    pub fn instrument(&self) -> InstrumentRef {
        self.instrument
    }

    pub fn start(&self) -> DateTime<Local> {
        self.start
    }

    pub fn end(&self) -> DateTime<Local> {
        self.end
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Start bound in server format.
    pub fn start_param(&self) -> String {
        self.start.format(SERVER_TIME_FORMAT).to_string()
    }

    /// End bound in server format.
    pub fn end_param(&self) -> String {
        self.end.format(SERVER_TIME_FORMAT).to_string()
    }
}

/// Reject a range whose end precedes its start. Equal bounds are allowed.
pub fn validate_range(start: DateTime<Local>, end: DateTime<Local>) -> Result<()> {
    if end < start {
        return Err(CoreError::InvalidRange {
            start: start.to_rfc3339(),
            end: end.to_rfc3339(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExchangeSegment;
    use chrono::{Duration, TimeZone};

    fn reliance() -> InstrumentRef {
        InstrumentRef::new(ExchangeSegment::NseCm, 2885).unwrap()
    }

    #[test]
    fn test_end_before_start_rejected() {
        let start = Local.with_ymd_and_hms(2024, 1, 5, 9, 30, 0).unwrap();
        let end = start - Duration::minutes(1);
        let err = RetrievalRequest::new(reliance(), start, end, Granularity::ONE_MINUTE);
        assert!(matches!(err, Err(CoreError::InvalidRange { .. })));
    }

    #[test]
    fn test_equal_bounds_accepted() {
        let t = Local.with_ymd_and_hms(2024, 1, 5, 9, 30, 0).unwrap();
        assert!(RetrievalRequest::new(reliance(), t, t, Granularity::ONE_MINUTE).is_ok());
    }

    #[test]
    fn test_server_time_format() {
        let start = Local.with_ymd_and_hms(2024, 1, 5, 9, 15, 0).unwrap();
        let end = Local.with_ymd_and_hms(2024, 1, 5, 15, 30, 0).unwrap();
        let req = RetrievalRequest::new(reliance(), start, end, Granularity::ONE_MINUTE).unwrap();
        assert_eq!(req.start_param(), "Jan 05 2024 091500");
        assert_eq!(req.end_param(), "Jan 05 2024 153000");
    }

    #[test]
    fn test_zero_granularity_rejected() {
        assert!(Granularity::from_secs(0).is_err());
        assert_eq!(Granularity::from_secs(300).unwrap().secs(), 300);
        assert_eq!(Granularity::ONE_MINUTE.secs(), 60);
    }
}
