//! Instrument identification types.
//!
//! An XTS instrument is addressed by its exchange segment plus the
//! exchange-assigned instrument id.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange segment (market) code as used by the XTS API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ExchangeSegment {
    /// NSE cash market.
    NseCm,
    /// NSE futures and options.
    NseFo,
    /// NSE currency derivatives.
    NseCd,
    /// BSE cash market.
    BseCm,
    /// BSE futures and options.
    BseFo,
    /// MCX commodity futures.
    McxFo,
}

impl ExchangeSegment {
    /// Numeric code sent on the wire.
    pub fn code(&self) -> i64 {
        match self {
            Self::NseCm => 1,
            Self::NseFo => 2,
            Self::NseCd => 3,
            Self::BseCm => 11,
            Self::BseFo => 12,
            Self::McxFo => 51,
        }
    }
}

impl TryFrom<i64> for ExchangeSegment {
    type Error = CoreError;

    fn try_from(code: i64) -> Result<Self> {
        match code {
            1 => Ok(Self::NseCm),
            2 => Ok(Self::NseFo),
            3 => Ok(Self::NseCd),
            11 => Ok(Self::BseCm),
            12 => Ok(Self::BseFo),
            51 => Ok(Self::McxFo),
            other => Err(CoreError::UnknownSegment(other)),
        }
    }
}

impl From<ExchangeSegment> for i64 {
    fn from(segment: ExchangeSegment) -> Self {
        segment.code()
    }
}

impl fmt::Display for ExchangeSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NseCm => "NSECM",
            Self::NseFo => "NSEFO",
            Self::NseCd => "NSECD",
            Self::BseCm => "BSECM",
            Self::BseFo => "BSEFO",
            Self::McxFo => "MCXFO",
        };
        f.write_str(name)
    }
}

/// Request key for one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct InstrumentRef {
    segment: ExchangeSegment,
    instrument_id: u64,
}

impl InstrumentRef {
    /// Create an instrument reference. Id 0 is never assigned by the exchange.
    pub fn new(segment: ExchangeSegment, instrument_id: u64) -> Result<Self> {
        if instrument_id == 0 {
            return Err(CoreError::InvalidInstrumentId(instrument_id));
        }
        Ok(Self {
            segment,
            instrument_id,
        })
    }

    /// Build from raw wire values, validating both parts.
    pub fn from_codes(segment: i64, instrument_id: u64) -> Result<Self> {
        Self::new(ExchangeSegment::try_from(segment)?, instrument_id)
    }

    pub fn segment(&self) -> ExchangeSegment {
        self.segment
    }

    pub fn instrument_id(&self) -> u64 {
        self.instrument_id
    }
}

impl fmt::Display for InstrumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.segment, self.instrument_id)
    }
}
