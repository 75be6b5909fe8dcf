//! Streamed market-data events.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Kind of streaming occurrence recorded in the stream log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamEventType {
    Connected,
    /// Best bid/offer summary tick.
    Touchline,
    /// Order-book snapshot tick.
    MarketDepth,
    Error,
}

impl StreamEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "CONNECTED",
            Self::Touchline => "TOUCHLINE",
            Self::MarketDepth => "MARKET_DEPTH",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for StreamEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamEventType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONNECTED" => Ok(Self::Connected),
            "TOUCHLINE" => Ok(Self::Touchline),
            "MARKET_DEPTH" => Ok(Self::MarketDepth),
            "ERROR" => Ok(Self::Error),
            other => Err(CoreError::UnknownEventType(other.to_string())),
        }
    }
}

/// One observed streaming occurrence. Persisted immediately, never buffered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub timestamp: DateTime<Local>,
    pub event_type: StreamEventType,
    pub message: Option<String>,
}

impl StreamEvent {
    /// Create an event stamped with the current local time.
    pub fn now(event_type: StreamEventType, message: Option<String>) -> Self {
        Self {
            timestamp: Local::now(),
            event_type,
            message,
        }
    }
}
