//! Precision-safe decimal price type.
//!
//! Uses `rust_decimal` for exact decimal values so that prices survive a
//! decode -> persist -> re-read cycle without binary floating-point drift.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Price with exact decimal precision.
///
/// The scale received from the server is preserved, so `2885.50` is written
/// back out as `2885.50`, not `2885.5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Parse decimal text, accepting scientific notation (`1.5e3`) as a fallback.
    ///
    /// Surrounding whitespace is ignored.
    pub fn parse_text(text: &str) -> Result<Self, rust_decimal::Error> {
        let text = text.trim();
        match Decimal::from_str(text) {
            Ok(d) => Ok(Self(d)),
            Err(plain_err) => Decimal::from_scientific(text)
                .map(Self)
                .map_err(|_| plain_err),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_text(s)
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}
