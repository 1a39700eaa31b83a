//! Values that cross the stage queues: samples (poller → evaluator) and
//! triggers (evaluator → trader).

use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A single price observation of the watched instrument.
///
/// Timestamps are a wall-clock time of day; every comparison the system makes
/// is intraday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sample {
    timestamp: NaiveTime,
    value: Decimal,
}

impl Sample {
    /// Creates a sample from an exact decimal price.
    ///
    /// # Errors
    /// Returns `ValidationError::Negative` for a negative price.
    pub fn new(timestamp: NaiveTime, value: Decimal) -> Result<Self, ValidationError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(ValidationError::Negative {
                field: "value",
                value,
            });
        }
        Ok(Self { timestamp, value })
    }

    /// Creates a sample from a floating point price, as returned by most quote APIs.
    ///
    /// # Errors
    /// Rejects NaN, infinities, values outside the `Decimal` range and negative prices.
    pub fn from_f64(timestamp: NaiveTime, value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NonFinite { field: "value" });
        }
        let value = Decimal::try_from(value).map_err(|_| ValidationError::OutOfRange {
            field: "value",
            value,
        })?;
        Self::new(timestamp, value)
    }

    #[must_use]
    pub const fn timestamp(&self) -> NaiveTime {
        self.timestamp
    }

    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.value
    }
}

/// Which side of the option chain a trigger buys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Call,
    Put,
}

impl Direction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }

    /// Single-letter right used in contract symbols.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Call => 'C',
            Self::Put => 'P',
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ValidationError;

    /// Case-insensitive substring match: `"CALL"`, `"buy-call"` and `"callExpDateMap"`
    /// all parse as `Call`. Text naming both sides, or neither, is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        match (lower.contains("call"), lower.contains("put")) {
            (true, false) => Ok(Self::Call),
            (false, true) => Ok(Self::Put),
            _ => Err(ValidationError::UnknownDirection(s.to_string())),
        }
    }
}

/// A directional intent to buy, produced when the windowed change crosses the
/// configured threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Trigger {
    direction: Direction,
    reference_price: Decimal,
    change: Decimal,
    fired_at: NaiveTime,
}

impl Trigger {
    /// # Errors
    /// Returns `ValidationError::NonPositive` unless the reference price is above zero.
    pub fn new(
        direction: Direction,
        reference_price: Decimal,
        fired_at: NaiveTime,
    ) -> Result<Self, ValidationError> {
        if reference_price <= Decimal::ZERO {
            return Err(ValidationError::NonPositive {
                field: "reference_price",
                value: reference_price,
            });
        }
        Ok(Self {
            direction,
            reference_price,
            change: Decimal::ZERO,
            fired_at,
        })
    }

    /// Records the rounded percent change that caused the trigger.
    #[must_use]
    pub fn with_change(mut self, change: Decimal) -> Self {
        self.change = change;
        self
    }

    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub const fn reference_price(&self) -> Decimal {
        self.reference_price
    }

    #[must_use]
    pub const fn change(&self) -> Decimal {
        self.change
    }

    #[must_use]
    pub const fn fired_at(&self) -> NaiveTime {
        self.fired_at
    }
}
