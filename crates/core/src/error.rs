//! Error types shared by every stage.
//!
//! `ValidationError` guards value construction (samples, triggers, chain keys).
//! `ConfigError` is only ever raised at startup.

use rust_decimal::Decimal;
use thiserror::Error;

/// A value failed its construction invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// NaN or infinite input.
    #[error("{field} must be a finite number")]
    NonFinite {
        /// Name of the rejected field.
        field: &'static str,
    },

    /// Prices are never negative.
    #[error("{field} must not be negative, got {value}")]
    Negative {
        /// Name of the rejected field.
        field: &'static str,
        /// The rejected value.
        value: Decimal,
    },

    /// Value must be strictly positive.
    #[error("{field} must be positive, got {value}")]
    NonPositive {
        /// Name of the rejected field.
        field: &'static str,
        /// The rejected value.
        value: Decimal,
    },

    /// Finite float that does not fit a `Decimal`.
    #[error("{field} is outside the representable decimal range: {value}")]
    OutOfRange {
        /// Name of the rejected field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Direction text did not name exactly one of call or put.
    #[error("direction must name exactly one of call or put, got {0:?}")]
    UnknownDirection(String),

    /// Chain key not in `<YYYY-MM-DD>:<dte>` form.
    #[error("invalid expiration key {0:?}, expected <YYYY-MM-DD>:<dte>")]
    InvalidExpirationKey(String),
}

/// The configuration cannot be used to start the system.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("change threshold must be non-zero; its sign selects calls (+) or puts (-)")]
    ZeroThreshold,

    #[error("evaluation window must hold at least one point")]
    ZeroWindow,

    #[error("capital must be positive, got {0}")]
    NonPositiveCapital(Decimal),

    #[error("bracket ratio must be within (0, 1), got {0}")]
    InvalidBracket(Decimal),

    #[error("invalid DTE range: min {min} is greater than max {max}")]
    InvalidDteRange {
        /// Lower bound.
        min: u32,
        /// Upper bound.
        max: u32,
    },

    #[error("option chain lookahead must be at least one day")]
    ZeroLookahead,

    #[error("poll interval must be at least one second")]
    ZeroPollInterval,

    #[error("instrument symbol must not be empty")]
    EmptyInstrument,

    #[error("missing required credential: {0}")]
    MissingCredential(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::Negative {
            field: "value",
            value: dec!(-1.5),
        };
        assert!(err.to_string().contains("-1.5"));

        let err = ValidationError::UnknownDirection("buy".to_string());
        assert!(err.to_string().contains("\"buy\""));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidDteRange { min: 5, max: 1 };
        assert!(err.to_string().contains("min 5"));
        assert!(err.to_string().contains("max 1"));

        let err = ConfigError::MissingCredential("REFRESH_TOKEN".to_string());
        assert!(err.to_string().contains("REFRESH_TOKEN"));
    }
}
