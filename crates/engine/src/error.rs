use chrono::NaiveDate;
use rj_core::Direction;
use rust_decimal::Decimal;
use thiserror::Error;

/// Why a trigger could not be turned into an order.
#[derive(Debug, Error)]
pub enum TradeError {
    #[error("no {direction} expiration with DTE in [{dte_min}, {dte_max}]")]
    NoEligibleExpiration {
        direction: Direction,
        dte_min: u32,
        dte_max: u32,
    },

    #[error("no {direction} contract at strike {strike} expiring {expiration}")]
    ContractNotFound {
        direction: Direction,
        strike: String,
        expiration: NaiveDate,
    },

    #[error("contract mark must be positive, got {mark}")]
    InvalidQuote { mark: Decimal },

    #[error("bracket ratio {ratio} produces a non-positive price for mark {mark}")]
    InvalidBracket { mark: Decimal, ratio: Decimal },

    /// The chain capability itself failed.
    #[error("option chain request failed: {0:#}")]
    Chain(anyhow::Error),
}

impl TradeError {
    /// Terminal for the trigger: the market data was fetched but yields no tradeable contract.
    #[must_use]
    pub const fn is_resolution_failure(&self) -> bool {
        !matches!(self, Self::Chain(_))
    }
}
