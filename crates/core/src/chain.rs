//! Option chain value types, in the shape the chain capability returns:
//! one map per side, keyed by `"<expiration>:<dte>"`, each holding the quoted
//! contracts for that expiration.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::events::Direction;

/// Chain key: expiration date plus days-to-expiration as reported by the broker.
///
/// Ordering is by date first, so iterating a `BTreeMap` of keys walks expirations
/// from nearest to furthest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExpirationKey {
    pub date: NaiveDate,
    pub dte: u32,
}

impl fmt::Display for ExpirationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.date.format("%Y-%m-%d"), self.dte)
    }
}

impl FromStr for ExpirationKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidExpirationKey(s.to_string());
        let (date, dte) = s.split_once(':').ok_or_else(invalid)?;
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| invalid())?;
        let dte = dte.trim().parse::<u32>().map_err(|_| invalid())?;
        Ok(Self { date, dte })
    }
}

/// One quoted contract within an expiration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractQuote {
    /// Broker symbol, when the chain provides one.
    pub symbol: Option<String>,
    pub strike: Decimal,
    /// Current quoted price of the contract.
    pub mark: Decimal,
    pub volume: u64,
}

/// Both sides of an option chain for one underlying.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionChain {
    pub call: BTreeMap<ExpirationKey, Vec<ContractQuote>>,
    pub put: BTreeMap<ExpirationKey, Vec<ContractQuote>>,
}

impl OptionChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expirations for one side, nearest first.
    #[must_use]
    pub const fn side(&self, direction: Direction) -> &BTreeMap<ExpirationKey, Vec<ContractQuote>> {
        match direction {
            Direction::Call => &self.call,
            Direction::Put => &self.put,
        }
    }

    /// Appends contracts to an expiration on one side.
    pub fn insert(
        &mut self,
        direction: Direction,
        expiration: ExpirationKey,
        contracts: impl IntoIterator<Item = ContractQuote>,
    ) {
        let side = match direction {
            Direction::Call => &mut self.call,
            Direction::Put => &mut self.put,
        };
        side.entry(expiration).or_default().extend(contracts);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.call.is_empty() && self.put.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote(strike: Decimal) -> ContractQuote {
        ContractQuote {
            symbol: None,
            strike,
            mark: dec!(1.00),
            volume: 10,
        }
    }

    #[test]
    fn test_expiration_key_parse() {
        let key: ExpirationKey = "2024-01-19:3".parse().unwrap();
        assert_eq!(key.date, NaiveDate::from_ymd_opt(2024, 1, 19).unwrap());
        assert_eq!(key.dte, 3);
        assert_eq!(key.to_string(), "2024-01-19:3");
    }

    #[test]
    fn test_expiration_key_rejects_malformed() {
        assert!("2024-01-19".parse::<ExpirationKey>().is_err());
        assert!("2024-13-01:3".parse::<ExpirationKey>().is_err());
        assert!("2024-01-19:-1".parse::<ExpirationKey>().is_err());
        assert!(":3".parse::<ExpirationKey>().is_err());
    }

    #[test]
    fn test_side_iterates_nearest_expiration_first() {
        let mut chain = OptionChain::new();
        chain.insert(Direction::Put, "2024-01-24:5".parse().unwrap(), [quote(dec!(400))]);
        chain.insert(Direction::Put, "2024-01-20:1".parse().unwrap(), [quote(dec!(400))]);
        chain.insert(Direction::Put, "2024-01-22:3".parse().unwrap(), [quote(dec!(400))]);

        let dtes: Vec<u32> = chain.side(Direction::Put).keys().map(|k| k.dte).collect();
        assert_eq!(dtes, vec![1, 3, 5]);
        assert!(chain.side(Direction::Call).is_empty());
    }

    #[test]
    fn test_insert_appends_to_existing_expiration() {
        let mut chain = OptionChain::new();
        let key: ExpirationKey = "2024-01-22:3".parse().unwrap();
        chain.insert(Direction::Call, key, [quote(dec!(400))]);
        chain.insert(Direction::Call, key, [quote(dec!(401))]);
        assert_eq!(chain.call[&key].len(), 2);
        assert!(!chain.is_empty());
    }
}
