//! Contract resolution: strike, expiration and mark for a trigger.

use chrono::NaiveDate;
use rj_core::{ContractQuote, Direction, ExpirationKey, OptionChain};
use rust_decimal::Decimal;

use crate::error::TradeError;

/// At-the-money strike: the reference price rounded to a whole number.
///
/// Midpoints round to the even neighbour.
#[must_use]
pub fn select_strike(reference_price: Decimal) -> Decimal {
    reference_price.round()
}

/// Strike as shown to operators, always with one fractional digit.
#[must_use]
pub fn format_strike(strike: Decimal) -> String {
    format!("{strike:.1}")
}

/// First expiration, nearest date first, whose DTE lies in `[dte_min, dte_max]`.
///
/// # Errors
/// `TradeError::NoEligibleExpiration` when no expiration on that side qualifies.
pub fn resolve_expiration(
    chain: &OptionChain,
    direction: Direction,
    dte_min: u32,
    dte_max: u32,
) -> Result<(ExpirationKey, &[ContractQuote]), TradeError> {
    chain
        .side(direction)
        .iter()
        .find(|(key, _)| (dte_min..=dte_max).contains(&key.dte))
        .map(|(key, contracts)| (*key, contracts.as_slice()))
        .ok_or(TradeError::NoEligibleExpiration {
            direction,
            dte_min,
            dte_max,
        })
}

/// Contract quoted at exactly `strike` within one expiration.
///
/// # Errors
/// `TradeError::ContractNotFound` when the expiration has no such strike.
pub fn lookup_contract<'a>(
    contracts: &'a [ContractQuote],
    direction: Direction,
    strike: Decimal,
    expiration: NaiveDate,
) -> Result<&'a ContractQuote, TradeError> {
    contracts
        .iter()
        .find(|c| c.strike == strike)
        .ok_or_else(|| TradeError::ContractNotFound {
            direction,
            strike: format_strike(strike),
            expiration,
        })
}

/// Broker symbol, `<INSTRUMENT>_<MMDDYY><C|P><strike>`, e.g. `SPY_011924C400`.
#[must_use]
pub fn contract_symbol(
    instrument: &str,
    expiration: NaiveDate,
    direction: Direction,
    strike: Decimal,
) -> String {
    format!(
        "{}_{}{}{}",
        instrument.to_ascii_uppercase(),
        expiration.format("%m%d%y"),
        direction.code(),
        strike.normalize()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote(strike: Decimal, mark: Decimal) -> ContractQuote {
        ContractQuote {
            symbol: None,
            strike,
            mark,
            volume: 100,
        }
    }

    fn key(s: &str) -> ExpirationKey {
        s.parse().unwrap()
    }

    fn chain_with_dtes() -> OptionChain {
        let mut chain = OptionChain::new();
        chain.insert(Direction::Call, key("2024-01-17:1"), [quote(dec!(400), dec!(1.10))]);
        chain.insert(Direction::Call, key("2024-01-19:3"), [quote(dec!(400), dec!(2.20))]);
        chain.insert(Direction::Call, key("2024-01-21:5"), [quote(dec!(400), dec!(3.30))]);
        chain
    }

    #[test]
    fn test_strike_rounds_to_nearest_whole() {
        assert_eq!(format_strike(select_strike(dec!(400.4))), "400.0");
        assert_eq!(format_strike(select_strike(dec!(400.6))), "401.0");
        assert_eq!(format_strike(select_strike(dec!(399.5))), "400.0");
        assert_eq!(format_strike(select_strike(dec!(400.5))), "400.0");
    }

    #[test]
    fn test_selects_earliest_expiration_in_range() {
        let chain = chain_with_dtes();
        let (expiration, contracts) = resolve_expiration(&chain, Direction::Call, 3, 5).unwrap();
        assert_eq!(expiration.dte, 3);
        assert_eq!(contracts[0].mark, dec!(2.20));
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let chain = chain_with_dtes();
        let (expiration, _) = resolve_expiration(&chain, Direction::Call, 5, 5).unwrap();
        assert_eq!(expiration.dte, 5);
        let (expiration, _) = resolve_expiration(&chain, Direction::Call, 0, 1).unwrap();
        assert_eq!(expiration.dte, 1);
    }

    #[test]
    fn test_no_eligible_expiration() {
        let chain = chain_with_dtes();
        let err = resolve_expiration(&chain, Direction::Call, 6, 10).unwrap_err();
        assert!(matches!(err, TradeError::NoEligibleExpiration { dte_min: 6, dte_max: 10, .. }));
    }

    #[test]
    fn test_sides_are_separate() {
        let chain = chain_with_dtes();
        assert!(matches!(
            resolve_expiration(&chain, Direction::Put, 1, 5),
            Err(TradeError::NoEligibleExpiration { direction: Direction::Put, .. })
        ));
    }

    #[test]
    fn test_lookup_contract_by_strike() {
        let contracts = [quote(dec!(399), dec!(1.5)), quote(dec!(400.0), dec!(1.2))];
        let expiration = NaiveDate::from_ymd_opt(2024, 1, 19).unwrap();

        let found = lookup_contract(&contracts, Direction::Call, dec!(400), expiration).unwrap();
        assert_eq!(found.mark, dec!(1.2));

        let err = lookup_contract(&contracts, Direction::Call, dec!(401), expiration).unwrap_err();
        assert_eq!(
            err.to_string(),
            "no call contract at strike 401.0 expiring 2024-01-19"
        );
    }

    #[test]
    fn test_contract_symbol() {
        let expiration = NaiveDate::from_ymd_opt(2024, 1, 19).unwrap();
        assert_eq!(
            contract_symbol("SPY", expiration, Direction::Call, dec!(400.0)),
            "SPY_011924C400"
        );
        assert_eq!(
            contract_symbol("spy", expiration, Direction::Put, dec!(400.50)),
            "SPY_011924P400.5"
        );
    }
}
