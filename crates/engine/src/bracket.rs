//! Take-profit and stop-loss prices around a contract mark.

use rust_decimal::Decimal;

use crate::error::TradeError;

/// Decimal places applied to the take-profit price. The stop is left unrounded.
pub const LIMIT_PRECISION: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bracket {
    pub entry: Decimal,
    pub limit: Decimal,
    pub stop: Decimal,
}

impl Bracket {
    /// `limit = round(mark + mark * ratio, 4)`, `stop = mark - mark * ratio`.
    ///
    /// # Errors
    /// `InvalidQuote` for a non-positive mark, `InvalidBracket` when either
    /// price would not be positive.
    pub fn compute(mark: Decimal, ratio: Decimal) -> Result<Self, TradeError> {
        if mark <= Decimal::ZERO {
            return Err(TradeError::InvalidQuote { mark });
        }

        let offset = mark * ratio;
        let limit = (mark + offset).round_dp(LIMIT_PRECISION);
        let stop = mark - offset;

        if limit <= Decimal::ZERO || stop <= Decimal::ZERO {
            return Err(TradeError::InvalidBracket { mark, ratio });
        }

        Ok(Self {
            entry: mark,
            limit,
            stop,
        })
    }
}
