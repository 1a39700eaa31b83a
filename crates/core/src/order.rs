//! Bracketed buy order handed to the order-submission capability.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Standard US equity option multiplier.
pub const CONTRACT_MULTIPLIER: u32 = 100;

/// Entry with a simultaneous take-profit (`limit`) and stop-loss (`stop`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketOrder {
    /// Capital committed to the position, in currency units.
    pub capital: Decimal,
    /// Fully-qualified contract symbol, e.g. `SPY_011924C400`.
    pub symbol: String,
    pub entry: Decimal,
    pub limit: Decimal,
    pub stop: Decimal,
}

impl BracketOrder {
    /// Whole contracts the capital buys at the entry price.
    ///
    /// Returns 0 when the capital does not cover a single contract.
    #[must_use]
    pub fn quantity(&self) -> u32 {
        if self.entry <= Decimal::ZERO {
            return 0;
        }
        let contract_cost = self.entry * Decimal::from(CONTRACT_MULTIPLIER);
        (self.capital / contract_cost).floor().to_u32().unwrap_or(0)
    }
}

/// Broker acknowledgement of a submitted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: Option<String>,
}
