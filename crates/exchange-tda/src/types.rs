//! Wire types for the TD Ameritrade REST API.

use std::collections::{BTreeMap, HashMap};

use rj_core::{BracketOrder, ContractQuote, Direction, ExpirationKey, OptionChain};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TdaError};

// =============================================================================
// Quotes
// =============================================================================

/// `GET /v1/marketdata/{symbol}/quotes` returns a map keyed by symbol.
pub type QuoteResponse = HashMap<String, RawQuote>;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuote {
    pub last_price: Option<f64>,
    pub mark: Option<f64>,
}

impl RawQuote {
    /// Last traded price, falling back to the mark outside trading hours.
    ///
    /// # Errors
    /// Returns `TdaError::Serialization` if neither price is usable.
    pub fn price(&self) -> Result<Decimal> {
        self.last_price
            .filter(|p| p.is_finite() && *p > 0.0)
            .or(self.mark.filter(|p| p.is_finite() && *p > 0.0))
            .and_then(|p| Decimal::try_from(p).ok())
            .ok_or_else(|| TdaError::Serialization("quote has no usable price".to_string()))
    }
}

// =============================================================================
// Option chains
// =============================================================================

/// Contracts keyed by expiration (`"2024-01-19:3"`) then strike (`"400.0"`).
type RawExpDateMap = BTreeMap<String, BTreeMap<String, Vec<RawOptionContract>>>;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOptionChain {
    pub symbol: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub call_exp_date_map: RawExpDateMap,
    #[serde(default)]
    pub put_exp_date_map: RawExpDateMap,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOptionContract {
    pub symbol: Option<String>,
    pub strike_price: f64,
    pub mark: f64,
    #[serde(default)]
    pub total_volume: u64,
}

impl TryFrom<RawOptionContract> for ContractQuote {
    type Error = TdaError;

    fn try_from(raw: RawOptionContract) -> Result<Self> {
        let decimal = |field: &str, v: f64| {
            Decimal::try_from(v)
                .map_err(|_| TdaError::Serialization(format!("invalid {field} in chain: {v}")))
        };
        Ok(Self {
            symbol: raw.symbol,
            strike: decimal("strikePrice", raw.strike_price)?,
            mark: decimal("mark", raw.mark)?,
            volume: raw.total_volume,
        })
    }
}

impl RawOptionChain {
    /// Converts both sides into the engine's chain shape.
    ///
    /// # Errors
    /// Returns `TdaError::Serialization` for malformed expiration keys or prices.
    pub fn into_chain(self) -> Result<OptionChain> {
        if self.status.as_deref() == Some("FAILED") {
            return Err(TdaError::InvalidSymbol(self.symbol.unwrap_or_default()));
        }

        let mut chain = OptionChain::new();
        for (direction, side) in [
            (Direction::Call, self.call_exp_date_map),
            (Direction::Put, self.put_exp_date_map),
        ] {
            for (key, strikes) in side {
                let expiration: ExpirationKey = key
                    .parse()
                    .map_err(|e| TdaError::Serialization(format!("{e}")))?;
                let contracts = strikes
                    .into_values()
                    .flatten()
                    .map(ContractQuote::try_from)
                    .collect::<Result<Vec<_>>>()?;
                chain.insert(direction, expiration, contracts);
            }
        }
        Ok(chain)
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Order body for `POST /v1/accounts/{id}/orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub order_strategy_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_leg_collection: Vec<OrderLeg>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub child_order_strategies: Vec<OrderRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLeg {
    pub instruction: &'static str,
    pub quantity: u32,
    pub instrument: Instrument,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub symbol: String,
    pub asset_type: &'static str,
}

impl OrderRequest {
    fn single(
        order_type: &'static str,
        instruction: &'static str,
        symbol: &str,
        quantity: u32,
    ) -> Self {
        Self {
            order_strategy_type: "SINGLE",
            order_type: Some(order_type),
            session: Some("NORMAL"),
            duration: Some("DAY"),
            price: None,
            stop_price: None,
            order_leg_collection: vec![OrderLeg {
                instruction,
                quantity,
                instrument: Instrument {
                    symbol: symbol.to_string(),
                    asset_type: "OPTION",
                },
            }],
            child_order_strategies: Vec::new(),
        }
    }

    /// Limit buy at the entry price which, once filled, triggers a one-cancels-other
    /// pair: a take-profit limit sell and a stop-loss sell.
    ///
    /// # Errors
    /// Returns `TdaError::InvalidOrder` when the capital does not buy a single contract.
    pub fn bracket(order: &BracketOrder) -> Result<Self> {
        let quantity = order.quantity();
        if quantity == 0 {
            return Err(TdaError::InvalidOrder(format!(
                "capital {} does not cover one contract at {}",
                order.capital, order.entry
            )));
        }

        let mut take_profit = Self::single("LIMIT", "SELL_TO_CLOSE", &order.symbol, quantity);
        take_profit.price = Some(order.limit);

        let mut stop_loss = Self::single("STOP", "SELL_TO_CLOSE", &order.symbol, quantity);
        stop_loss.stop_price = Some(order.stop);

        let oco = Self {
            order_strategy_type: "OCO",
            order_type: None,
            session: None,
            duration: None,
            price: None,
            stop_price: None,
            order_leg_collection: Vec::new(),
            child_order_strategies: vec![take_profit, stop_loss],
        };

        let mut entry = Self::single("LIMIT", "BUY_TO_OPEN", &order.symbol, quantity);
        entry.order_strategy_type = "TRIGGER";
        entry.price = Some(order.entry);
        entry.child_order_strategies = vec![oco];
        Ok(entry)
    }
}
