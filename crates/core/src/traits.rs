use crate::chain::OptionChain;
use crate::order::{BracketOrder, OrderAck};
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Latest traded price of the underlying.
    async fn current_price(&self, instrument: &str) -> Result<Decimal>;
}

#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Both sides of the chain for expirations up to `lookahead_days` out.
    async fn chain(&self, instrument: &str, lookahead_days: u32) -> Result<OptionChain>;
}

#[async_trait]
pub trait OrderSubmitter: Send + Sync {
    async fn submit_bracket_order(&self, order: &BracketOrder) -> Result<OrderAck>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<()>;
}
