//! Turns triggers into bracketed orders.
//!
//! Per trigger: strike, expiration, mark, bracket, live-trading gate,
//! operator notification, then a fixed cooldown before the next trigger is
//! pulled. Triggers that arrive during the cooldown stay queued.

use std::sync::Arc;

use rj_core::{
    BracketOrder, ChainProvider, ContractQuote, Direction, ExpirationKey, Notifier, OrderAck,
    OrderSubmitter, RjConfig, Trigger,
};
use rust_decimal::Decimal;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, warn};

use crate::bracket::Bracket;
use crate::contract::{contract_symbol, format_strike, lookup_contract, resolve_expiration, select_strike};
use crate::error::TradeError;

/// Everything resolved for one trigger. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeContext {
    pub direction: Direction,
    pub reference_price: Decimal,
    pub strike: Decimal,
    pub expiration: ExpirationKey,
    pub contract: ContractQuote,
    pub bracket: Bracket,
    /// Fully-qualified contract symbol.
    pub symbol: String,
}

impl TradeContext {
    #[must_use]
    pub fn order(&self, capital: Decimal) -> BracketOrder {
        BracketOrder {
            capital,
            symbol: self.symbol.clone(),
            entry: self.bracket.entry,
            limit: self.bracket.limit,
            stop: self.bracket.stop,
        }
    }

    /// Operator-facing description of the trade.
    #[must_use]
    pub fn summary(&self, capital: Decimal) -> String {
        format!(
            "BUY {} {} exp {} ({}DTE) strike {} | capital ${} | mark {} | limit {} | stop {}",
            self.symbol,
            self.direction.as_str().to_uppercase(),
            self.expiration.date,
            self.expiration.dte,
            format_strike(self.strike),
            capital,
            self.bracket.entry,
            self.bracket.limit,
            self.bracket.stop,
        )
    }
}

/// What happened at the live-trading gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    Submitted(OrderAck),
    /// Live trading is off; nothing was sent.
    DryRun,
    /// Submission was attempted and failed.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeReport {
    pub context: TradeContext,
    pub execution: Execution,
}

pub struct Trader {
    config: Arc<RjConfig>,
    chains: Arc<dyn ChainProvider>,
    orders: Arc<dyn OrderSubmitter>,
    notifier: Arc<dyn Notifier>,
}

impl Trader {
    #[must_use]
    pub fn new(
        config: Arc<RjConfig>,
        chains: Arc<dyn ChainProvider>,
        orders: Arc<dyn OrderSubmitter>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            chains,
            orders,
            notifier,
        }
    }

    /// Resolves the contract and bracket for a trigger without side effects.
    ///
    /// # Errors
    /// `TradeError::Chain` if the chain request fails, otherwise one of the
    /// resolution failures.
    pub async fn resolve(&self, trigger: &Trigger) -> Result<TradeContext, TradeError> {
        let direction = trigger.direction();
        let strike = select_strike(trigger.reference_price());
        let trader = &self.config.trader;

        let chain = self
            .chains
            .chain(&self.config.instrument, trader.lookahead_days)
            .await
            .map_err(TradeError::Chain)?;

        let (expiration, contracts) =
            resolve_expiration(&chain, direction, trader.dte_min, trader.dte_max)?;
        let contract = lookup_contract(contracts, direction, strike, expiration.date)?.clone();
        let bracket = Bracket::compute(contract.mark, trader.bracket)?;
        let symbol = contract_symbol(&self.config.instrument, expiration.date, direction, strike);

        Ok(TradeContext {
            direction,
            reference_price: trigger.reference_price(),
            strike,
            expiration,
            contract,
            bracket,
            symbol,
        })
    }

    /// Resolves, executes (when live) and notifies for one trigger.
    ///
    /// # Errors
    /// Returns the resolution error; the operator has already been alerted for
    /// resolution failures.
    pub async fn handle(&self, trigger: &Trigger) -> Result<TradeReport, TradeError> {
        let context = match self.resolve(trigger).await {
            Ok(context) => context,
            Err(e) => {
                if e.is_resolution_failure() {
                    self.notify(&format!(
                        "MISSED {} trigger at {}: {e}",
                        trigger.direction().as_str().to_uppercase(),
                        trigger.reference_price()
                    ))
                    .await;
                }
                return Err(e);
            }
        };

        let capital = self.config.capital;
        let execution = self.execute(&context, capital).await;

        let mut message = context.summary(capital);
        match &execution {
            Execution::Submitted(_) => {}
            Execution::DryRun => message.push_str(" [dry run]"),
            Execution::Failed(reason) => {
                message.push_str(&format!(" [submission failed: {reason}]"));
            }
        }
        self.notify(&message).await;

        Ok(TradeReport { context, execution })
    }

    async fn execute(&self, context: &TradeContext, capital: Decimal) -> Execution {
        if !self.config.trader.live_trading {
            info!(symbol = %context.symbol, "live trading disabled, skipping submission");
            return Execution::DryRun;
        }

        match self.orders.submit_bracket_order(&context.order(capital)).await {
            Ok(ack) => {
                info!(
                    symbol = %context.symbol,
                    order_id = ack.order_id.as_deref().unwrap_or("-"),
                    "bracket order submitted"
                );
                Execution::Submitted(ack)
            }
            Err(e) => {
                let reason = format!("{e:#}");
                error!(symbol = %context.symbol, error = %reason, "bracket order submission failed");
                Execution::Failed(reason)
            }
        }
    }

    async fn notify(&self, message: &str) {
        if let Err(e) = self.notifier.send(message).await {
            warn!(error = %format!("{e:#}"), "notification failed");
        }
    }

    /// Logs the outcome of one trigger. Never fails.
    pub async fn process(&self, trigger: &Trigger) {
        info!(
            direction = %trigger.direction(),
            reference_price = %trigger.reference_price(),
            fired_at = %trigger.fired_at(),
            "processing trigger"
        );

        match self.handle(trigger).await {
            Ok(report) => info!(
                symbol = %report.context.symbol,
                mark = %report.context.bracket.entry,
                limit = %report.context.bracket.limit,
                stop = %report.context.bracket.stop,
                execution = ?report.execution,
                "trigger handled"
            ),
            Err(e) if e.is_resolution_failure() => {
                error!(direction = %trigger.direction(), error = %e, "trigger abandoned");
            }
            Err(e) => warn!(direction = %trigger.direction(), error = %e, "trigger skipped"),
        }
    }

    /// Processes triggers in arrival order until the queue closes, sleeping for
    /// the configured cooldown after each one.
    pub async fn run(self, mut triggers: UnboundedReceiver<Trigger>) {
        let cooldown = self.config.trader.cooldown();
        info!(
            instrument = %self.config.instrument,
            live_trading = self.config.trader.live_trading,
            cooldown_secs = cooldown.as_secs(),
            "trader started"
        );

        while let Some(trigger) = triggers.recv().await {
            self.process(&trigger).await;
            tokio::time::sleep(cooldown).await;
        }

        info!("trigger queue closed, trader stopping");
    }
}
