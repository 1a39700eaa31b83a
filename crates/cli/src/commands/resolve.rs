//! `rj resolve`: one-shot contract resolution against the live chain.
//!
//! Prices the instrument now, builds a trigger in the requested direction and
//! prints what the trader would buy. Nothing is ever submitted.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use rj_core::{Direction, QuoteProvider, Trigger};
use rj_engine::Trader;
use rj_notify::LogNotifier;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Side of the chain to resolve (call or put)
    pub direction: Direction,

    /// Config file path
    #[arg(short, long, default_value = "config/Rj.toml")]
    pub config: String,
}

pub async fn run(args: ResolveArgs) -> Result<()> {
    let mut config = super::load_config(&args.config, false)?;
    config.trader.live_trading = false;

    let client = super::connect_brokerage()?;
    let price = client
        .current_price(&config.instrument)
        .await
        .with_context(|| format!("failed to price {}", config.instrument))?;
    let trigger = Trigger::new(args.direction, price, Local::now().time())?;

    let capital = config.capital;
    let trader = Trader::new(
        Arc::new(config),
        client.clone(),
        client,
        Arc::new(LogNotifier),
    );
    let context = trader.resolve(&trigger).await?;
    let order = context.order(capital);

    println!("{}", context.summary(capital));
    println!(
        "quantity {} | volume {}",
        order.quantity(),
        context.contract.volume
    );
    Ok(())
}
