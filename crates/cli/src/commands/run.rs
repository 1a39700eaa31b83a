//! `rj run`: the long-running trading pipeline.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use rj_engine::{Capabilities, Pipeline};
use tracing::{info, warn};

/// How long an in-flight trade may take to finish after Ctrl+C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Config file path
    #[arg(short, long, default_value = "config/Rj.toml")]
    pub config: String,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<String>,

    /// Never submit orders, regardless of `trader.live_trading`
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let mut config = super::load_config(&args.config, true)?;
    if args.dry_run {
        config.trader.live_trading = false;
    }

    let client = super::connect_brokerage()?;
    let notifier = super::build_notifier(&config.notify)?;

    info!(
        instrument = %config.instrument,
        capital = %config.capital,
        poll_interval_secs = config.poll_interval_secs,
        window = config.evaluator.max_points,
        threshold = %config.evaluator.change_threshold,
        bracket = %config.trader.bracket,
        dte_min = config.trader.dte_min,
        dte_max = config.trader.dte_max,
        live_trading = config.trader.live_trading,
        "starting rj"
    );
    if !config.trader.live_trading {
        warn!("live trading is off, orders will not be submitted");
    }

    let capabilities = Capabilities {
        quotes: client.clone(),
        chains: client.clone(),
        orders: client,
        notifier,
    };
    let pipeline = Pipeline::spawn(Arc::new(config), capabilities)?;

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down");

    pipeline.shutdown(SHUTDOWN_GRACE).await;
    info!("rj stopped");
    Ok(())
}
