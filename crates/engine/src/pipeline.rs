//! Wires the three stages together.
//!
//! Poller → sample queue → Evaluator → trigger queue → Trader
//!
//! Stopping the poller drops the sample sender, which ends the evaluator,
//! which drops the trigger sender, which ends the trader once it has finished
//! the trigger in hand.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rj_core::{ChainProvider, Notifier, OrderSubmitter, QuoteProvider, RjConfig};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn, Instrument};

use crate::evaluator::Evaluator;
use crate::poller::Poller;
use crate::trader::Trader;

/// External collaborators the pipeline depends on.
#[derive(Clone)]
pub struct Capabilities {
    pub quotes: Arc<dyn QuoteProvider>,
    pub chains: Arc<dyn ChainProvider>,
    pub orders: Arc<dyn OrderSubmitter>,
    pub notifier: Arc<dyn Notifier>,
}

pub struct Pipeline {
    stop: watch::Sender<bool>,
    poller: JoinHandle<()>,
    evaluator: JoinHandle<()>,
    trader: JoinHandle<()>,
}

impl Pipeline {
    /// Validates the configuration and spawns all three stages.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid. Nothing is spawned in that case.
    pub fn spawn(config: Arc<RjConfig>, capabilities: Capabilities) -> Result<Self> {
        config.validate()?;
        let evaluator = Evaluator::new(&config.evaluator)?;

        let (sample_tx, sample_rx) = mpsc::unbounded_channel();
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);

        let poller = Poller::new(
            capabilities.quotes,
            config.instrument.clone(),
            config.poll_interval(),
            sample_tx,
        );
        let trader = Trader::new(
            Arc::clone(&config),
            capabilities.chains,
            capabilities.orders,
            capabilities.notifier,
        );

        let instrument = config.instrument.as_str();
        let poller = tokio::spawn(
            poller
                .run(stop_rx)
                .instrument(tracing::info_span!("poller", %instrument)),
        );
        let evaluator = tokio::spawn(
            evaluator
                .run(sample_rx, trigger_tx)
                .instrument(tracing::info_span!("evaluator", %instrument)),
        );
        let trader = tokio::spawn(
            trader
                .run(trigger_rx)
                .instrument(tracing::info_span!("trader", %instrument)),
        );

        info!(%instrument, "pipeline started");

        Ok(Self {
            stop: stop_tx,
            poller,
            evaluator,
            trader,
        })
    }

    /// Stops polling and lets queued work drain for up to `grace`.
    ///
    /// The trader is aborted if it is still busy (typically sleeping out its
    /// cooldown) when the grace period ends.
    pub async fn shutdown(self, grace: Duration) {
        let _ = self.stop.send(true);

        if let Err(e) = self.poller.await {
            warn!(error = %e, "poller task failed");
        }
        if let Err(e) = self.evaluator.await {
            warn!(error = %e, "evaluator task failed");
        }

        let abort = self.trader.abort_handle();
        match tokio::time::timeout(grace, self.trader).await {
            Ok(Ok(())) => info!("pipeline drained"),
            Ok(Err(e)) => warn!(error = %e, "trader task failed"),
            Err(_) => {
                abort.abort();
                warn!(grace_secs = grace.as_secs(), "trader still busy after grace period, aborted");
            }
        }
    }
}
