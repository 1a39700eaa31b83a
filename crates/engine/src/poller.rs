//! Quote poller
//!
//! Samples the watched instrument's price on a fixed cadence and publishes
//! each observation onto the sample queue.
//!
//! Data flow:
//! QuoteProvider → Poller → sample queue → Evaluator

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use rj_core::{QuoteProvider, Sample};
use tokio::sync::{mpsc::UnboundedSender, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Published(Sample),
    /// Nobody is consuming samples any more.
    QueueClosed,
}

pub struct Poller {
    quotes: Arc<dyn QuoteProvider>,
    instrument: String,
    every: Duration,
    samples: UnboundedSender<Sample>,
}

impl Poller {
    #[must_use]
    pub fn new(
        quotes: Arc<dyn QuoteProvider>,
        instrument: impl Into<String>,
        every: Duration,
        samples: UnboundedSender<Sample>,
    ) -> Self {
        Self {
            quotes,
            instrument: instrument.into(),
            every,
            samples,
        }
    }

    /// Fetches one quote and publishes it with the current time of day.
    ///
    /// # Errors
    /// Returns an error if the quote request fails or the price is not a valid sample.
    pub async fn poll(&self) -> Result<PollOutcome> {
        let price = self
            .quotes
            .current_price(&self.instrument)
            .await
            .with_context(|| format!("failed to fetch quote for {}", self.instrument))?;

        let sample = Sample::new(Local::now().time(), price)
            .with_context(|| format!("invalid quote for {}", self.instrument))?;

        if self.samples.send(sample).is_err() {
            return Ok(PollOutcome::QueueClosed);
        }

        debug!(instrument = %self.instrument, price = %sample.value(), "sample published");
        Ok(PollOutcome::Published(sample))
    }

    /// Polls on every tick until `stop` is raised, its sender is dropped, or the
    /// sample queue closes. Failed polls are logged and retried on the next tick.
    pub async fn run(self, mut stop: watch::Receiver<bool>) {
        let mut ticker = interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            instrument = %self.instrument,
            every_secs = self.every.as_secs(),
            "poller started"
        );

        loop {
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match self.poll().await {
                        Ok(PollOutcome::Published(_)) => {}
                        Ok(PollOutcome::QueueClosed) => {
                            warn!("sample queue closed");
                            break;
                        }
                        Err(e) => warn!(error = %format!("{e:#}"), "poll failed"),
                    }
                }
            }
        }

        info!(instrument = %self.instrument, "poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;
    use tokio::sync::mpsc::unbounded_channel;

    /// Replays scripted responses, then keeps returning the last price.
    struct ScriptedQuotes {
        responses: Mutex<Vec<Result<Decimal>>>,
    }

    impl ScriptedQuotes {
        fn new(mut responses: Vec<Result<Decimal>>) -> Arc<Self> {
            responses.reverse();
            Arc::new(Self {
                responses: Mutex::new(responses),
            })
        }
    }

    #[async_trait]
    impl QuoteProvider for ScriptedQuotes {
        async fn current_price(&self, instrument: &str) -> Result<Decimal> {
            assert_eq!(instrument, "SPY");
            let mut responses = self.responses.lock().unwrap();
            match responses.len() {
                0 => Ok(dec!(1)),
                1 => match &responses[0] {
                    Ok(price) => Ok(*price),
                    Err(e) => Err(anyhow::anyhow!("{e}")),
                },
                _ => responses.pop().unwrap(),
            }
        }
    }

    #[tokio::test]
    async fn test_poll_publishes_sample() {
        let (tx, mut rx) = unbounded_channel();
        let poller = Poller::new(
            ScriptedQuotes::new(vec![Ok(dec!(471.25))]),
            "SPY",
            Duration::from_secs(30),
            tx,
        );

        let outcome = poller.poll().await.unwrap();
        let sample = rx.recv().await.unwrap();
        assert_eq!(sample.value(), dec!(471.25));
        assert_eq!(outcome, PollOutcome::Published(sample));
    }

    #[tokio::test]
    async fn test_poll_failure_is_reported_not_published() {
        let (tx, mut rx) = unbounded_channel();
        let poller = Poller::new(
            ScriptedQuotes::new(vec![Err(anyhow::anyhow!("503 from quote api"))]),
            "SPY",
            Duration::from_secs(30),
            tx,
        );

        let err = poller.poll().await.unwrap_err();
        assert!(format!("{err:#}").contains("503 from quote api"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_poll_rejects_negative_price() {
        let (tx, _rx) = unbounded_channel();
        let poller = Poller::new(
            ScriptedQuotes::new(vec![Ok(dec!(-3))]),
            "SPY",
            Duration::from_secs(30),
            tx,
        );
        assert!(poller.poll().await.is_err());
    }

    #[tokio::test]
    async fn test_poll_detects_closed_queue() {
        let (tx, rx) = unbounded_channel();
        drop(rx);
        let poller = Poller::new(
            ScriptedQuotes::new(vec![Ok(dec!(400))]),
            "SPY",
            Duration::from_secs(30),
            tx,
        );
        assert_eq!(poller.poll().await.unwrap(), PollOutcome::QueueClosed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_survives_failures_and_stops_on_signal() {
        let (tx, mut rx) = unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        let poller = Poller::new(
            ScriptedQuotes::new(vec![
                Ok(dec!(400)),
                Err(anyhow::anyhow!("timeout")),
                Ok(dec!(401)),
            ]),
            "SPY",
            Duration::from_secs(30),
            tx,
        );

        let handle = tokio::spawn(poller.run(stop_rx));

        // First tick is immediate, the next two follow at 30s intervals.
        assert_eq!(rx.recv().await.unwrap().value(), dec!(400));
        assert_eq!(rx.recv().await.unwrap().value(), dec!(401));

        stop_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
