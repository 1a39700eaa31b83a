//! Sliding-window change detector.
//!
//! Every sample is pushed into the window. Once the window is full the percent
//! change between its oldest and newest points is compared against a signed
//! threshold: a positive threshold fires calls on rises, a negative one fires
//! puts on falls. After a firing, the next `cooldown_samples` observations
//! are ignored while the window keeps filling.

use std::num::NonZeroUsize;

use chrono::NaiveTime;
use rj_core::{ConfigError, Direction, EvaluatorConfig, Sample, Trigger};
use rust_decimal::Decimal;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::window::EvalWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluatorState {
    Armed,
    Cooling { remaining: u32 },
}

#[derive(Debug)]
pub struct Evaluator {
    window: EvalWindow,
    threshold: Decimal,
    cooldown_samples: u32,
    state: EvaluatorState,
}

impl Evaluator {
    /// # Errors
    /// Rejects an empty window or a zero threshold.
    pub fn new(config: &EvaluatorConfig) -> Result<Self, ConfigError> {
        let capacity = NonZeroUsize::new(config.max_points).ok_or(ConfigError::ZeroWindow)?;
        if config.change_threshold.is_zero() {
            return Err(ConfigError::ZeroThreshold);
        }
        Ok(Self {
            window: EvalWindow::new(capacity),
            threshold: config.change_threshold,
            cooldown_samples: config.cooldown_samples,
            state: EvaluatorState::Armed,
        })
    }

    #[must_use]
    pub const fn state(&self) -> EvaluatorState {
        self.state
    }

    #[must_use]
    pub const fn window(&self) -> &EvalWindow {
        &self.window
    }

    /// Feeds one observation through the detector.
    pub fn observe(&mut self, timestamp: NaiveTime, value: Decimal) -> Option<Trigger> {
        self.window.push(value, timestamp);

        if !self.window.is_full() {
            return None;
        }

        if let EvaluatorState::Cooling { remaining } = self.state {
            let remaining = remaining.saturating_sub(1);
            self.state = if remaining == 0 {
                EvaluatorState::Armed
            } else {
                EvaluatorState::Cooling { remaining }
            };
            return None;
        }

        let Some(change) = self.window.change() else {
            tracing::warn!(%value, "oldest window value is zero, skipping evaluation");
            return None;
        };

        let newest = self.window.newest()?;
        if newest.value.is_zero() {
            tracing::warn!("newest window value is zero, skipping evaluation");
            return None;
        }

        let direction = self.decide(change)?;
        let trigger = match Trigger::new(direction, newest.value, newest.timestamp) {
            Ok(trigger) => trigger.with_change(change),
            Err(e) => {
                tracing::warn!(error = %e, "discarding malformed trigger");
                return None;
            }
        };

        if self.cooldown_samples > 0 {
            self.state = EvaluatorState::Cooling {
                remaining: self.cooldown_samples,
            };
        }

        Some(trigger)
    }

    fn decide(&self, change: Decimal) -> Option<Direction> {
        if self.threshold > Decimal::ZERO && change >= self.threshold {
            Some(Direction::Call)
        } else if self.threshold < Decimal::ZERO && change <= self.threshold {
            Some(Direction::Put)
        } else {
            None
        }
    }

    /// Consumes samples until the sample queue closes, publishing triggers.
    ///
    /// Returns early if the trigger queue has no receiver left.
    pub async fn run(mut self, mut samples: UnboundedReceiver<Sample>, triggers: UnboundedSender<Trigger>) {
        tracing::info!(
            max_points = self.window.capacity(),
            threshold = %self.threshold,
            cooldown_samples = self.cooldown_samples,
            "evaluator started"
        );

        while let Some(sample) = samples.recv().await {
            let Some(trigger) = self.observe(sample.timestamp(), sample.value()) else {
                continue;
            };

            tracing::info!(
                direction = %trigger.direction(),
                reference_price = %trigger.reference_price(),
                change = %trigger.change(),
                "trigger fired"
            );

            if triggers.send(trigger).is_err() {
                tracing::warn!("trigger queue closed, evaluator stopping");
                return;
            }
        }

        tracing::info!("sample queue closed, evaluator stopping");
    }
}
