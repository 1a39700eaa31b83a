use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Immutable runtime configuration shared by every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RjConfig {
    /// Underlying symbol that is polled and traded.
    #[serde(default = "default_instrument")]
    pub instrument: String,
    /// Capital committed per trade.
    pub capital: Decimal,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub trader: TraderConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Capacity of the sliding window, in samples.
    pub max_points: usize,
    /// Signed percent-change threshold. Positive buys calls on a rise,
    /// negative buys puts on a fall.
    pub change_threshold: Decimal,
    /// Samples ignored after a trigger fires.
    pub cooldown_samples: u32,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_points: 10,
            change_threshold: Decimal::new(2, 1),
            cooldown_samples: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraderConfig {
    /// Take-profit and stop-loss distance as a fraction of the entry mark.
    pub bracket: Decimal,
    pub dte_min: u32,
    pub dte_max: u32,
    /// How many days of expirations to request from the chain.
    pub lookahead_days: u32,
    /// Pause after each processed trigger.
    pub cooldown_secs: u64,
    /// Orders are only submitted when this is set.
    pub live_trading: bool,
}

impl TraderConfig {
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Default for TraderConfig {
    fn default() -> Self {
        Self {
            bracket: Decimal::new(2, 1),
            dte_min: 1,
            dte_max: 5,
            lookahead_days: 14,
            cooldown_secs: 1800,
            live_trading: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Send SMS through Twilio; otherwise notifications only go to the log.
    pub sms_enabled: bool,
    /// Sending phone number.
    pub from: Option<String>,
    /// Operator phone number.
    pub to: Option<String>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            sms_enabled: true,
            from: None,
            to: None,
        }
    }
}

fn default_instrument() -> String {
    "SPY".to_string()
}

const fn default_poll_interval_secs() -> u64 {
    30
}

impl RjConfig {
    /// Configuration with every tunable at its default.
    #[must_use]
    pub fn new(instrument: impl Into<String>, capital: Decimal) -> Self {
        Self {
            instrument: instrument.into(),
            capital,
            poll_interval_secs: default_poll_interval_secs(),
            evaluator: EvaluatorConfig::default(),
            trader: TraderConfig::default(),
            notify: NotifyConfig::default(),
        }
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Checks every startup invariant.
    ///
    /// # Errors
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instrument.trim().is_empty() {
            return Err(ConfigError::EmptyInstrument);
        }
        if self.capital <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveCapital(self.capital));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.evaluator.max_points == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.evaluator.change_threshold.is_zero() {
            return Err(ConfigError::ZeroThreshold);
        }
        let bracket = self.trader.bracket;
        if bracket <= Decimal::ZERO || bracket >= Decimal::ONE {
            return Err(ConfigError::InvalidBracket(bracket));
        }
        if self.trader.dte_min > self.trader.dte_max {
            return Err(ConfigError::InvalidDteRange {
                min: self.trader.dte_min,
                max: self.trader.dte_max,
            });
        }
        if self.trader.lookahead_days == 0 {
            return Err(ConfigError::ZeroLookahead);
        }
        Ok(())
    }
}
