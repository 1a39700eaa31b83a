use std::path::Path;

use crate::config::RjConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

pub const DEFAULT_CONFIG_PATH: &str = "config/Rj.toml";
pub const ENV_PREFIX: &str = "RJ_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from `config/Rj.toml` overlaid with `RJ_` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the sources cannot be parsed or the result fails validation.
    pub fn load() -> Result<RjConfig> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads configuration from a specific TOML file.
    ///
    /// Nested keys are addressed with a double underscore, so
    /// `RJ_TRADER__LIVE_TRADING=true` sets `trader.live_trading`. A missing file is
    /// not an error; the environment and defaults still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the sources cannot be parsed or the result fails validation.
    pub fn load_from(path: impl AsRef<Path>) -> Result<RjConfig> {
        let config: RjConfig = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        config.validate()?;
        tracing::debug!(
            instrument = %config.instrument,
            live_trading = config.trader.live_trading,
            "configuration loaded"
        );

        Ok(config)
    }
}
