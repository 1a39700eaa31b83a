//! Subcommands and the startup helpers they share.

pub mod resolve;
pub mod run;

pub use resolve::ResolveArgs;
pub use run::RunArgs;

use std::sync::Arc;

use anyhow::{Context, Result};
use rj_core::{ConfigError, ConfigLoader, Notifier, NotifyConfig, RjConfig};
use rj_notify::{LogNotifier, TwilioConfig, TwilioNotifier};
use rj_tda::{TdaClient, ACCOUNT_ID_ENV, CLIENT_ID_ENV, REFRESH_TOKEN_ENV};

const BROKERAGE_CREDENTIALS: [&str; 3] = [CLIENT_ID_ENV, REFRESH_TOKEN_ENV, ACCOUNT_ID_ENV];
const SMS_CREDENTIALS: [&str; 2] = [
    rj_notify::twilio::ACCOUNT_SID_ENV,
    rj_notify::twilio::AUTH_TOKEN_ENV,
];

/// Fails on the first credential that is unset or blank.
fn require_credentials(
    names: &[&str],
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    for &name in names {
        if lookup(name).map_or(true, |v| v.trim().is_empty()) {
            return Err(ConfigError::MissingCredential(name.to_string()));
        }
    }
    Ok(())
}

/// Credentials needed before anything starts.
fn required_credentials(sms: bool) -> Vec<&'static str> {
    let mut names = BROKERAGE_CREDENTIALS.to_vec();
    if sms {
        names.extend(SMS_CREDENTIALS);
    }
    names
}

/// Loads and validates the configuration, then checks the brokerage
/// credentials and, when `sms` is set, the Twilio ones.
pub(crate) fn load_config(path: &str, sms: bool) -> Result<RjConfig> {
    let config = ConfigLoader::load_from(path)
        .with_context(|| format!("failed to load configuration from {path}"))?;
    let sms = sms && config.notify.sms_enabled;
    require_credentials(&required_credentials(sms), |name| {
        std::env::var(name).ok()
    })?;
    Ok(config)
}

pub(crate) fn connect_brokerage() -> Result<Arc<TdaClient>> {
    let client = TdaClient::from_env().context("failed to create TD Ameritrade client")?;
    Ok(Arc::new(client))
}

pub(crate) fn build_notifier(notify: &NotifyConfig) -> Result<Arc<dyn Notifier>> {
    if !notify.sms_enabled {
        tracing::info!("SMS disabled, notifications go to the log");
        return Ok(Arc::new(LogNotifier));
    }

    let config = TwilioConfig::from_env(notify).context("failed to configure Twilio")?;
    tracing::info!(to = %config.to, "SMS notifications enabled");
    Ok(Arc::new(TwilioNotifier::new(config)?))
}
