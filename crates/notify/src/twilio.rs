//! Twilio SMS notifier.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rj_core::{Notifier, NotifyConfig};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::{NotifyError, Result};

pub const TWILIO_API_URL: &str = "https://api.twilio.com";

pub const ACCOUNT_SID_ENV: &str = "TWILIO_ACCOUNT_SID";
pub const AUTH_TOKEN_ENV: &str = "TWILIO_AUTH_TOKEN";
pub const FROM_ENV: &str = "TWILIO_FROM";
pub const TO_ENV: &str = "TWILIO_TO";

#[derive(Clone)]
pub struct TwilioConfig {
    pub base_url: String,
    pub account_sid: String,
    pub auth_token: SecretString,
    /// Sending number.
    pub from: String,
    /// Operator number.
    pub to: String,
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("base_url", &self.base_url)
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

impl TwilioConfig {
    /// Credentials from `TWILIO_ACCOUNT_SID` and `TWILIO_AUTH_TOKEN`; phone
    /// numbers from `notify`, falling back to `TWILIO_FROM` and `TWILIO_TO`.
    ///
    /// # Errors
    /// Returns `NotifyError::Configuration` naming the first missing value.
    pub fn from_env(notify: &NotifyConfig) -> Result<Self> {
        Self::resolve(notify, |name| std::env::var(name).ok())
    }

    fn resolve(notify: &NotifyConfig, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    NotifyError::Configuration(format!("missing environment variable: {name}"))
                })
        };
        let number = |configured: &Option<String>, name: &str| match configured {
            Some(n) if !n.trim().is_empty() => Ok(n.clone()),
            _ => require(name),
        };

        Ok(Self {
            base_url: TWILIO_API_URL.to_string(),
            account_sid: require(ACCOUNT_SID_ENV)?,
            auth_token: SecretString::from(require(AUTH_TOKEN_ENV)?),
            from: number(&notify.from, FROM_ENV)?,
            to: number(&notify.to, TO_ENV)?,
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Deserialize)]
struct MessageResponse {
    sid: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    code: Option<u16>,
    message: Option<String>,
}

/// Sends every notification as an SMS to the operator.
#[derive(Debug)]
pub struct TwilioNotifier {
    config: TwilioConfig,
    http: Client,
}

impl TwilioNotifier {
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: TwilioConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| NotifyError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    /// Sends one SMS and returns the message sid.
    ///
    /// # Errors
    /// Returns `NotifyError::Api` if Twilio rejects the message.
    pub async fn send_sms(&self, body: &str) -> Result<Option<String>> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.base_url, self.config.account_sid
        );
        let form = [
            ("From", self.config.from.as_str()),
            ("To", self.config.to.as_str()),
            ("Body", body),
        ];

        let response = self
            .http
            .post(&url)
            .basic_auth(
                &self.config.account_sid,
                Some(self.config.auth_token.expose_secret()),
            )
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let (status_code, message) = match serde_json::from_str::<ApiErrorResponse>(&text) {
                Ok(ApiErrorResponse {
                    code: Some(code),
                    message,
                }) => (code, message.unwrap_or(text)),
                _ => (status.as_u16(), text),
            };
            return Err(NotifyError::Api {
                status_code,
                message,
            });
        }

        let sid = response.json::<MessageResponse>().await?.sid;
        tracing::debug!(sid = ?sid, "sms sent");
        Ok(sid)
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn send(&self, message: &str) -> anyhow::Result<()> {
        self.send_sms(message).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    fn config(server: &MockServer) -> TwilioConfig {
        TwilioConfig {
            base_url: server.uri(),
            account_sid: "AC123".to_string(),
            auth_token: SecretString::from("secret".to_string()),
            from: "+15550001111".to_string(),
            to: "+15552223333".to_string(),
        }
    }

    #[test]
    fn test_resolve_prefers_configured_numbers() {
        let notify = NotifyConfig {
            sms_enabled: true,
            from: Some("+15550001111".to_string()),
            to: None,
        };
        let lookup = env(&[
            (ACCOUNT_SID_ENV, "AC123"),
            (AUTH_TOKEN_ENV, "secret"),
            (FROM_ENV, "+19998887777"),
            (TO_ENV, "+15552223333"),
        ]);

        let config = TwilioConfig::resolve(&notify, lookup).unwrap();
        assert_eq!(config.from, "+15550001111");
        assert_eq!(config.to, "+15552223333");
        assert_eq!(config.base_url, TWILIO_API_URL);
    }

    #[test]
    fn test_resolve_missing_credential() {
        let lookup = env(&[(ACCOUNT_SID_ENV, "AC123"), (AUTH_TOKEN_ENV, " ")]);
        let err = TwilioConfig::resolve(&NotifyConfig::default(), lookup).unwrap_err();
        assert!(matches!(err, NotifyError::Configuration(ref m) if m.contains(AUTH_TOKEN_ENV)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = TwilioConfig {
            base_url: TWILIO_API_URL.to_string(),
            account_sid: "AC123".to_string(),
            auth_token: SecretString::from("hunter2".to_string()),
            from: "+1".to_string(),
            to: "+2".to_string(),
        };
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[tokio::test]
    async fn test_send_sms() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            // base64("AC123:secret")
            .and(header("Authorization", "Basic QUMxMjM6c2VjcmV0"))
            .and(body_string_contains("To=%2B15552223333"))
            .and(body_string_contains("Body=MISSED+CALL"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({"sid": "SM42"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let notifier = TwilioNotifier::new(config(&server)).unwrap();
        let sid = notifier.send_sms("MISSED CALL").await.unwrap();
        assert_eq!(sid.as_deref(), Some("SM42"));
    }

    #[tokio::test]
    async fn test_rejected_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "code": 21211,
                "message": "The 'To' number is not a valid phone number.",
                "status": 400
            })))
            .mount(&server)
            .await;

        let notifier = TwilioNotifier::new(config(&server)).unwrap();
        let err = notifier.send("hello").await.unwrap_err();
        let err = err.downcast_ref::<NotifyError>().unwrap();
        assert!(matches!(
            err,
            NotifyError::Api {
                status_code: 21211,
                ..
            }
        ));
    }
}
