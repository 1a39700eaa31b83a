//! OAuth refresh-token authentication.
//!
//! TD Ameritrade issues short-lived access tokens in exchange for a long-lived
//! refresh token. The access token is cached and refreshed shortly before it
//! expires.
//!
//! # Security
//!
//! - Tokens are held in `SecretString` and never logged
//! - Credentials are loaded from environment variables

use std::time::{Duration, Instant};

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::{Result, TdaError};

/// Environment variable holding the OAuth client id.
pub const CLIENT_ID_ENV: &str = "CLIENT_ID";
/// Environment variable holding the OAuth refresh token.
pub const REFRESH_TOKEN_ENV: &str = "REFRESH_TOKEN";

const TOKEN_PATH: &str = "/v1/oauth2/token";
const CLIENT_ID_SUFFIX: &str = "@AMER.OAUTHAP";

/// Access tokens are refreshed this long before they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// OAuth application credentials.
#[derive(Debug)]
pub struct TdaCredentials {
    client_id: String,
    refresh_token: SecretString,
}

impl TdaCredentials {
    #[must_use]
    pub fn new(client_id: impl Into<String>, refresh_token: SecretString) -> Self {
        Self {
            client_id: client_id.into(),
            refresh_token,
        }
    }

    /// Reads `CLIENT_ID` and `REFRESH_TOKEN`.
    ///
    /// # Errors
    /// Returns `TdaError::Configuration` naming the first missing variable.
    pub fn from_env() -> Result<Self> {
        let client_id = require_env(CLIENT_ID_ENV)?;
        let refresh_token = require_env(REFRESH_TOKEN_ENV)?;
        Ok(Self::new(client_id, SecretString::from(refresh_token)))
    }

    /// Client id in the form the token endpoint expects.
    #[must_use]
    pub fn oauth_client_id(&self) -> String {
        if self.client_id.ends_with(CLIENT_ID_SUFFIX) {
            self.client_id.clone()
        } else {
            format!("{}{CLIENT_ID_SUFFIX}", self.client_id)
        }
    }
}

pub(crate) fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(TdaError::Configuration(format!(
            "missing environment variable: {name}"
        ))),
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Lifetime in seconds.
    expires_in: u64,
}

struct AccessToken {
    token: SecretString,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + EXPIRY_MARGIN < self.expires_at
    }
}

/// Refresh-token authenticator with a cached access token.
pub struct TdaAuth {
    credentials: TdaCredentials,
    token: Mutex<Option<AccessToken>>,
}

impl std::fmt::Debug for TdaAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TdaAuth")
            .field("client_id", &self.credentials.client_id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl TdaAuth {
    #[must_use]
    pub fn new(credentials: TdaCredentials) -> Self {
        Self {
            credentials,
            token: Mutex::new(None),
        }
    }

    /// Returns an `Authorization` header value, refreshing the access token if needed.
    ///
    /// # Errors
    /// Returns `TdaError::Authentication` if the token endpoint rejects the refresh token.
    pub async fn bearer(&self, http: &Client, base_url: &str) -> Result<String> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(format!("Bearer {}", token.token.expose_secret()));
        }

        let token = self.refresh(http, base_url).await?;
        let header = format!("Bearer {}", token.token.expose_secret());
        *cached = Some(token);
        Ok(header)
    }

    /// Drops the cached access token so the next request refreshes it.
    pub async fn invalidate(&self) {
        *self.token.lock().await = None;
    }

    async fn refresh(&self, http: &Client, base_url: &str) -> Result<AccessToken> {
        tracing::debug!("refreshing access token");

        let client_id = self.credentials.oauth_client_id();
        let form = [
            ("grant_type", "refresh_token"),
            (
                "refresh_token",
                self.credentials.refresh_token.expose_secret(),
            ),
            ("client_id", client_id.as_str()),
        ];

        let response = http
            .post(format!("{base_url}{TOKEN_PATH}"))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TdaError::Authentication(format!(
                "token refresh failed ({}): {text}",
                status.as_u16()
            )));
        }

        let body: TokenResponse = response.json().await?;
        Ok(AccessToken {
            token: SecretString::from(body.access_token),
            expires_at: Instant::now() + Duration::from_secs(body.expires_in),
        })
    }
}
