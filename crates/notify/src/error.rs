//! Error types for operator notifications.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    /// The messaging API rejected the request.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Error message from API.
        message: String,
    },

    #[error("network error: {0}")]
    Network(String),

    /// Missing credentials or phone numbers.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NotifyError>;
