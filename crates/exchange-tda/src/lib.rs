//! TD Ameritrade brokerage integration.
//!
//! Provides the quote, option-chain and order-submission capabilities used by
//! the trading pipeline.
//!
//! # Endpoints
//!
//! - `GET /v1/marketdata/{symbol}/quotes`: last traded price
//! - `GET /v1/marketdata/chains`: calls and puts keyed by expiration
//! - `POST /v1/accounts/{id}/orders`: TRIGGER/OCO bracket orders
//!
//! Access tokens are obtained from a refresh token and cached until shortly
//! before they expire. All requests share one rate limiter.
//!
//! # Example
//!
//! ```ignore
//! use rj_tda::TdaClient;
//!
//! let client = TdaClient::from_env()?;
//! let price = client.get_quote("SPY").await?;
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod types;

pub use auth::{TdaAuth, TdaCredentials, CLIENT_ID_ENV, REFRESH_TOKEN_ENV};
pub use client::{TdaClient, TdaClientConfig, ACCOUNT_ID_ENV, TDA_API_URL};
pub use error::{Result, TdaError};
pub use types::{OrderRequest, QuoteResponse, RawOptionChain};
