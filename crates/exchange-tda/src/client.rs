//! TD Ameritrade REST client with rate limiting.
//!
//! Implements the quote, option-chain and order-submission capabilities the
//! trading pipeline consumes.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use rj_core::{BracketOrder, ChainProvider, OptionChain, OrderAck, OrderSubmitter, QuoteProvider};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

use crate::auth::{require_env, TdaAuth, TdaCredentials};
use crate::error::{Result, TdaError};
use crate::types::{OrderRequest, QuoteResponse, RawOptionChain};

// =============================================================================
// Constants
// =============================================================================

/// Production API base URL.
pub const TDA_API_URL: &str = "https://api.tdameritrade.com";

/// Environment variable holding the brokerage account id.
pub const ACCOUNT_ID_ENV: &str = "TD_ACCOUNT_ID";

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct TdaClientConfig {
    /// Base URL for the API.
    pub base_url: String,

    /// Account orders are placed against.
    pub account_id: String,

    /// Requests per minute limit.
    pub requests_per_minute: NonZeroU32,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for TdaClientConfig {
    fn default() -> Self {
        Self {
            base_url: TDA_API_URL.to_string(),
            account_id: String::new(),
            requests_per_minute: nonzero!(120u32),
            timeout_secs: 30,
        }
    }
}

impl TdaClientConfig {
    /// Reads the account id from `TD_ACCOUNT_ID`.
    ///
    /// # Errors
    /// Returns `TdaError::Configuration` if the variable is missing.
    pub fn from_env() -> Result<Self> {
        Ok(Self::default().with_account_id(require_env(ACCOUNT_ID_ENV)?))
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = account_id.into();
        self
    }

    #[must_use]
    pub fn with_rate_limit(mut self, requests_per_minute: NonZeroU32) -> Self {
        self.requests_per_minute = requests_per_minute;
        self
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

// =============================================================================
// TdaClient
// =============================================================================

pub struct TdaClient {
    config: TdaClientConfig,
    http: Client,
    rate_limiter: Arc<
        RateLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
    auth: TdaAuth,
}

impl std::fmt::Debug for TdaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TdaClient")
            .field("base_url", &self.config.base_url)
            .field("requests_per_minute", &self.config.requests_per_minute)
            .finish_non_exhaustive()
    }
}

impl TdaClient {
    /// # Errors
    /// Returns error if the account id is empty or the HTTP client cannot be built.
    pub fn new(config: TdaClientConfig, credentials: TdaCredentials) -> Result<Self> {
        if config.account_id.trim().is_empty() {
            return Err(TdaError::Configuration("account id is empty".to_string()));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TdaError::Network(format!("failed to build HTTP client: {e}")))?;

        let quota = Quota::per_minute(config.requests_per_minute);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            config,
            http,
            rate_limiter,
            auth: TdaAuth::new(credentials),
        })
    }

    /// Builds a production client from `CLIENT_ID`, `REFRESH_TOKEN` and `TD_ACCOUNT_ID`.
    ///
    /// # Errors
    /// Returns `TdaError::Configuration` if any variable is missing.
    pub fn from_env() -> Result<Self> {
        Self::new(TdaClientConfig::from_env()?, TdaCredentials::from_env()?)
    }

    /// Accepts equity, index and option symbols; rejects anything that could
    /// alter the request path.
    fn validate_symbol(symbol: &str) -> Result<&str> {
        if symbol.is_empty() || symbol.len() > 32 {
            return Err(TdaError::InvalidSymbol(symbol.to_string()));
        }
        if !symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$'))
        {
            return Err(TdaError::InvalidSymbol(symbol.to_string()));
        }
        Ok(symbol)
    }

    /// Rate-limited, authenticated request.
    async fn send(&self, method: Method, path: &str, build: impl FnOnce(RequestBuilder) -> RequestBuilder) -> Result<Response> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.config.base_url, path);
        let bearer = self.auth.bearer(&self.http, &self.config.base_url).await?;

        tracing::debug!("{} {}", method, url);

        let request = self
            .http
            .request(method, &url)
            .header("Accept", "application/json")
            .header("Authorization", bearer);
        let response = build(request).send().await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                self.auth.invalidate().await;
                let text = response.text().await.unwrap_or_default();
                Err(TdaError::Authentication(format!("access token rejected: {text}")))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60);
                Err(TdaError::rate_limit(retry_after))
            }
            status if !status.is_success() => {
                let text = response.text().await.unwrap_or_default();
                Err(TdaError::api(status.as_u16(), text))
            }
            _ => Ok(response),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self.send(Method::GET, path, |r| r.query(query)).await?;
        Ok(response.json::<T>().await?)
    }

    // =========================================================================
    // Market Data Endpoints
    // =========================================================================

    /// Latest price of a symbol.
    ///
    /// # Errors
    /// Returns error if the API call fails or the quote has no usable price.
    pub async fn get_quote(&self, symbol: &str) -> Result<Decimal> {
        let symbol = Self::validate_symbol(symbol)?;
        let path = format!("/v1/marketdata/{symbol}/quotes");

        let quotes: QuoteResponse = self.get(&path, &[]).await?;
        quotes
            .get(symbol)
            .ok_or_else(|| TdaError::InvalidSymbol(symbol.to_string()))?
            .price()
    }

    /// Calls and puts expiring between `from` and `to`, inclusive.
    ///
    /// # Errors
    /// Returns error if the API call fails or the chain cannot be parsed.
    pub async fn get_option_chain(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<OptionChain> {
        let symbol = Self::validate_symbol(symbol)?;
        let query = [
            ("symbol", symbol.to_string()),
            ("contractType", "ALL".to_string()),
            ("fromDate", from.format("%Y-%m-%d").to_string()),
            ("toDate", to.format("%Y-%m-%d").to_string()),
        ];

        let raw: RawOptionChain = self.get("/v1/marketdata/chains", &query).await?;
        raw.into_chain()
    }

    // =========================================================================
    // Order Endpoints
    // =========================================================================

    /// Places a TRIGGER/OCO bracket order.
    ///
    /// # Errors
    /// Returns `TdaError::InvalidOrder` if the capital buys no contracts, or an
    /// API error if the order is rejected.
    pub async fn place_bracket_order(&self, order: &BracketOrder) -> Result<OrderAck> {
        let symbol = Self::validate_symbol(&order.symbol)?;
        let body = OrderRequest::bracket(order)?;
        let path = format!("/v1/accounts/{}/orders", self.config.account_id);

        tracing::info!(
            symbol,
            quantity = body.order_leg_collection.first().map_or(0, |l| l.quantity),
            entry = %order.entry,
            limit = %order.limit,
            stop = %order.stop,
            "placing bracket order"
        );

        let response = self.send(Method::POST, &path, |r| r.json(&body)).await?;

        // The new order id is the last segment of the Location header.
        let order_id = response
            .headers()
            .get("Location")
            .and_then(|v| v.to_str().ok())
            .and_then(|loc| loc.rsplit('/').next())
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        Ok(OrderAck { order_id })
    }
}

// =============================================================================
// Capability implementations
// =============================================================================

/// Failures that will not clear on their own are logged at `error`,
/// transient ones at `debug`.
fn log_failure<T>(operation: &'static str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        if e.is_transient() {
            tracing::debug!(operation, error = %e, "transient TD Ameritrade failure");
        } else {
            tracing::error!(operation, error = %e, "TD Ameritrade request failed");
        }
    }
    result
}

#[async_trait]
impl QuoteProvider for TdaClient {
    async fn current_price(&self, instrument: &str) -> anyhow::Result<Decimal> {
        Ok(log_failure("quote", self.get_quote(instrument).await)?)
    }
}

#[async_trait]
impl ChainProvider for TdaClient {
    async fn chain(&self, instrument: &str, lookahead_days: u32) -> anyhow::Result<OptionChain> {
        let from = Local::now().date_naive();
        let to = from + chrono::Duration::days(i64::from(lookahead_days));
        Ok(log_failure(
            "option chain",
            self.get_option_chain(instrument, from, to).await,
        )?)
    }
}

#[async_trait]
impl OrderSubmitter for TdaClient {
    async fn submit_bracket_order(&self, order: &BracketOrder) -> anyhow::Result<OrderAck> {
        Ok(log_failure("order", self.place_bracket_order(order).await)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use secrecy::SecretString;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/v1/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "test-token",
                "expires_in": 1800
            })))
            .mount(server)
            .await;
    }

    fn client(server: &MockServer) -> TdaClient {
        let config = TdaClientConfig::default()
            .with_base_url(server.uri())
            .with_account_id("123456789");
        let credentials = TdaCredentials::new("APPKEY", SecretString::from("refresh".to_string()));
        TdaClient::new(config, credentials).unwrap()
    }

    fn order() -> BracketOrder {
        BracketOrder {
            capital: dec!(1000),
            symbol: "SPY_011924C400".to_string(),
            entry: dec!(0.55),
            limit: dec!(0.825),
            stop: dec!(0.275),
        }
    }

    #[test]
    fn test_client_config_builder() {
        let config = TdaClientConfig::default()
            .with_base_url("https://custom.url")
            .with_account_id("42")
            .with_rate_limit(nonzero!(60u32))
            .with_timeout_secs(10);

        assert_eq!(config.base_url, "https://custom.url");
        assert_eq!(config.account_id, "42");
        assert_eq!(config.requests_per_minute.get(), 60);
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(TdaClientConfig::default().base_url, TDA_API_URL);
    }

    #[test]
    fn test_new_rejects_empty_account() {
        let credentials = TdaCredentials::new("APPKEY", SecretString::from("refresh".to_string()));
        assert!(matches!(
            TdaClient::new(TdaClientConfig::default(), credentials),
            Err(TdaError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_symbol() {
        assert!(TdaClient::validate_symbol("SPY").is_ok());
        assert!(TdaClient::validate_symbol("$SPX.X").is_ok());
        assert!(TdaClient::validate_symbol("SPY_011924C400").is_ok());
        assert!(TdaClient::validate_symbol("").is_err());
        assert!(TdaClient::validate_symbol("../accounts").is_err());
        assert!(TdaClient::validate_symbol("SPY?apikey=1").is_err());
        assert!(TdaClient::validate_symbol(&"A".repeat(33)).is_err());
    }

    #[tokio::test]
    async fn test_get_quote() {
        let server = MockServer::start().await;
        mock_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/marketdata/SPY/quotes"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "SPY": {"symbol": "SPY", "lastPrice": 471.62, "mark": 471.6}
            })))
            .mount(&server)
            .await;

        let price = client(&server).current_price("SPY").await.unwrap();
        assert_eq!(price, dec!(471.62));
    }

    #[tokio::test]
    async fn test_get_quote_unknown_symbol() {
        let server = MockServer::start().await;
        mock_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/marketdata/ZZZZ/quotes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let err = client(&server).get_quote("ZZZZ").await.unwrap_err();
        assert!(matches!(err, TdaError::InvalidSymbol(_)));
    }

    #[tokio::test]
    async fn test_get_option_chain() {
        let server = MockServer::start().await;
        mock_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/marketdata/chains"))
            .and(query_param("symbol", "SPY"))
            .and(query_param("contractType", "ALL"))
            .and(query_param("fromDate", "2024-01-16"))
            .and(query_param("toDate", "2024-01-30"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "symbol": "SPY",
                "status": "SUCCESS",
                "callExpDateMap": {
                    "2024-01-19:3": {
                        "400.0": [{"symbol": "SPY_011924C400", "strikePrice": 400.0, "mark": 0.55, "totalVolume": 1200}]
                    }
                },
                "putExpDateMap": {}
            })))
            .mount(&server)
            .await;

        let from = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 1, 30).unwrap();
        let chain = client(&server).get_option_chain("SPY", from, to).await.unwrap();

        assert_eq!(chain.call.len(), 1);
        assert!(chain.put.is_empty());
        let contracts = chain.call.values().next().unwrap();
        assert_eq!(contracts[0].mark, dec!(0.55));
    }

    #[tokio::test]
    async fn test_place_bracket_order() {
        let server = MockServer::start().await;
        mock_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts/123456789/orders"))
            .and(body_partial_json(serde_json::json!({
                "orderStrategyType": "TRIGGER",
                "price": "0.55",
                "orderLegCollection": [{
                    "instruction": "BUY_TO_OPEN",
                    "quantity": 18,
                    "instrument": {"symbol": "SPY_011924C400", "assetType": "OPTION"}
                }]
            })))
            .respond_with(
                ResponseTemplate::new(201).insert_header(
                    "Location",
                    "https://api.tdameritrade.com/v1/accounts/123456789/orders/987654",
                ),
            )
            .expect(1)
            .mount(&server)
            .await;

        let ack = client(&server).submit_bracket_order(&order()).await.unwrap();
        assert_eq!(ack.order_id.as_deref(), Some("987654"));
    }

    #[tokio::test]
    async fn test_order_rejected_without_contracts() {
        let server = MockServer::start().await;
        let mut small = order();
        small.capital = dec!(20);

        let err = client(&server).place_bracket_order(&small).await.unwrap_err();
        assert!(matches!(err, TdaError::InvalidOrder(_)));
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let server = MockServer::start().await;
        mock_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/marketdata/SPY/quotes"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "15"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/marketdata/QQQ/quotes"))
            .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/marketdata/IWM/quotes"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client(&server);
        assert!(matches!(
            client.get_quote("SPY").await,
            Err(TdaError::RateLimit { retry_after_secs: 15 })
        ));
        assert!(matches!(
            client.get_quote("QQQ").await,
            Err(TdaError::Authentication(_))
        ));
        let err = client.get_quote("IWM").await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_capability_errors_keep_their_type() {
        let server = MockServer::start().await;
        mock_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/marketdata/SPY/quotes"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = client(&server).current_price("SPY").await.unwrap_err();
        let err = err.downcast_ref::<TdaError>().unwrap();
        assert!(matches!(err, TdaError::Api { status_code: 503, .. }));
        assert!(err.is_transient());

        assert!(log_failure::<()>("order", Err(TdaError::InvalidOrder("zero".to_string()))).is_err());
        assert_eq!(log_failure("quote", Ok(5)).unwrap(), 5);
    }
}
