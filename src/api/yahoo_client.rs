use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use super::yahoo_models::{QuoteEnvelope, QuoteSummaryEnvelope};
use super::{ApiRateLimiter, FinancialDataProvider, ProviderField, QuoteData, SummaryFields};
use crate::errors::FetchError;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_COOKIE_URL: &str = "https://fc.yahoo.com";
const SUMMARY_MODULES: &str = "price,summaryDetail,financialData,defaultKeyStatistics";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

#[derive(Debug, Clone)]
struct YahooSession {
    cookie: String,
    crumb: String,
}

/// Yahoo Finance client authenticated with a session cookie and crumb.
///
/// Pacing happens in [`FinancialDataProvider::ready`], not per request.
pub struct YahooClient {
    client: Client,
    base_url: String,
    cookie_url: String,
    rate_limiter: ApiRateLimiter,
    session: Mutex<Option<YahooSession>>,
}

impl YahooClient {
    pub fn new(rate_limit_per_minute: u32) -> Result<Self, FetchError> {
        Self::with_endpoints(DEFAULT_BASE_URL, DEFAULT_COOKIE_URL, rate_limit_per_minute)
    }

    /// Client against explicit endpoints, e.g. a local mock server.
    pub fn with_endpoints(
        base_url: impl Into<String>,
        cookie_url: impl Into<String>,
        rate_limit_per_minute: u32,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cookie_url: cookie_url.into(),
            rate_limiter: ApiRateLimiter::new(rate_limit_per_minute),
            session: Mutex::new(None),
        })
    }

    async fn session(&self) -> Result<YahooSession, FetchError> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }

        info!("🔐 Requesting Yahoo session cookie and crumb");
        let response = self.client.get(&self.cookie_url).send().await?;
        // the cookie endpoint answers 404 but still sets the session cookie
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split_once(';').map_or(value, |(cookie, _)| cookie))
            .map(str::to_string)
            .ok_or_else(|| FetchError::Provider("no session cookie returned".to_string()))?;

        let response = self
            .client
            .get(format!("{}/v1/test/getcrumb", self.base_url))
            .header(header::COOKIE, &cookie)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(FetchError::Provider(format!(
                "crumb request failed with status {}",
                response.status()
            )));
        }
        let crumb = response.text().await?.trim().to_string();
        if crumb.is_empty() {
            return Err(FetchError::Provider("empty crumb".to_string()));
        }

        let session = YahooSession { cookie, crumb };
        *guard = Some(session.clone());
        Ok(session)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        symbol: &str,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let session = self.session().await?;

        let mut query: Vec<(&str, &str)> = params.to_vec();
        query.push(("crumb", session.crumb.as_str()));
        let url = Url::parse_with_params(&format!("{}{}", self.base_url, path), &query)?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(header::COOKIE, &session.cookie)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json::<T>().await?),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!("🔐 Yahoo rejected the session for {}, refreshing crumb", symbol);
                *self.session.lock().await = None;
                Err(FetchError::Provider(format!(
                    "unauthorized ({})",
                    response.status()
                )))
            }
            StatusCode::TOO_MANY_REQUESTS => Err(FetchError::RateLimited),
            StatusCode::NOT_FOUND => Err(FetchError::SymbolNotFound(symbol.to_string())),
            status => Err(FetchError::Provider(format!(
                "unexpected status {} for {}",
                status, symbol
            ))),
        }
    }
}

#[async_trait]
impl FinancialDataProvider for YahooClient {
    async fn ready(&self) {
        self.rate_limiter.wait_n(2).await;
    }

    async fn quote(&self, symbol: &str) -> Result<QuoteData, FetchError> {
        let envelope: QuoteEnvelope = self
            .get_json(symbol, "/v7/finance/quote", &[("symbols", symbol)])
            .await?;

        let result = envelope
            .quote_response
            .result
            .unwrap_or_default()
            .into_iter()
            .find(|quote| quote.symbol.eq_ignore_ascii_case(symbol))
            .ok_or_else(|| FetchError::SymbolNotFound(symbol.to_string()))?;

        Ok(QuoteData {
            price: result.regular_market_price.map(ProviderField::from),
        })
    }

    async fn summary(&self, symbol: &str) -> Result<SummaryFields, FetchError> {
        let envelope: QuoteSummaryEnvelope = self
            .get_json(
                symbol,
                &format!("/v10/finance/quoteSummary/{}", symbol),
                &[("modules", SUMMARY_MODULES)],
            )
            .await?;

        let response = envelope.quote_summary;
        if let Some(error) = response.error {
            return Err(FetchError::Provider(format!(
                "{}: {}",
                error.code.unwrap_or_default(),
                error.description.unwrap_or_default()
            )));
        }

        response
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(SummaryFields::from)
            .ok_or_else(|| FetchError::SymbolNotFound(symbol.to_string()))
    }
}
