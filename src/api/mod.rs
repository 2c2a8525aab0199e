use std::num::NonZeroU32;

use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use serde::{Deserialize, Serialize};

use crate::errors::FetchError;
use crate::models::Reported;

pub mod yahoo_client;
mod yahoo_models;

pub use yahoo_client::YahooClient;

/// Request quota shared by all calls made through one client.
pub struct ApiRateLimiter {
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl ApiRateLimiter {
    /// A quota of zero requests per minute disables limiting.
    pub fn new(requests_per_minute: u32) -> Self {
        let limiter = NonZeroU32::new(requests_per_minute)
            .map(|per_minute| RateLimiter::direct(Quota::per_minute(per_minute)));
        Self { limiter }
    }

    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Waits for `cells` requests worth of quota.
    pub async fn wait_n(&self, cells: u32) {
        for _ in 0..cells {
            self.wait().await;
        }
    }
}

/// A provider value that may carry a formatted string, a raw number, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderField {
    #[serde(default)]
    pub fmt: Option<String>,
    #[serde(default)]
    pub raw: Option<f64>,
}

impl ProviderField {
    pub fn formatted(fmt: impl Into<String>) -> Self {
        Self {
            fmt: Some(fmt.into()),
            raw: None,
        }
    }

    pub fn raw(raw: f64) -> Self {
        Self {
            fmt: None,
            raw: Some(raw),
        }
    }

    /// Formatted representation first, raw number second.
    pub fn preferred(&self) -> Option<Reported> {
        self.fmt
            .as_deref()
            .map(str::trim)
            .filter(|fmt| !fmt.is_empty())
            .map(Reported::new)
            .or_else(|| {
                self.raw
                    .filter(|raw| raw.is_finite())
                    .map(|raw| Reported::new(raw.to_string()))
            })
    }
}

/// Result of the quote call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteData {
    pub price: Option<ProviderField>,
}

/// Result of the summary call; any subset of fields may be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryFields {
    pub market_cap: Option<ProviderField>,
    #[serde(rename = "trailingPE")]
    pub trailing_pe: Option<ProviderField>,
    #[serde(rename = "forwardPE")]
    pub forward_pe: Option<ProviderField>,
    pub beta: Option<ProviderField>,
    pub eps: Option<ProviderField>,
    pub enterprise_value: Option<ProviderField>,
    pub price_to_book: Option<ProviderField>,
    pub price_to_sales: Option<ProviderField>,
    pub ev_to_revenue: Option<ProviderField>,
    pub ev_to_ebitda: Option<ProviderField>,
    pub dividend_rate: Option<ProviderField>,
    pub ex_dividend_date: Option<ProviderField>,
    pub profit_margins: Option<ProviderField>,
    pub return_on_assets: Option<ProviderField>,
    pub return_on_equity: Option<ProviderField>,
    pub total_revenue: Option<ProviderField>,
    pub total_cash: Option<ProviderField>,
    pub debt_to_equity: Option<ProviderField>,
    pub freecashflow: Option<ProviderField>,
    pub target_mean_price: Option<ProviderField>,
}

/// External source of per-symbol financial data.
///
/// Symbols passed in are already in the provider's own format.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FinancialDataProvider: Send + Sync {
    /// Waits until one quote and one summary call may be sent. Callers await
    /// this before starting a timed attempt.
    async fn ready(&self) {}

    async fn quote(&self, symbol: &str) -> Result<QuoteData, FetchError>;

    /// All summary fields for one symbol in a single call.
    async fn summary(&self, symbol: &str) -> Result<SummaryFields, FetchError>;
}
