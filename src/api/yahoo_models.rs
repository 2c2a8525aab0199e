//! Response shapes of the Yahoo Finance `quote` and `quoteSummary` endpoints.

use serde::Deserialize;

use super::{ProviderField, SummaryFields};

/// Yahoo reports some values as bare numbers and others as `{raw, fmt}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum YahooValue {
    Number(f64),
    Field(ProviderField),
}

impl From<YahooValue> for ProviderField {
    fn from(value: YahooValue) -> Self {
        match value {
            YahooValue::Number(raw) => ProviderField::raw(raw),
            YahooValue::Field(field) => field,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuoteEnvelope {
    pub quote_response: QuoteResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuoteResponse {
    #[serde(default)]
    pub result: Option<Vec<QuoteResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuoteResult {
    pub symbol: String,
    #[serde(default)]
    pub regular_market_price: Option<YahooValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuoteSummaryEnvelope {
    pub quote_summary: QuoteSummaryResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuoteSummaryResponse {
    #[serde(default)]
    pub result: Option<Vec<QuoteSummaryResult>>,
    #[serde(default)]
    pub error: Option<YahooErrorBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct YahooErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuoteSummaryResult {
    #[serde(default)]
    pub summary_detail: Option<SummaryDetail>,
    #[serde(default)]
    pub default_key_statistics: Option<DefaultKeyStatistics>,
    #[serde(default)]
    pub financial_data: Option<FinancialData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SummaryDetail {
    pub market_cap: Option<ProviderField>,
    #[serde(rename = "trailingPE")]
    pub trailing_pe: Option<ProviderField>,
    #[serde(rename = "forwardPE")]
    pub forward_pe: Option<ProviderField>,
    #[serde(rename = "priceToSalesTrailing12Months")]
    pub price_to_sales: Option<ProviderField>,
    pub dividend_rate: Option<ProviderField>,
    pub ex_dividend_date: Option<ProviderField>,
    pub beta: Option<ProviderField>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DefaultKeyStatistics {
    pub beta: Option<ProviderField>,
    pub trailing_eps: Option<ProviderField>,
    pub enterprise_value: Option<ProviderField>,
    pub price_to_book: Option<ProviderField>,
    pub enterprise_to_revenue: Option<ProviderField>,
    pub enterprise_to_ebitda: Option<ProviderField>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FinancialData {
    pub profit_margins: Option<ProviderField>,
    pub return_on_assets: Option<ProviderField>,
    pub return_on_equity: Option<ProviderField>,
    pub total_revenue: Option<ProviderField>,
    pub total_cash: Option<ProviderField>,
    pub debt_to_equity: Option<ProviderField>,
    pub free_cashflow: Option<ProviderField>,
    pub target_mean_price: Option<ProviderField>,
}

impl From<QuoteSummaryResult> for SummaryFields {
    fn from(result: QuoteSummaryResult) -> Self {
        let detail = result.summary_detail.unwrap_or_default();
        let stats = result.default_key_statistics.unwrap_or_default();
        let financial = result.financial_data.unwrap_or_default();

        SummaryFields {
            market_cap: detail.market_cap,
            trailing_pe: detail.trailing_pe,
            forward_pe: detail.forward_pe,
            beta: stats.beta.or(detail.beta),
            eps: stats.trailing_eps,
            enterprise_value: stats.enterprise_value,
            price_to_book: stats.price_to_book,
            price_to_sales: detail.price_to_sales,
            ev_to_revenue: stats.enterprise_to_revenue,
            ev_to_ebitda: stats.enterprise_to_ebitda,
            dividend_rate: detail.dividend_rate,
            ex_dividend_date: detail.ex_dividend_date,
            profit_margins: financial.profit_margins,
            return_on_assets: financial.return_on_assets,
            return_on_equity: financial.return_on_equity,
            total_revenue: financial.total_revenue,
            total_cash: financial.total_cash,
            debt_to_equity: financial.debt_to_equity,
            freecashflow: financial.free_cashflow,
            target_mean_price: financial.target_mean_price,
        }
    }
}
