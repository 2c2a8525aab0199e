use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::{ProviderField, QuoteData, SummaryFields};
use crate::concurrent_fetcher::FetchSettings;
use crate::errors::SetupError;
use crate::notification::telegram::TelegramConfig;
use crate::utils::{parse_metric, try_parse_metric};

pub mod screening;
pub mod symbols;

pub use screening::{
    Check, Cohort, CohortKind, CompanyRecord, DerivedMetrics, FilterCriteria, FilterOutcome,
    ScreeningCohorts, SectorStat, ZeroDividendPolicy,
};
pub use symbols::SymbolAliases;

/// Bucket for companies without a sector classification.
pub const UNKNOWN_SECTOR: &str = "Unknown";

/// Value of a source column that has no typed field on [`CandidateCompany`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl CellValue {
    /// Plain numbers become [`CellValue::Number`], anything else stays text.
    pub fn from_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(number) if number.is_finite() => CellValue::Number(number),
            _ => CellValue::Text(trimmed.to_string()),
        }
    }
}

/// Unclassified source columns, keyed by header name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtraColumns(BTreeMap<String, CellValue>);

impl ExtraColumns {
    pub fn insert(&mut self, column: impl Into<String>, value: CellValue) {
        self.0.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.0.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CellValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One row of the source table. Created at ingestion and never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateCompany {
    pub symbol: String,
    pub company_name: String,
    pub sector: String,
    pub source_pe: Option<f64>,
    pub source_price: Option<f64>,
    pub years_of_increases: u32,
    pub payouts_per_year: u32,
    /// Percent, as printed in the source table.
    pub dividend_yield: f64,
    pub current_dividend: Option<f64>,
    pub annualized_dividend: Option<f64>,
    pub previous_dividend: Option<f64>,
    /// Percent.
    pub dividend_growth_1y: f64,
    pub eps_growth_1y: Option<f64>,
    pub ex_dividend_date: Option<String>,
    pub pay_date: Option<String>,
    #[serde(default)]
    pub extra: ExtraColumns,
}

impl CandidateCompany {
    /// Minimal company with zeroed fundamentals.
    pub fn new(symbol: impl Into<String>, company_name: impl Into<String>, sector: &str) -> Self {
        let sector = sector.trim();
        Self {
            symbol: symbol.into(),
            company_name: company_name.into(),
            sector: if sector.is_empty() {
                UNKNOWN_SECTOR.to_string()
            } else {
                sector.to_string()
            },
            source_pe: None,
            source_price: None,
            years_of_increases: 0,
            payouts_per_year: 0,
            dividend_yield: 0.0,
            current_dividend: None,
            annualized_dividend: None,
            previous_dividend: None,
            dividend_growth_1y: 0.0,
            eps_growth_1y: None,
            ex_dividend_date: None,
            pay_date: None,
            extra: ExtraColumns::default(),
        }
    }
}

/// A provider value exactly as reported, e.g. `"2.5B"` or `"18.25"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reported(String);

impl Reported {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric reading; malformed values read as zero.
    pub fn value(&self) -> f64 {
        parse_metric(&self.0)
    }

    pub fn number(&self) -> Option<f64> {
        try_parse_metric(&self.0).ok()
    }
}

/// Addressable fields of a [`FinancialSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotField {
    Price,
    Eps,
    DividendRate,
    MarketCap,
    TrailingPe,
    ForwardPe,
    Beta,
    EnterpriseValue,
    PriceToBook,
    PriceToSales,
    EvToRevenue,
    EvToEbitda,
    ProfitMargin,
    ReturnOnAssets,
    ReturnOnEquity,
    Revenue,
    TotalCash,
    DebtToEquity,
    FreeCashFlow,
    TargetMeanPrice,
    ExDividendDate,
}

/// Externally sourced metrics for one symbol, every field optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    /// Source-format symbol.
    pub symbol: String,
    pub price: Option<Reported>,
    pub eps: Option<Reported>,
    pub dividend_rate: Option<Reported>,
    pub market_cap: Option<Reported>,
    pub trailing_pe: Option<Reported>,
    pub forward_pe: Option<Reported>,
    pub beta: Option<Reported>,
    pub enterprise_value: Option<Reported>,
    pub price_to_book: Option<Reported>,
    pub price_to_sales: Option<Reported>,
    pub ev_to_revenue: Option<Reported>,
    pub ev_to_ebitda: Option<Reported>,
    pub profit_margin: Option<Reported>,
    pub return_on_assets: Option<Reported>,
    pub return_on_equity: Option<Reported>,
    pub revenue: Option<Reported>,
    pub total_cash: Option<Reported>,
    pub debt_to_equity: Option<Reported>,
    pub free_cash_flow: Option<Reported>,
    pub target_mean_price: Option<Reported>,
    pub ex_dividend_date: Option<Reported>,
}

fn preferred(field: &Option<ProviderField>) -> Option<Reported> {
    field.as_ref().and_then(ProviderField::preferred)
}

impl FinancialSnapshot {
    pub fn from_provider(symbol: impl Into<String>, quote: &QuoteData, summary: &SummaryFields) -> Self {
        Self {
            symbol: symbol.into(),
            price: preferred(&quote.price),
            eps: preferred(&summary.eps),
            dividend_rate: preferred(&summary.dividend_rate),
            market_cap: preferred(&summary.market_cap),
            trailing_pe: preferred(&summary.trailing_pe),
            forward_pe: preferred(&summary.forward_pe),
            beta: preferred(&summary.beta),
            enterprise_value: preferred(&summary.enterprise_value),
            price_to_book: preferred(&summary.price_to_book),
            price_to_sales: preferred(&summary.price_to_sales),
            ev_to_revenue: preferred(&summary.ev_to_revenue),
            ev_to_ebitda: preferred(&summary.ev_to_ebitda),
            profit_margin: preferred(&summary.profit_margins),
            return_on_assets: preferred(&summary.return_on_assets),
            return_on_equity: preferred(&summary.return_on_equity),
            revenue: preferred(&summary.total_revenue),
            total_cash: preferred(&summary.total_cash),
            debt_to_equity: preferred(&summary.debt_to_equity),
            free_cash_flow: preferred(&summary.freecashflow),
            target_mean_price: preferred(&summary.target_mean_price),
            ex_dividend_date: preferred(&summary.ex_dividend_date),
        }
    }

    pub fn get(&self, field: SnapshotField) -> Option<&Reported> {
        let value = match field {
            SnapshotField::Price => &self.price,
            SnapshotField::Eps => &self.eps,
            SnapshotField::DividendRate => &self.dividend_rate,
            SnapshotField::MarketCap => &self.market_cap,
            SnapshotField::TrailingPe => &self.trailing_pe,
            SnapshotField::ForwardPe => &self.forward_pe,
            SnapshotField::Beta => &self.beta,
            SnapshotField::EnterpriseValue => &self.enterprise_value,
            SnapshotField::PriceToBook => &self.price_to_book,
            SnapshotField::PriceToSales => &self.price_to_sales,
            SnapshotField::EvToRevenue => &self.ev_to_revenue,
            SnapshotField::EvToEbitda => &self.ev_to_ebitda,
            SnapshotField::ProfitMargin => &self.profit_margin,
            SnapshotField::ReturnOnAssets => &self.return_on_assets,
            SnapshotField::ReturnOnEquity => &self.return_on_equity,
            SnapshotField::Revenue => &self.revenue,
            SnapshotField::TotalCash => &self.total_cash,
            SnapshotField::DebtToEquity => &self.debt_to_equity,
            SnapshotField::FreeCashFlow => &self.free_cash_flow,
            SnapshotField::TargetMeanPrice => &self.target_mean_price,
            SnapshotField::ExDividendDate => &self.ex_dividend_date,
        };
        value.as_ref()
    }

    /// Numeric value of a field, zero when absent or malformed.
    pub fn value(&self, field: SnapshotField) -> f64 {
        self.get(field).map(Reported::value).unwrap_or(0.0)
    }
}

/// Configuration for one screening run
#[derive(Debug, Clone)]
pub struct Config {
    pub input_path: PathBuf,
    /// Zero-based row index of the header row in the source table.
    pub header_row_offset: usize,
    pub output_dir: PathBuf,
    /// CSV export of the source table, downloaded to `input_path` before the
    /// run. Must return CSV, not xlsx.
    pub source_url: Option<String>,
    pub rate_limit_per_minute: u32,
    pub fetch: FetchSettings,
    pub criteria: FilterCriteria,
    pub aliases: SymbolAliases,
    pub telegram: Option<TelegramConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("data/dividend-champions.csv"),
            header_row_offset: 2,
            output_dir: PathBuf::from("output"),
            source_url: None,
            rate_limit_per_minute: 120,
            fetch: FetchSettings::default(),
            criteria: FilterCriteria::default(),
            aliases: SymbolAliases::default(),
            telegram: None,
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T, SetupError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => {
            value.trim().parse().map_err(|_| SetupError::Config {
                key: key.to_string(),
                value,
            })
        }
        _ => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, SetupError> {
        dotenvy::dotenv().ok(); // Load .env file if it exists
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key/value source, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SetupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let fetch_defaults = defaults.fetch.clone();
        let criteria_defaults = defaults.criteria.clone();

        let batch_size: usize = parse_var(&lookup, "BATCH_SIZE", fetch_defaults.batch_size)?;
        if batch_size == 0 {
            return Err(SetupError::Config {
                key: "BATCH_SIZE".to_string(),
                value: batch_size.to_string(),
            });
        }
        if !(5..=20).contains(&batch_size) {
            warn!("⚠️ BATCH_SIZE {} is outside the intended range 5-20", batch_size);
        }

        let fetch = FetchSettings {
            batch_size,
            batch_delay: Duration::from_millis(parse_var(
                &lookup,
                "BATCH_DELAY_MS",
                fetch_defaults.batch_delay.as_millis() as u64,
            )?),
            failure_multiplier: parse_var(
                &lookup,
                "BATCH_FAILURE_MULTIPLIER",
                fetch_defaults.failure_multiplier,
            )?,
            max_retries: parse_var(&lookup, "MAX_RETRIES", fetch_defaults.max_retries)?.max(1),
            retry_base_delay: Duration::from_millis(parse_var(
                &lookup,
                "RETRY_BASE_DELAY_MS",
                fetch_defaults.retry_base_delay.as_millis() as u64,
            )?),
            symbol_timeout: Duration::from_secs(parse_var(
                &lookup,
                "SYMBOL_TIMEOUT_SECS",
                fetch_defaults.symbol_timeout.as_secs(),
            )?),
        };

        let criteria = FilterCriteria {
            min_years: parse_var(&lookup, "MIN_YEARS", criteria_defaults.min_years)?,
            min_dividend_yield: parse_var(
                &lookup,
                "MIN_DIVIDEND_YIELD",
                criteria_defaults.min_dividend_yield,
            )?,
            min_payouts_per_year: parse_var(
                &lookup,
                "MIN_PAYOUTS_PER_YEAR",
                criteria_defaults.min_payouts_per_year,
            )?,
            min_dgr_1y: parse_var(&lookup, "MIN_DGR_1Y", criteria_defaults.min_dgr_1y)?,
            min_market_cap: parse_var(&lookup, "MIN_MARKET_CAP", criteria_defaults.min_market_cap)?,
            max_payout_ratio: parse_var(
                &lookup,
                "MAX_PAYOUT_RATIO",
                criteria_defaults.max_payout_ratio,
            )?,
            zero_dividend: parse_var(
                &lookup,
                "ZERO_DIVIDEND_POLICY",
                criteria_defaults.zero_dividend,
            )?,
        };

        Ok(Config {
            input_path: lookup("INPUT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.input_path),
            header_row_offset: parse_var(&lookup, "HEADER_ROW_OFFSET", defaults.header_row_offset)?,
            output_dir: lookup("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            source_url: lookup("SOURCE_URL").filter(|url| !url.trim().is_empty()),
            rate_limit_per_minute: parse_var(
                &lookup,
                "RATE_LIMIT_PER_MINUTE",
                defaults.rate_limit_per_minute,
            )?,
            fetch,
            criteria,
            aliases: defaults.aliases,
            telegram: TelegramConfig::from_lookup(&lookup),
        })
    }
}
