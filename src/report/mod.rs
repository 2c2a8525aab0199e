//! Tabular rendering of the screening cohorts.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use tracing::info;

use crate::errors::OutputError;
use crate::models::{CohortKind, CompanyRecord, Reported, ScreeningCohorts, SnapshotField};
use crate::utils::format_human;

pub mod xlsx;

pub use xlsx::write_workbook;

/// Rendering of an absent value.
pub const NOT_AVAILABLE: &str = "N/A";

pub const TICKER_LIST_FILE: &str = "tickers.txt";

/// One rendered cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    /// Rounded to and displayed with two decimals.
    Decimal(f64),
    Missing,
}

impl Cell {
    fn text(value: Option<&str>) -> Self {
        match value {
            Some(text) if !text.is_empty() => Cell::Text(text.to_string()),
            _ => Cell::Missing,
        }
    }

    fn number(value: Option<f64>) -> Self {
        value.map(Cell::Number).unwrap_or(Cell::Missing)
    }

    /// Parseable provider values become numbers, anything else stays text.
    fn reported(value: Option<&Reported>) -> Self {
        match value {
            Some(reported) => match reported.number() {
                Some(number) => Cell::Number(number),
                None => Cell::text(Some(reported.as_str())),
            },
            None => Cell::Missing,
        }
    }

    fn decimal(value: Option<f64>) -> Self {
        value
            .filter(|v| v.is_finite())
            .map(|v| Cell::Decimal((v * 100.0).round() / 100.0))
            .unwrap_or(Cell::Missing)
    }

    /// Display form, as a reader of the workbook would see it.
    pub fn display(&self) -> String {
        match self {
            Cell::Text(text) => text.clone(),
            Cell::Number(number) => number.to_string(),
            Cell::Decimal(number) => format!("{:.2}", number),
            Cell::Missing => NOT_AVAILABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Derived {
    SectorAveragePe,
    PeActual,
    IntrinsicValue,
    ValuationGap,
    PayoutRatio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnSource {
    Symbol,
    Company,
    Sector,
    Derived(Derived),
    Reported(SnapshotField),
    SourcePe,
    YearsOfIncreases,
    PayoutsPerYear,
    DividendYield,
    DividendGrowth,
    ExDividendDate,
    PayDate,
    MarketCap,
    MarketCapHuman,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub header: &'static str,
    pub width: f64,
    source: ColumnSource,
}

const fn column(header: &'static str, width: f64, source: ColumnSource) -> Column {
    Column {
        header,
        width,
        source,
    }
}

/// Shared column schema of every sheet.
pub const COLUMNS: [Column; 36] = [
    column("Symbol", 10.0, ColumnSource::Symbol),
    column("Company", 30.0, ColumnSource::Company),
    column("Sector", 22.0, ColumnSource::Sector),
    column("Sector Average P/E", 12.0, ColumnSource::Derived(Derived::SectorAveragePe)),
    column("Actual P/E", 12.0, ColumnSource::Derived(Derived::PeActual)),
    column("Price", 12.0, ColumnSource::Reported(SnapshotField::Price)),
    column("Intrinsic Value Estimate", 14.0, ColumnSource::Derived(Derived::IntrinsicValue)),
    column("Valuation Gap %", 12.0, ColumnSource::Derived(Derived::ValuationGap)),
    column("Reported P/E", 12.0, ColumnSource::SourcePe),
    column("No Years", 10.0, ColumnSource::YearsOfIncreases),
    column("Payouts/ Year", 10.0, ColumnSource::PayoutsPerYear),
    column("Div Yield", 10.0, ColumnSource::DividendYield),
    column("DGR 1Y", 10.0, ColumnSource::DividendGrowth),
    column("Dividend", 10.0, ColumnSource::Reported(SnapshotField::DividendRate)),
    column("Ex-Div Date", 14.0, ColumnSource::ExDividendDate),
    column("Pay-Date", 14.0, ColumnSource::PayDate),
    column("Payout Ratio %", 12.0, ColumnSource::Derived(Derived::PayoutRatio)),
    column("Market Cap", 18.0, ColumnSource::MarketCap),
    column("Market Cap (Human)", 14.0, ColumnSource::MarketCapHuman),
    column("Beta", 10.0, ColumnSource::Reported(SnapshotField::Beta)),
    column("EPS", 10.0, ColumnSource::Reported(SnapshotField::Eps)),
    column("Target Est", 12.0, ColumnSource::Reported(SnapshotField::TargetMeanPrice)),
    column("Enterprise Value", 16.0, ColumnSource::Reported(SnapshotField::EnterpriseValue)),
    column("Trailing P/E", 12.0, ColumnSource::Reported(SnapshotField::TrailingPe)),
    column("Forward P/E", 12.0, ColumnSource::Reported(SnapshotField::ForwardPe)),
    column("Price/Sales", 12.0, ColumnSource::Reported(SnapshotField::PriceToSales)),
    column("Price/Book", 12.0, ColumnSource::Reported(SnapshotField::PriceToBook)),
    column("EV/Revenue", 12.0, ColumnSource::Reported(SnapshotField::EvToRevenue)),
    column("EV/EBITDA", 12.0, ColumnSource::Reported(SnapshotField::EvToEbitda)),
    column("Profit Margin", 12.0, ColumnSource::Reported(SnapshotField::ProfitMargin)),
    column("ROA", 10.0, ColumnSource::Reported(SnapshotField::ReturnOnAssets)),
    column("ROE", 10.0, ColumnSource::Reported(SnapshotField::ReturnOnEquity)),
    column("Revenue", 14.0, ColumnSource::Reported(SnapshotField::Revenue)),
    column("Total Cash", 14.0, ColumnSource::Reported(SnapshotField::TotalCash)),
    column("Debt/Equity", 12.0, ColumnSource::Reported(SnapshotField::DebtToEquity)),
    column("Free Cash Flow", 14.0, ColumnSource::Reported(SnapshotField::FreeCashFlow)),
];

impl Column {
    fn render(&self, record: &CompanyRecord) -> Cell {
        let company = &record.company;
        let metrics = &record.metrics;
        let reported = |field| {
            record
                .snapshot
                .as_ref()
                .and_then(|snapshot| snapshot.get(field))
        };

        match self.source {
            ColumnSource::Symbol => Cell::Text(company.symbol.clone()),
            ColumnSource::Company => Cell::text(Some(company.company_name.as_str())),
            ColumnSource::Sector => Cell::Text(company.sector.clone()),
            ColumnSource::Derived(derived) => Cell::decimal(match derived {
                Derived::SectorAveragePe => metrics.sector_average_pe,
                Derived::PeActual => metrics.pe_actual,
                Derived::IntrinsicValue => metrics.intrinsic_value,
                Derived::ValuationGap => metrics.valuation_gap_pct,
                Derived::PayoutRatio => metrics.payout_ratio_pct,
            }),
            ColumnSource::Reported(field) => Cell::reported(reported(field)),
            ColumnSource::SourcePe => Cell::number(company.source_pe),
            ColumnSource::YearsOfIncreases => Cell::Number(company.years_of_increases as f64),
            ColumnSource::PayoutsPerYear => Cell::Number(company.payouts_per_year as f64),
            ColumnSource::DividendYield => Cell::Number(company.dividend_yield),
            ColumnSource::DividendGrowth => Cell::Number(company.dividend_growth_1y),
            ColumnSource::ExDividendDate => Cell::text(
                reported(SnapshotField::ExDividendDate)
                    .map(|r| r.as_str())
                    .or(company.ex_dividend_date.as_deref()),
            ),
            ColumnSource::PayDate => Cell::text(company.pay_date.as_deref()),
            ColumnSource::MarketCap => {
                Cell::number(reported(SnapshotField::MarketCap).and_then(Reported::number))
            }
            ColumnSource::MarketCapHuman => Cell::text(
                reported(SnapshotField::MarketCap)
                    .and_then(Reported::number)
                    .map(format_human)
                    .as_deref(),
            ),
        }
    }
}

/// One sheet of the report.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub kind: CohortKind,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn name(&self) -> &'static str {
        self.kind.sheet_name()
    }

    pub fn headers() -> impl Iterator<Item = &'static str> {
        COLUMNS.iter().map(|column| column.header)
    }

    /// Cell by symbol and header name.
    pub fn cell(&self, symbol: &str, header: &str) -> Option<&Cell> {
        let index = COLUMNS.iter().position(|column| column.header == header)?;
        self.rows
            .iter()
            .find(|row| matches!(row.first(), Some(Cell::Text(s)) if s == symbol))
            .and_then(|row| row.get(index))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub sheets: Vec<Sheet>,
}

impl Report {
    pub fn sheet(&self, kind: CohortKind) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.kind == kind)
    }
}

pub struct ReportBuilder;

impl ReportBuilder {
    /// One sheet per cohort, in All, Soft, Hard order.
    pub fn build(cohorts: &ScreeningCohorts, records: &[CompanyRecord]) -> Report {
        let by_symbol: HashMap<&str, &CompanyRecord> = records
            .iter()
            .map(|record| (record.symbol(), record))
            .collect();

        let sheets = cohorts
            .iter()
            .map(|cohort| Sheet {
                kind: cohort.kind,
                rows: cohort
                    .symbols
                    .iter()
                    .filter_map(|symbol| by_symbol.get(symbol.as_str()))
                    .map(|record| COLUMNS.iter().map(|column| column.render(record)).collect())
                    .collect(),
            })
            .collect();

        Report { sheets }
    }
}

/// `dividend-screen-YYYY-MM-DD.xlsx`
pub fn workbook_file_name(date: NaiveDate) -> String {
    format!("dividend-screen-{}.xlsx", date.format("%Y-%m-%d"))
}

/// Newline separated symbols, no trailing newline.
pub fn write_ticker_list(path: &Path, symbols: &[String]) -> Result<(), OutputError> {
    std::fs::write(path, symbols.join("\n"))?;
    info!("📝 Wrote {} tickers to {}", symbols.len(), path.display());
    Ok(())
}
