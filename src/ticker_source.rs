//! Loading the candidate universe from the source table.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{info, warn};

use crate::errors::SetupError;
use crate::models::{CandidateCompany, CellValue, Config};
use crate::utils::{parse_metric, try_parse_metric};

pub const SYMBOL: &str = "Symbol";
pub const COMPANY: &str = "Company";
pub const SECTOR: &str = "Sector";
pub const PE: &str = "P/E";
pub const NO_YEARS: &str = "No Years";
pub const PRICE: &str = "Price";
pub const DIV_YIELD: &str = "Div Yield";
pub const CURRENT_DIV: &str = "Current Div";
pub const PAYOUTS_PER_YEAR: &str = "Payouts/ Year";
pub const ANNUALIZED: &str = "Annualized";
pub const PREVIOUS_DIV: &str = "Previous Div";
pub const EX_DATE: &str = "Ex-Date";
pub const PAY_DATE: &str = "Pay-Date";
pub const DGR_1Y: &str = "DGR 1Y";
pub const EPS_1Y: &str = "EPS 1Y";

pub const REQUIRED_COLUMNS: [&str; 15] = [
    SYMBOL,
    COMPANY,
    SECTOR,
    PE,
    NO_YEARS,
    PRICE,
    DIV_YIELD,
    CURRENT_DIV,
    PAYOUTS_PER_YEAR,
    ANNUALIZED,
    PREVIOUS_DIV,
    EX_DATE,
    PAY_DATE,
    DGR_1Y,
    EPS_1Y,
];

const SPREADSHEET_CONTENT_TYPES: [&str; 2] = ["spreadsheetml", "ms-excel"];

/// xlsx files are zip archives.
const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";

/// Header name to column index.
struct ColumnIndex(HashMap<String, usize>);

impl ColumnIndex {
    fn from_header(header: &StringRecord, row: usize) -> Result<Self, SetupError> {
        let mut columns = HashMap::new();
        for (index, name) in header.iter().enumerate() {
            let name = name.trim();
            if !name.is_empty() {
                columns.entry(name.to_string()).or_insert(index);
            }
        }

        if let Some(missing) = REQUIRED_COLUMNS
            .iter()
            .find(|column| !columns.contains_key(**column))
        {
            return Err(SetupError::MissingColumn {
                column: missing.to_string(),
                row,
            });
        }
        Ok(Self(columns))
    }

    fn cell<'r>(&self, record: &'r StringRecord, column: &str) -> &'r str {
        self.0
            .get(column)
            .and_then(|index| record.get(*index))
            .map(str::trim)
            .unwrap_or("")
    }

    fn extra_columns(&self) -> impl Iterator<Item = (&String, &usize)> {
        self.0
            .iter()
            .filter(|(name, _)| !REQUIRED_COLUMNS.contains(&name.as_str()))
    }
}

fn optional_number(cell: &str) -> Option<f64> {
    if cell.is_empty() {
        None
    } else {
        try_parse_metric(cell).ok()
    }
}

fn optional_text(cell: &str) -> Option<String> {
    (!cell.is_empty()).then(|| cell.to_string())
}

fn whole_number(cell: &str) -> u32 {
    parse_metric(cell).max(0.0).round() as u32
}

/// Source table reader
pub struct TickerSource {
    path: PathBuf,
    header_row_offset: usize,
}

impl TickerSource {
    pub fn new(path: impl Into<PathBuf>, header_row_offset: usize) -> Self {
        Self {
            path: path.into(),
            header_row_offset,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.input_path, config.header_row_offset)
    }

    pub fn load(&self) -> Result<Vec<CandidateCompany>, SetupError> {
        if !self.path.exists() {
            return Err(SetupError::MissingInput(self.path.clone()));
        }
        let file = File::open(&self.path)?;
        let companies = self.read_from(file)?;
        info!(
            "📄 Loaded {} companies from {}",
            companies.len(),
            self.path.display()
        );
        Ok(companies)
    }

    pub fn read_from<R: Read>(&self, reader: R) -> Result<Vec<CandidateCompany>, SetupError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut records = reader.records();
        let mut header = None;
        for _ in 0..=self.header_row_offset {
            header = records.next().transpose()?;
            if header.is_none() {
                return Err(SetupError::MissingHeaderRow(self.header_row_offset));
            }
        }
        let header = header.ok_or(SetupError::MissingHeaderRow(self.header_row_offset))?;
        let columns = ColumnIndex::from_header(&header, self.header_row_offset)?;

        let mut companies = Vec::new();
        let mut seen = HashSet::new();
        for record in records {
            let record = record?;
            let symbol = columns.cell(&record, SYMBOL);
            if symbol.is_empty() {
                continue;
            }
            if !seen.insert(symbol.to_string()) {
                warn!("⚠️ Duplicate symbol {} in source table, keeping first row", symbol);
                continue;
            }
            companies.push(Self::company_from_row(&columns, &record));
        }
        Ok(companies)
    }

    fn company_from_row(columns: &ColumnIndex, record: &StringRecord) -> CandidateCompany {
        let cell = |column: &str| columns.cell(record, column);

        let mut company = CandidateCompany {
            source_pe: optional_number(cell(PE)),
            source_price: optional_number(cell(PRICE)),
            years_of_increases: whole_number(cell(NO_YEARS)),
            payouts_per_year: whole_number(cell(PAYOUTS_PER_YEAR)),
            dividend_yield: parse_metric(cell(DIV_YIELD)),
            current_dividend: optional_number(cell(CURRENT_DIV)),
            annualized_dividend: optional_number(cell(ANNUALIZED)),
            previous_dividend: optional_number(cell(PREVIOUS_DIV)),
            dividend_growth_1y: parse_metric(cell(DGR_1Y)),
            eps_growth_1y: optional_number(cell(EPS_1Y)),
            ex_dividend_date: optional_text(cell(EX_DATE)),
            pay_date: optional_text(cell(PAY_DATE)),
            ..CandidateCompany::new(cell(SYMBOL), cell(COMPANY), cell(SECTOR))
        };

        for (name, index) in columns.extra_columns() {
            let value = record.get(*index).map(str::trim).unwrap_or("");
            if !value.is_empty() {
                company.extra.insert(name.as_str(), CellValue::from_cell(value));
            }
        }
        company
    }
}

/// Download the source table export to `path`, replacing any previous copy.
/// Downloads a CSV export to `path`. Spreadsheet downloads (e.g. a Google
/// Sheets `format=xlsx` link) are rejected.
pub async fn download_source(url: &str, path: &Path) -> Result<(), SetupError> {
    info!("📥 Downloading source table from {}", url);
    let response = reqwest::get(url)
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|e| SetupError::Download(e.to_string()))?;

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if SPREADSHEET_CONTENT_TYPES
        .iter()
        .any(|marker| content_type.contains(marker))
    {
        return Err(SetupError::Download(format!(
            "{} returned {}, expected a CSV export",
            url, content_type
        )));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| SetupError::Download(e.to_string()))?;
    if body.starts_with(ZIP_SIGNATURE) {
        return Err(SetupError::Download(format!(
            "{} returned a zip archive, expected a CSV export",
            url
        )));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, &body).await?;
    info!("💾 Saved {} bytes to {}", body.len(), path.display());
    Ok(())
}
