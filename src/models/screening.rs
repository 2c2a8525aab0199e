//! Types produced by aggregation, derivation and filtering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{CandidateCompany, FinancialSnapshot};

/// Average trailing P/E of one sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorStat {
    pub sector: String,
    /// Number of companies with a positive trailing P/E.
    pub count: usize,
    pub average_pe: f64,
}

/// Per-company metrics computed from a snapshot and its sector benchmark.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub sector_average_pe: Option<f64>,
    pub pe_actual: Option<f64>,
    pub book_value_per_share: Option<f64>,
    pub intrinsic_value: Option<f64>,
    pub valuation_gap_pct: Option<f64>,
    pub payout_ratio_pct: Option<f64>,
}

/// Everything known about one candidate after enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyRecord {
    pub company: CandidateCompany,
    /// `None` when every fetch attempt failed.
    pub snapshot: Option<FinancialSnapshot>,
    pub sector_stat: Option<SectorStat>,
    pub metrics: DerivedMetrics,
}

impl CompanyRecord {
    pub fn symbol(&self) -> &str {
        &self.company.symbol
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CohortKind {
    All,
    Soft,
    Hard,
}

impl CohortKind {
    pub fn sheet_name(&self) -> &'static str {
        match self {
            CohortKind::All => "All Companies",
            CohortKind::Soft => "Soft Filter",
            CohortKind::Hard => "Hard Filter",
        }
    }
}

impl fmt::Display for CohortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CohortKind::All => write!(f, "All"),
            CohortKind::Soft => write!(f, "Soft"),
            CohortKind::Hard => write!(f, "Hard"),
        }
    }
}

/// Named, ordered list of symbols.
#[derive(Debug, Clone, PartialEq)]
pub struct Cohort {
    pub kind: CohortKind,
    pub symbols: Vec<String>,
}

impl Cohort {
    pub fn new(kind: CohortKind) -> Self {
        Self {
            kind,
            symbols: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningCohorts {
    pub all: Cohort,
    pub soft: Cohort,
    pub hard: Cohort,
}

impl ScreeningCohorts {
    /// Report order: All, Soft, Hard.
    pub fn iter(&self) -> impl Iterator<Item = &Cohort> {
        [&self.all, &self.soft, &self.hard].into_iter()
    }
}

/// What to do when EPS is positive but the dividend rate is not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZeroDividendPolicy {
    /// Skip the payout-ratio check.
    #[default]
    Skip,
    /// Treat the company as failing the payout-ratio check.
    Exclude,
}

impl FromStr for ZeroDividendPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(ZeroDividendPolicy::Skip),
            "exclude" => Ok(ZeroDividendPolicy::Exclude),
            other => Err(format!("unknown zero dividend policy: {}", other)),
        }
    }
}

/// Thresholds for the soft screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub min_years: u32,
    /// Percent.
    pub min_dividend_yield: f64,
    pub min_payouts_per_year: u32,
    /// Percent.
    pub min_dgr_1y: f64,
    pub min_market_cap: f64,
    /// Percent.
    pub max_payout_ratio: f64,
    pub zero_dividend: ZeroDividendPolicy,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            min_years: 5,
            min_dividend_yield: 2.0,
            min_payouts_per_year: 4,
            min_dgr_1y: 5.0,
            min_market_cap: 2_000_000_000.0,
            max_payout_ratio: 70.0,
            zero_dividend: ZeroDividendPolicy::Skip,
        }
    }
}

/// Result of one predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Passed,
    Failed,
    /// Not applicable; does not block the company.
    Skipped,
}

impl Check {
    pub fn from_bool(passed: bool) -> Self {
        if passed {
            Check::Passed
        } else {
            Check::Failed
        }
    }

    pub fn is_ok(&self) -> bool {
        !matches!(self, Check::Failed)
    }
}

/// Per-predicate results for one company.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub symbol: String,
    pub years_of_increases: Check,
    pub dividend_yield: Check,
    pub payouts_per_year: Check,
    pub dividend_growth: Check,
    pub market_cap: Check,
    pub positive_eps: Check,
    pub below_sector_pe: Check,
    pub payout_ratio: Check,
    pub below_intrinsic_value: Check,
    pub passes_soft: bool,
    pub passes_hard: bool,
}

impl FilterOutcome {
    pub fn checks(&self) -> [(&'static str, Check); 8] {
        [
            ("years_of_increases", self.years_of_increases),
            ("dividend_yield", self.dividend_yield),
            ("payouts_per_year", self.payouts_per_year),
            ("dividend_growth", self.dividend_growth),
            ("market_cap", self.market_cap),
            ("positive_eps", self.positive_eps),
            ("below_sector_pe", self.below_sector_pe),
            ("payout_ratio", self.payout_ratio),
        ]
    }

    /// Names of the soft predicates this company failed.
    pub fn failed_checks(&self) -> Vec<&'static str> {
        self.checks()
            .into_iter()
            .filter(|(_, check)| *check == Check::Failed)
            .map(|(name, _)| name)
            .collect()
    }
}
