use tracing::{debug, info};

use crate::models::{
    Check, Cohort, CohortKind, CompanyRecord, FilterCriteria, FilterOutcome, ScreeningCohorts,
    SnapshotField, ZeroDividendPolicy,
};
use crate::utils::positive;

/// Applies the soft and hard screens to enriched companies.
pub struct FilterEngine {
    criteria: FilterCriteria,
}

impl FilterEngine {
    pub fn new(criteria: FilterCriteria) -> Self {
        Self { criteria }
    }

    pub fn evaluate(&self, record: &CompanyRecord) -> FilterOutcome {
        let criteria = &self.criteria;
        let company = &record.company;
        let snapshot_value = |field| {
            record
                .snapshot
                .as_ref()
                .map(|snapshot| snapshot.value(field))
                .unwrap_or(0.0)
        };

        let eps = snapshot_value(SnapshotField::Eps);
        let dividend_rate = snapshot_value(SnapshotField::DividendRate);
        let price = snapshot_value(SnapshotField::Price);

        let below_sector_pe = match (
            positive(snapshot_value(SnapshotField::TrailingPe)),
            record.metrics.sector_average_pe.and_then(positive),
        ) {
            (Some(pe), Some(sector_pe)) => Check::from_bool(pe <= sector_pe),
            _ => Check::Skipped,
        };

        let payout_ratio = if eps <= 0.0 {
            Check::Skipped
        } else if dividend_rate > 0.0 {
            let ratio = dividend_rate / eps * 100.0;
            Check::from_bool(ratio <= criteria.max_payout_ratio)
        } else {
            match criteria.zero_dividend {
                ZeroDividendPolicy::Skip => Check::Skipped,
                ZeroDividendPolicy::Exclude => Check::Failed,
            }
        };

        let mut outcome = FilterOutcome {
            symbol: company.symbol.clone(),
            years_of_increases: Check::from_bool(
                company.years_of_increases >= criteria.min_years,
            ),
            dividend_yield: Check::from_bool(company.dividend_yield >= criteria.min_dividend_yield),
            payouts_per_year: Check::from_bool(
                company.payouts_per_year >= criteria.min_payouts_per_year,
            ),
            dividend_growth: Check::from_bool(company.dividend_growth_1y >= criteria.min_dgr_1y),
            market_cap: Check::from_bool(
                snapshot_value(SnapshotField::MarketCap) >= criteria.min_market_cap,
            ),
            positive_eps: Check::from_bool(eps > 0.0),
            below_sector_pe,
            payout_ratio,
            below_intrinsic_value: match record.metrics.intrinsic_value {
                Some(iv) if price > 0.0 => Check::from_bool(price < iv),
                _ => Check::Failed,
            },
            passes_soft: false,
            passes_hard: false,
        };

        outcome.passes_soft = outcome.checks().iter().all(|(_, check)| check.is_ok());
        outcome.passes_hard =
            outcome.passes_soft && outcome.below_intrinsic_value == Check::Passed;
        outcome
    }

    /// Builds the All, Soft and Hard cohorts, keeping input order.
    pub fn build_cohorts(&self, records: &[CompanyRecord]) -> ScreeningCohorts {
        let mut all = Cohort::new(CohortKind::All);
        let mut soft = Cohort::new(CohortKind::Soft);
        let mut hard = Cohort::new(CohortKind::Hard);

        for record in records {
            let outcome = self.evaluate(record);
            all.symbols.push(outcome.symbol.clone());
            if outcome.passes_soft {
                soft.symbols.push(outcome.symbol.clone());
            } else {
                debug!("{} failed: {}", outcome.symbol, outcome.failed_checks().join(", "));
            }
            if outcome.passes_hard {
                hard.symbols.push(outcome.symbol);
            }
        }

        info!(
            "🔍 Screening complete: {} companies, {} pass soft filter, {} pass hard filter",
            all.len(),
            soft.len(),
            hard.len()
        );

        ScreeningCohorts { all, soft, hard }
    }
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new(FilterCriteria::default())
    }
}
