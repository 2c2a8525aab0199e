//! Structural properties of the cohorts over a varied universe

use pretty_assertions::assert_eq;

use dividend_screener::{
    analysis::{calculate_sector_averages, derive_metrics, FilterEngine},
    models::{
        CandidateCompany, CompanyRecord, FilterCriteria, FinancialSnapshot, Reported,
        ScreeningCohorts, ZeroDividendPolicy,
    },
};

use crate::common::logging::{init_test_logging, log_test_data, log_test_step};

const SECTORS: [&str; 4] = ["Utilities", "Industrials", "Financials", "Unknown"];

/// Deterministic spread of companies covering passing, failing, missing and
/// malformed values.
fn universe() -> Vec<CompanyRecord> {
    let mut companies = Vec::new();
    let mut snapshots = Vec::new();

    for i in 0..40u32 {
        let symbol = format!("T{:02}", i);
        let sector = SECTORS[(i % 4) as usize];
        let company = CandidateCompany {
            years_of_increases: (i * 7) % 30,
            payouts_per_year: if i % 5 == 0 { 2 } else { 4 },
            dividend_yield: 1.0 + (i % 6) as f64 * 0.6,
            dividend_growth_1y: (i % 9) as f64 * 1.5,
            ..CandidateCompany::new(symbol.clone(), format!("Company {}", i), sector)
        };

        let snapshot = (i % 11 != 0).then(|| FinancialSnapshot {
            symbol: symbol.clone(),
            price: Some(Reported::new(format!("{}", 20 + (i * 13) % 90))),
            eps: Some(Reported::new(format!("{}", (i as f64 % 7.0) - 1.0))),
            price_to_book: Some(Reported::new(if i % 8 == 0 {
                "N/A".to_string()
            } else {
                format!("{:.1}", 0.8 + (i % 5) as f64)
            })),
            dividend_rate: Some(Reported::new(format!("{:.2}", (i % 4) as f64 * 0.7))),
            market_cap: Some(Reported::new(match i % 4 {
                0 => "750M",
                1 => "2.5B",
                2 => "N/A",
                _ => "1.2T",
            })),
            trailing_pe: Some(Reported::new(format!("{}", (i as i32 % 30) - 5))),
            ..Default::default()
        });

        companies.push(company);
        snapshots.push(snapshot);
    }

    let stats = calculate_sector_averages(companies.iter().zip(&snapshots).map(|(c, s)| {
        (
            c.sector.as_str(),
            s.as_ref()
                .and_then(|s| s.trailing_pe.as_ref())
                .map(|pe| pe.value()),
        )
    }));

    companies
        .into_iter()
        .zip(snapshots)
        .map(|(company, snapshot)| {
            let sector_stat = stats.get(&company.sector).cloned();
            let metrics = derive_metrics(snapshot.as_ref(), sector_stat.as_ref());
            CompanyRecord {
                company,
                snapshot,
                sector_stat,
                metrics,
            }
        })
        .collect()
}

fn assert_nested(cohorts: &ScreeningCohorts) {
    for symbol in &cohorts.hard.symbols {
        assert!(cohorts.soft.contains(symbol), "{} hard but not soft", symbol);
    }
    for symbol in &cohorts.soft.symbols {
        assert!(cohorts.all.contains(symbol), "{} soft but not in all", symbol);
    }
}

/// Symbols of `subset` appear in the same relative order as in `all`.
fn assert_ordered(subset: &[String], all: &[String]) {
    let positions: Vec<usize> = subset
        .iter()
        .map(|s| all.iter().position(|a| a == s).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_hard_within_soft_within_all() {
    init_test_logging();
    log_test_step("Checking cohort nesting over default and relaxed criteria");

    let records = universe();
    let relaxed = FilterCriteria {
        min_years: 0,
        min_dividend_yield: 0.0,
        min_payouts_per_year: 0,
        min_dgr_1y: 0.0,
        min_market_cap: 0.0,
        ..FilterCriteria::default()
    };
    let strict = FilterCriteria {
        zero_dividend: ZeroDividendPolicy::Exclude,
        ..FilterCriteria::default()
    };

    for criteria in [FilterCriteria::default(), relaxed, strict] {
        let cohorts = FilterEngine::new(criteria).build_cohorts(&records);
        log_test_data("Cohort sizes", &(cohorts.all.len(), cohorts.soft.len(), cohorts.hard.len()));

        assert_eq!(cohorts.all.len(), records.len());
        assert_nested(&cohorts);
        assert_ordered(&cohorts.soft.symbols, &cohorts.all.symbols);
        assert_ordered(&cohorts.hard.symbols, &cohorts.all.symbols);
    }
}

#[test]
fn test_relaxing_criteria_never_shrinks_soft() {
    let records = universe();
    let default = FilterEngine::default().build_cohorts(&records);
    let relaxed = FilterEngine::new(FilterCriteria {
        min_years: 0,
        min_market_cap: 0.0,
        ..FilterCriteria::default()
    })
    .build_cohorts(&records);

    for symbol in &default.soft.symbols {
        assert!(relaxed.soft.contains(symbol));
    }
    assert!(relaxed.soft.len() >= default.soft.len());
}

#[test]
fn test_all_follows_input_order() {
    let records = universe();
    let cohorts = FilterEngine::default().build_cohorts(&records);
    let input: Vec<String> = records.iter().map(|r| r.company.symbol.clone()).collect();
    assert_eq!(cohorts.all.symbols, input);
}

#[test]
fn test_companies_without_data_never_pass() {
    let records = universe();
    let cohorts = FilterEngine::new(FilterCriteria {
        min_years: 0,
        min_dividend_yield: 0.0,
        min_payouts_per_year: 0,
        min_dgr_1y: 0.0,
        min_market_cap: 0.0,
        ..FilterCriteria::default()
    })
    .build_cohorts(&records);

    for record in records.iter().filter(|r| r.snapshot.is_none()) {
        assert!(!cohorts.soft.contains(&record.company.symbol));
    }
}

#[test]
fn test_metric_derivation_is_idempotent() {
    for record in universe() {
        let again = derive_metrics(record.snapshot.as_ref(), record.sector_stat.as_ref());
        assert_eq!(again, record.metrics);
    }
}
