//! Reference values for parsing, aggregation and derivation

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use test_log::test;

use dividend_screener::{
    analysis::{calculate_sector_averages, derive_metrics, FilterEngine},
    errors::SetupError,
    models::{
        CandidateCompany, Check, CompanyRecord, Config, FinancialSnapshot, Reported,
        SymbolAliases,
    },
    utils::{format_human, parse_metric},
};

#[test]
fn test_sector_average_ignores_missing_and_negative() {
    let stats = calculate_sector_averages([
        ("Utilities", Some(12.0)),
        ("Utilities", Some(18.0)),
        ("Utilities", None),
        ("Utilities", Some(-3.0)),
    ]);
    assert_eq!(stats["Utilities"].average_pe, 15.0);
}

#[test]
fn test_graham_example() {
    let snapshot = FinancialSnapshot {
        symbol: "EX".to_string(),
        price: Some(Reported::new("100")),
        eps: Some(Reported::new("5")),
        price_to_book: Some(Reported::new("2")),
        ..Default::default()
    };
    let metrics = derive_metrics(Some(&snapshot), None);

    assert_eq!(metrics.book_value_per_share, Some(50.0));
    assert_eq!(format!("{:.2}", metrics.intrinsic_value.unwrap()), "75.00");
    assert_eq!(format!("{:.2}", metrics.valuation_gap_pct.unwrap()), "33.33");
}

#[test]
fn test_magnitude_parsing() {
    assert_eq!(parse_metric("2.5B"), 2.5e9);
    assert_eq!(parse_metric("750M"), 7.5e8);
    assert_eq!(parse_metric("N/A"), 0.0);
    assert_eq!(format_human(2.5e9), "2.50B");
}

#[test]
fn test_unavailable_market_cap_fails_screen() {
    let company = CandidateCompany {
        years_of_increases: 30,
        payouts_per_year: 4,
        dividend_yield: 3.0,
        dividend_growth_1y: 6.0,
        ..CandidateCompany::new("EX", "Example", "Utilities")
    };
    let snapshot = FinancialSnapshot {
        symbol: "EX".to_string(),
        price: Some(Reported::new("40")),
        eps: Some(Reported::new("3")),
        market_cap: Some(Reported::new("N/A")),
        ..Default::default()
    };
    let record = CompanyRecord {
        metrics: derive_metrics(Some(&snapshot), None),
        company,
        snapshot: Some(snapshot),
        sector_stat: None,
    };

    let outcome = FilterEngine::default().evaluate(&record);
    assert_eq!(outcome.market_cap, Check::Failed);
    assert!(!outcome.passes_soft);
}

#[test]
fn test_alias_round_trip() {
    let aliases = SymbolAliases::default();
    assert_eq!(aliases.to_provider("BF.A"), "BF-A");
    assert_eq!(aliases.to_source(aliases.to_provider("BF.A")), "BF.A");
    assert_eq!(aliases.to_provider("JNJ"), "JNJ");
}

#[test]
fn test_config_rejects_unknown_policy() {
    let result = Config::from_lookup(|key| {
        (key == "ZERO_DIVIDEND_POLICY").then(|| "sometimes".to_string())
    });
    assert_matches!(result, Err(SetupError::Config { .. }));
}
