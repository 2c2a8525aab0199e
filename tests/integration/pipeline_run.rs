//! End-to-end screening runs against fake providers and temporary files

use std::sync::atomic::Ordering;
use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use dividend_screener::{
    errors::{ScreenerError, SetupError},
    models::CohortKind,
    report::TICKER_LIST_FILE,
    Pipeline,
};

use crate::common::{
    fixtures::{row, test_config, write_champions},
    logging::{init_test_logging, log_test_data, log_test_step},
    providers::{FlakyProvider, Fundamentals, StaticProvider},
    RecordingClock,
};

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
}

fn provider() -> StaticProvider {
    StaticProvider::default()
        // passes soft, price below the Graham estimate (42.43)
        .with("KO", Fundamentals { price: 40.0, ..Default::default() })
        // passes soft only
        .with("PEP", Fundamentals::default())
        // share class alias, too small
        .with("BF-B", Fundamentals { market_cap: "750M", ..Default::default() })
        // payout ratio 80%
        .with("T", Fundamentals { dividend_rate: 2.4, ..Default::default() })
}

#[tokio::test]
async fn test_full_run_writes_outputs() {
    init_test_logging();
    log_test_step("Running the pipeline end to end");

    let dir = tempfile::tempdir().unwrap();
    let input = write_champions(
        dir.path(),
        &[
            row("KO", "Consumer Staples", 62, 3.1, 4, 5.4),
            row("PEP", "Consumer Staples", 52, 3.0, 4, 7.0),
            row("BF.B", "Consumer Staples", 39, 2.1, 4, 5.0),
            row("T", "Communication", 10, 6.5, 4, 6.0),
            row("GONE", "Industrials", 20, 2.5, 4, 8.0),
            row("YOUNG", "Industrials", 2, 4.0, 4, 9.0),
        ],
    );
    let output_dir = dir.path().join("out");
    let provider = Arc::new(provider());
    let pipeline = Pipeline::new(test_config(input, output_dir.clone()), provider.clone())
        .with_clock(Arc::new(RecordingClock::default()));

    let summary = pipeline.run_on(run_date()).await.expect("run should succeed");
    log_test_data("Summary", &summary);

    assert_eq!(summary.requested, 6);
    assert_eq!(summary.enriched, 4);
    assert_eq!(summary.missing_symbols, vec!["GONE", "YOUNG"]);
    assert_eq!(summary.all_count, 6);
    assert_eq!(summary.soft_count, 2);
    assert_eq!(summary.hard_count, 1);

    let workbook = summary.workbook_path.unwrap();
    assert_eq!(workbook, output_dir.join("dividend-screen-2024-03-09.xlsx"));
    assert!(workbook.exists());

    let tickers = std::fs::read_to_string(output_dir.join(TICKER_LIST_FILE)).unwrap();
    assert_eq!(tickers, "KO\nPEP");

    // the share class was requested in provider format
    let requested = provider.requested.lock().unwrap();
    assert!(requested.iter().any(|s| s == "BF-B"));
    assert!(!requested.iter().any(|s| s == "BF.B"));
}

#[tokio::test]
async fn test_screen_keeps_source_symbols() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path().join("unused.csv"), dir.path().join("out"));
    let pipeline = Pipeline::new(config, Arc::new(provider()))
        .with_clock(Arc::new(RecordingClock::default()));

    let companies = dividend_screener::ticker_source::TickerSource::new("unused.csv", 2)
        .read_from(
            crate::common::fixtures::champions_csv(&[row("BF.B", "Consumer Staples", 39, 2.1, 4, 5.0)])
                .as_bytes(),
        )
        .unwrap();
    let run = pipeline.screen(companies).await;

    assert_eq!(run.cohorts.all.symbols, vec!["BF.B"]);
    let record = &run.records[0];
    assert_eq!(record.snapshot.as_ref().unwrap().symbol, "BF.B");
    assert!(run.missing_symbols.is_empty());
    // a single company forms its own sector benchmark
    assert_eq!(run.sector_stats["Consumer Staples"].average_pe, 20.0);
    assert_eq!(run.cohorts.iter().next().unwrap().kind, CohortKind::All);
}

#[tokio::test]
async fn test_flaky_provider_recovers_within_retries() {
    init_test_logging();
    log_test_step("Two failures per symbol, third attempt succeeds");

    let dir = tempfile::tempdir().unwrap();
    let input = write_champions(
        dir.path(),
        &[
            row("KO", "Consumer Staples", 62, 3.1, 4, 5.4),
            row("PEP", "Consumer Staples", 52, 3.0, 4, 7.0),
        ],
    );
    let provider = Arc::new(FlakyProvider::new(provider(), 2));
    let clock = Arc::new(RecordingClock::default());
    let pipeline = Pipeline::new(test_config(input, dir.path().join("out")), provider.clone())
        .with_clock(clock.clone());

    let summary = pipeline.run_on(run_date()).await.unwrap();

    assert_eq!(summary.enriched, 2);
    assert_eq!(summary.missing, 0);
    assert_eq!(provider.total_calls.load(Ordering::SeqCst), 6);
    // two backoff waits per symbol, no pause inside a single batch
    assert_eq!(clock.sleeps.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn test_missing_column_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.csv");
    std::fs::write(&input, "a\nb\nSymbol,Company,Sector,P/E\nKO,Coca-Cola,Consumer Staples,24").unwrap();
    let provider = Arc::new(StaticProvider::default());
    let pipeline = Pipeline::new(test_config(input, dir.path().join("out")), provider.clone());

    let result = pipeline.run_on(run_date()).await;

    assert_matches!(
        result,
        Err(ScreenerError::Setup(SetupError::MissingColumn { ref column, .. })) if column == "No Years"
    );
    // nothing was fetched
    assert!(provider.requested.lock().unwrap().is_empty());
    assert!(!dir.path().join("out").exists());
}

#[tokio::test]
async fn test_missing_input_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(
        test_config(dir.path().join("absent.csv"), dir.path().join("out")),
        Arc::new(StaticProvider::default()),
    );

    let result = pipeline.run_on(run_date()).await;

    assert_matches!(result, Err(ScreenerError::Setup(SetupError::MissingInput(_))));
}
