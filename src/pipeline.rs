//! One screening run from source table to written report.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use crate::analysis::{derive_metrics, sector_averages, FilterEngine};
use crate::api::FinancialDataProvider;
use crate::concurrent_fetcher::{Clock, DataFetcher};
use crate::errors::{OutputError, ScreenerError};
use crate::models::{CandidateCompany, CompanyRecord, Config, ScreeningCohorts, SectorStat};
use crate::report::{
    workbook_file_name, write_ticker_list, write_workbook, ReportBuilder, TICKER_LIST_FILE,
};
use crate::ticker_source::{download_source, TickerSource};

/// Outcome of enrichment, aggregation, derivation and filtering.
#[derive(Debug, Clone)]
pub struct ScreeningRun {
    pub records: Vec<CompanyRecord>,
    pub sector_stats: BTreeMap<String, SectorStat>,
    pub cohorts: ScreeningCohorts,
    pub missing_symbols: Vec<String>,
}

impl ScreeningRun {
    pub fn summary(&self) -> RunSummary {
        let requested = self.records.len();
        RunSummary {
            requested,
            enriched: requested - self.missing_symbols.len(),
            missing: self.missing_symbols.len(),
            missing_symbols: self.missing_symbols.clone(),
            sectors: self.sector_stats.len(),
            all_count: self.cohorts.all.len(),
            soft_count: self.cohorts.soft.len(),
            hard_count: self.cohorts.hard.len(),
            workbook_path: None,
            ticker_list_path: None,
        }
    }
}

/// Counts reported at the end of every run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub requested: usize,
    pub enriched: usize,
    pub missing: usize,
    pub missing_symbols: Vec<String>,
    pub sectors: usize,
    pub all_count: usize,
    pub soft_count: usize,
    pub hard_count: usize,
    pub workbook_path: Option<PathBuf>,
    pub ticker_list_path: Option<PathBuf>,
}

impl RunSummary {
    pub fn log(&self) {
        info!("📊 Run summary");
        info!("  Requested symbols: {}", self.requested);
        info!("  Enriched symbols:  {}", self.enriched);
        info!("  Sectors with P/E:  {}", self.sectors);
        info!(
            "  Cohorts: {} all, {} soft, {} hard",
            self.all_count, self.soft_count, self.hard_count
        );
        if self.missing > 0 {
            warn!(
                "  Missing symbols ({}): {}",
                self.missing,
                self.missing_symbols.join(", ")
            );
        }
    }
}

pub struct Pipeline {
    config: Config,
    provider: Arc<dyn FinancialDataProvider>,
    clock: Option<Arc<dyn Clock>>,
}

impl Pipeline {
    pub fn new(config: Config, provider: Arc<dyn FinancialDataProvider>) -> Self {
        Self {
            config,
            provider,
            clock: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Enrich, aggregate, derive and filter an already loaded universe.
    pub async fn screen(&self, companies: Vec<CandidateCompany>) -> ScreeningRun {
        let symbols: Vec<String> = companies.iter().map(|c| c.symbol.clone()).collect();

        let mut fetcher = DataFetcher::new(
            Arc::clone(&self.provider),
            self.config.aliases.clone(),
            self.config.fetch.clone(),
        );
        if let Some(clock) = &self.clock {
            fetcher = fetcher.with_clock(Arc::clone(clock));
        }
        let snapshots = fetcher.fetch_all(&symbols).await;

        let sector_stats = sector_averages(&companies, &snapshots);
        for stat in sector_stats.values() {
            info!(
                "🏷️ {}: average P/E {:.2} over {} companies",
                stat.sector, stat.average_pe, stat.count
            );
        }

        let records: Vec<CompanyRecord> = companies
            .into_iter()
            .map(|company| {
                let snapshot = snapshots.snapshot(&company.symbol).cloned();
                let sector_stat = sector_stats.get(&company.sector).cloned();
                let metrics = derive_metrics(snapshot.as_ref(), sector_stat.as_ref());
                CompanyRecord {
                    company,
                    snapshot,
                    sector_stat,
                    metrics,
                }
            })
            .collect();

        let cohorts = FilterEngine::new(self.config.criteria.clone()).build_cohorts(&records);
        let missing_symbols = records
            .iter()
            .filter(|record| record.snapshot.is_none())
            .map(|record| record.symbol().to_string())
            .collect();

        ScreeningRun {
            records,
            sector_stats,
            cohorts,
            missing_symbols,
        }
    }

    pub async fn run(&self) -> Result<RunSummary, ScreenerError> {
        self.run_on(Local::now().date_naive()).await
    }

    /// Full run, naming the workbook after `date`.
    pub async fn run_on(&self, date: NaiveDate) -> Result<RunSummary, ScreenerError> {
        info!("🚀 Starting dividend screening run");

        if let Some(url) = &self.config.source_url {
            download_source(url, &self.config.input_path).await?;
        }
        let companies = TickerSource::from_config(&self.config).load()?;

        let run = self.screen(companies).await;
        let mut summary = run.summary();
        summary.log();

        std::fs::create_dir_all(&self.config.output_dir).map_err(OutputError::from)?;

        let report = ReportBuilder::build(&run.cohorts, &run.records);
        let workbook_path = self.config.output_dir.join(workbook_file_name(date));
        write_workbook(&report, &workbook_path)?;

        let ticker_list_path = self.config.output_dir.join(TICKER_LIST_FILE);
        write_ticker_list(&ticker_list_path, &run.cohorts.soft.symbols)?;

        summary.workbook_path = Some(workbook_path);
        summary.ticker_list_path = Some(ticker_list_path);
        info!("✅ Screening run completed");
        Ok(summary)
    }
}
