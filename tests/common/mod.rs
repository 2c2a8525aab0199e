//! Common test utilities and helpers

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use dividend_screener::{
    api::{FinancialDataProvider, ProviderField, QuoteData, SummaryFields},
    concurrent_fetcher::{Clock, FetchSettings},
    errors::FetchError,
    models::Config,
};

/// Source table fixtures
pub mod fixtures {
    use super::*;

    pub const HEADER: &str = "Symbol,Company,Sector,P/E,No Years,Price,Div Yield,Current Div,Payouts/ Year,Annualized,Previous Div,Ex-Date,Pay-Date,DGR 1Y,EPS 1Y";

    /// A source row with the fundamentals the soft screen looks at.
    pub fn row(symbol: &str, sector: &str, years: u32, yield_pct: f64, payouts: u32, dgr: f64) -> String {
        format!(
            "{symbol},{symbol} Corp,{sector},18.5,{years},50.00,{yield_pct},0.50,{payouts},2.00,0.48,2024-03-01,2024-03-15,{dgr},8.0"
        )
    }

    /// Title rows, header at offset 2, then the given rows.
    pub fn champions_csv(rows: &[String]) -> String {
        let mut lines = vec![
            "U.S. Dividend Champions,,,".to_string(),
            "Data as of 2024-03-08,,,".to_string(),
            HEADER.to_string(),
        ];
        lines.extend(rows.iter().cloned());
        lines.join("\n")
    }

    pub fn write_champions(dir: &Path, rows: &[String]) -> PathBuf {
        let path = dir.join("champions.csv");
        std::fs::write(&path, champions_csv(rows)).expect("failed to write fixture");
        path
    }

    /// Config pointed at temporary paths, with no pacing or backoff delay.
    pub fn test_config(input_path: PathBuf, output_dir: PathBuf) -> Config {
        Config {
            input_path,
            output_dir,
            rate_limit_per_minute: 0,
            fetch: FetchSettings {
                batch_size: 5,
                batch_delay: Duration::ZERO,
                retry_base_delay: Duration::ZERO,
                ..FetchSettings::default()
            },
            ..Config::default()
        }
    }
}

/// Provider fakes
pub mod providers {
    use super::*;

    #[derive(Debug, Clone)]
    pub struct Fundamentals {
        pub price: f64,
        pub eps: f64,
        pub price_to_book: f64,
        pub dividend_rate: f64,
        pub market_cap: &'static str,
        pub trailing_pe: f64,
    }

    impl Default for Fundamentals {
        fn default() -> Self {
            Self {
                price: 60.0,
                eps: 3.0,
                price_to_book: 1.5,
                dividend_rate: 1.8,
                market_cap: "250B",
                trailing_pe: 20.0,
            }
        }
    }

    /// Answers from a fixed table keyed by provider symbol; unknown symbols
    /// are not found.
    #[derive(Default)]
    pub struct StaticProvider {
        data: HashMap<String, Fundamentals>,
        pub requested: Mutex<Vec<String>>,
    }

    impl StaticProvider {
        pub fn with(mut self, symbol: &str, fundamentals: Fundamentals) -> Self {
            self.data.insert(symbol.to_string(), fundamentals);
            self
        }

        fn lookup(&self, symbol: &str) -> Result<&Fundamentals, FetchError> {
            self.data
                .get(symbol)
                .ok_or_else(|| FetchError::SymbolNotFound(symbol.to_string()))
        }
    }

    #[async_trait]
    impl FinancialDataProvider for StaticProvider {
        async fn quote(&self, symbol: &str) -> Result<QuoteData, FetchError> {
            self.requested.lock().unwrap().push(symbol.to_string());
            let data = self.lookup(symbol)?;
            Ok(QuoteData {
                price: Some(ProviderField::raw(data.price)),
            })
        }

        async fn summary(&self, symbol: &str) -> Result<SummaryFields, FetchError> {
            let data = self.lookup(symbol)?;
            Ok(SummaryFields {
                eps: Some(ProviderField::raw(data.eps)),
                price_to_book: Some(ProviderField::raw(data.price_to_book)),
                dividend_rate: Some(ProviderField::raw(data.dividend_rate)),
                market_cap: Some(ProviderField::formatted(data.market_cap)),
                trailing_pe: Some(ProviderField::raw(data.trailing_pe)),
                ..Default::default()
            })
        }
    }

    /// Fails the first `failures` quote calls for every symbol, then delegates.
    pub struct FlakyProvider {
        inner: StaticProvider,
        failures: u32,
        calls: Mutex<HashMap<String, u32>>,
        pub total_calls: AtomicU32,
    }

    impl FlakyProvider {
        pub fn new(inner: StaticProvider, failures: u32) -> Self {
            Self {
                inner,
                failures,
                calls: Mutex::new(HashMap::new()),
                total_calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl FinancialDataProvider for FlakyProvider {
        async fn quote(&self, symbol: &str) -> Result<QuoteData, FetchError> {
            self.total_calls.fetch_add(1, Ordering::SeqCst);
            let attempt = {
                let mut calls = self.calls.lock().unwrap();
                let count = calls.entry(symbol.to_string()).or_insert(0);
                *count += 1;
                *count
            };
            if attempt <= self.failures {
                return Err(FetchError::Provider(format!("attempt {} failed", attempt)));
            }
            self.inner.quote(symbol).await
        }

        async fn summary(&self, symbol: &str) -> Result<SummaryFields, FetchError> {
            self.inner.summary(symbol).await
        }
    }
}

/// Clock that records delays instead of sleeping.
#[derive(Default)]
pub struct RecordingClock {
    pub sleeps: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Clock for RecordingClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

/// Logging utilities for tests
pub mod logging {
    use std::sync::Once;
    use tracing::{debug, info};

    static INIT: Once = Once::new();

    /// Initialize test logging
    pub fn init_test_logging() {
        INIT.call_once(|| {
            // Only initialize if not already initialized
            let _ = tracing::subscriber::set_global_default(
                tracing_subscriber::fmt()
                    .with_env_filter("dividend_screener=debug,main=debug")
                    .with_test_writer()
                    .finish(),
            );
        });
    }

    /// Log test step
    pub fn log_test_step(step: &str) {
        info!("🧪 Test Step: {}", step);
    }

    /// Log test data
    pub fn log_test_data<T: std::fmt::Debug>(label: &str, data: &T) {
        debug!("📊 {}: {:?}", label, data);
    }
}
