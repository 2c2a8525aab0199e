//! Concurrent snapshot fetching module
//!
//! Symbols are fetched in fixed-size batches. Members of a batch run
//! concurrently, batches run one after another with a pacing delay, and every
//! symbol is retried on its own until it succeeds or runs out of attempts.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::api::FinancialDataProvider;
use crate::errors::FetchError;
use crate::models::{FinancialSnapshot, SymbolAliases};

/// Configuration for batched fetching
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    pub batch_size: usize,
    pub batch_delay: Duration,
    /// Applied to the next delay after a batch with no successes.
    pub failure_multiplier: u32,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub symbol_timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            batch_size: 20,
            batch_delay: Duration::from_secs(1),
            failure_multiplier: 3,
            max_retries: 3,
            retry_base_delay: Duration::from_secs(2),
            symbol_timeout: Duration::from_secs(15),
        }
    }
}

/// Source of pacing and backoff delays.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Per-symbol retry state. `Attempting(n)` is the n-th attempt, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Idle,
    Attempting(u32),
    Succeeded,
    Exhausted,
}

impl RetryState {
    pub fn start(self) -> Self {
        match self {
            RetryState::Idle => RetryState::Attempting(1),
            other => other,
        }
    }

    pub fn on_success(self) -> Self {
        match self {
            RetryState::Attempting(_) => RetryState::Succeeded,
            other => other,
        }
    }

    pub fn on_failure(self, max_retries: u32) -> Self {
        match self {
            RetryState::Attempting(attempt) if attempt < max_retries => {
                RetryState::Attempting(attempt + 1)
            }
            RetryState::Attempting(_) => RetryState::Exhausted,
            other => other,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RetryState::Succeeded | RetryState::Exhausted)
    }
}

/// Final state of one symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Fetched(FinancialSnapshot),
    Missing { attempts: u32, reason: FetchError },
}

impl FetchOutcome {
    pub fn snapshot(&self) -> Option<&FinancialSnapshot> {
        match self {
            FetchOutcome::Fetched(snapshot) => Some(snapshot),
            FetchOutcome::Missing { .. } => None,
        }
    }
}

/// Results keyed by source-format symbol. Each key is written once.
#[derive(Debug, Default)]
pub struct SnapshotSet {
    outcomes: HashMap<String, FetchOutcome>,
}

impl SnapshotSet {
    /// Returns false, leaving the first outcome in place, if the symbol was
    /// already recorded.
    pub fn record(&mut self, symbol: impl Into<String>, outcome: FetchOutcome) -> bool {
        let symbol = symbol.into();
        if self.outcomes.contains_key(&symbol) {
            warn!("⚠️ Ignoring second result for {}", symbol);
            return false;
        }
        self.outcomes.insert(symbol, outcome);
        true
    }

    pub fn get(&self, symbol: &str) -> Option<&FetchOutcome> {
        self.outcomes.get(symbol)
    }

    pub fn snapshot(&self, symbol: &str) -> Option<&FinancialSnapshot> {
        self.get(symbol).and_then(FetchOutcome::snapshot)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn enriched_count(&self) -> usize {
        self.outcomes
            .values()
            .filter(|outcome| outcome.snapshot().is_some())
            .count()
    }

    /// Sorted for stable logging.
    pub fn missing_symbols(&self) -> Vec<&str> {
        let mut missing: Vec<&str> = self
            .outcomes
            .iter()
            .filter(|(_, outcome)| outcome.snapshot().is_none())
            .map(|(symbol, _)| symbol.as_str())
            .collect();
        missing.sort_unstable();
        missing
    }
}

/// Fetches one snapshot per symbol without ever failing the whole run.
pub struct DataFetcher {
    provider: Arc<dyn FinancialDataProvider>,
    aliases: SymbolAliases,
    settings: FetchSettings,
    clock: Arc<dyn Clock>,
}

impl DataFetcher {
    pub fn new(
        provider: Arc<dyn FinancialDataProvider>,
        aliases: SymbolAliases,
        settings: FetchSettings,
    ) -> Self {
        Self {
            provider,
            aliases,
            settings,
            clock: Arc::new(TokioClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn fetch_all(&self, symbols: &[String]) -> SnapshotSet {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = symbols
            .iter()
            .filter(|symbol| seen.insert(symbol.as_str()))
            .collect();

        let batch_size = self.settings.batch_size.max(1);
        let total_batches = unique.len().div_ceil(batch_size);
        info!(
            "🚀 Fetching {} symbols in {} batches of up to {}",
            unique.len(),
            total_batches,
            batch_size
        );

        let mut results = SnapshotSet::default();
        let mut next_delay = self.settings.batch_delay;

        for (index, batch) in unique.chunks(batch_size).enumerate() {
            if index > 0 {
                debug!("⏳ Waiting {:?} before batch {}", next_delay, index + 1);
                self.clock.sleep(next_delay).await;
            }
            info!("📦 Batch {}/{}: {} symbols", index + 1, total_batches, batch.len());

            let mut outcomes = stream::iter(batch.iter().copied())
                .map(|symbol| async move { (symbol, self.fetch_symbol(symbol).await) })
                .buffer_unordered(batch.len());

            let mut successes = 0;
            while let Some((symbol, outcome)) = outcomes.next().await {
                if outcome.snapshot().is_some() {
                    successes += 1;
                }
                results.record(symbol.as_str(), outcome);
            }

            next_delay = if successes == 0 {
                warn!(
                    "⚠️ Batch {} produced no results, slowing down next batch",
                    index + 1
                );
                self.settings.batch_delay * self.settings.failure_multiplier
            } else {
                self.settings.batch_delay
            };
        }

        info!("✅ Fetch completed");
        info!(
            "📊 Results: {} enriched, {} missing of {} requested",
            results.enriched_count(),
            results.len() - results.enriched_count(),
            unique.len()
        );
        results
    }

    /// Runs the retry state machine for one source-format symbol.
    pub async fn fetch_symbol(&self, symbol: &str) -> FetchOutcome {
        let provider_symbol = self.aliases.to_provider(symbol);
        if self.aliases.needs_conversion(symbol) {
            debug!("🔁 {} requested as {}", symbol, provider_symbol);
        }

        let max_retries = self.settings.max_retries.max(1);
        let mut state = RetryState::Idle.start();
        let mut last_error = None;

        while let RetryState::Attempting(attempt) = state {
            match self.attempt(symbol, provider_symbol).await {
                Ok(snapshot) => {
                    state = state.on_success();
                    debug!("✅ {} fetched on attempt {} ({:?})", symbol, attempt, state);
                    return FetchOutcome::Fetched(snapshot);
                }
                Err(err) => {
                    state = state.on_failure(max_retries);
                    if !state.is_terminal() {
                        let backoff = self.settings.retry_base_delay * attempt;
                        warn!(
                            "Attempt {} failed for {}: {}. Retrying in {:?}...",
                            attempt, symbol, err, backoff
                        );
                        self.clock.sleep(backoff).await;
                    }
                    last_error = Some(err);
                }
            }
        }

        let reason = last_error
            .unwrap_or_else(|| FetchError::Provider("no attempt was made".to_string()));
        error!("❌ {} missing after {} attempts: {}", symbol, max_retries, reason);
        FetchOutcome::Missing {
            attempts: max_retries,
            reason,
        }
    }

    async fn attempt(
        &self,
        symbol: &str,
        provider_symbol: &str,
    ) -> Result<FinancialSnapshot, FetchError> {
        // quota wait is not part of the symbol timeout
        self.provider.ready().await;

        let calls = async {
            let (quote, summary) = tokio::try_join!(
                self.provider.quote(provider_symbol),
                self.provider.summary(provider_symbol)
            )?;
            Ok(FinancialSnapshot::from_provider(symbol, &quote, &summary))
        };

        match tokio::time::timeout(self.settings.symbol_timeout, calls).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.settings.symbol_timeout)),
        }
    }
}
