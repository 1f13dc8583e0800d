//! Batch runner: every configured strategy against every instrument.
//!
//! Pairs are independent, so instruments are spread over a rayon pool with
//! no shared mutable state beyond a cancellation flag. A failure in one
//! pair becomes a row in the ranking table and never stops the batch.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use niftylab_core::data::{DataError, ParquetStore};
use niftylab_core::domain::{Interval, PriceSeries};
use niftylab_core::engine::SimulatorConfig;
use niftylab_core::error::ConfigError;
use niftylab_core::signals::StrategyConfig;

use crate::ranking::{RankingRow, RankingTable, RankingWeights};
use crate::runner::{run_backtest, BacktestResult};

// ─── Series sources ─────────────────────────────────────────────────

/// Supplies one instrument's series to the batch runner.
pub trait SeriesSource: Send + Sync {
    fn load(&self, symbol: &str) -> Result<PriceSeries, DataError>;
}

/// Series read from the Parquet store at a fixed interval.
pub struct StoreSource {
    store: ParquetStore,
    interval: Interval,
}

impl StoreSource {
    pub fn new(store: ParquetStore, interval: Interval) -> Self {
        Self { store, interval }
    }
}

impl SeriesSource for StoreSource {
    fn load(&self, symbol: &str) -> Result<PriceSeries, DataError> {
        self.store.load(symbol, self.interval)
    }
}

/// Series already in memory, keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    series: HashMap<String, PriceSeries>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series: PriceSeries) {
        self.series.insert(series.symbol().to_string(), series);
    }

    /// Symbols held, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.series.keys().cloned().collect();
        symbols.sort();
        symbols
    }
}

impl FromIterator<PriceSeries> for MemorySource {
    fn from_iter<I: IntoIterator<Item = PriceSeries>>(iter: I) -> Self {
        let mut source = Self::new();
        for series in iter {
            source.insert(series);
        }
        source
    }
}

impl SeriesSource for MemorySource {
    fn load(&self, symbol: &str) -> Result<PriceSeries, DataError> {
        self.series
            .get(symbol)
            .cloned()
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
    }
}

// ─── Batch runner ───────────────────────────────────────────────────

/// Everything one batch produced.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub table: RankingTable,
    /// Results of every pair that ran, in (symbol, strategy) input order.
    pub results: Vec<BacktestResult>,
    /// True when the cancellation flag stopped the batch early.
    pub cancelled: bool,
}

impl BatchReport {
    /// The full result behind a ranking row, if the pair ran.
    pub fn result_for(&self, row: &RankingRow) -> Option<&BacktestResult> {
        self.results
            .iter()
            .find(|r| r.fingerprint == row.fingerprint && r.symbol == row.symbol)
    }
}

pub struct BatchRunner {
    strategies: Vec<StrategyConfig>,
    sim: SimulatorConfig,
    weights: RankingWeights,
    parallel: bool,
    cancel: Arc<AtomicBool>,
}

impl BatchRunner {
    pub fn new(strategies: Vec<StrategyConfig>, sim: SimulatorConfig) -> Self {
        Self {
            strategies,
            sim,
            weights: RankingWeights::default(),
            parallel: true,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_weights(mut self, weights: RankingWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Serial and parallel runs produce identical reports.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Share a cancellation flag with the caller. Raising it from another
    /// thread stops the batch before the next symbol load or pair.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn strategies(&self) -> &[StrategyConfig] {
        &self.strategies
    }

    /// Check every parameter up front. A bad config aborts the batch
    /// before any pair runs. The same strategy may appear only once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sim.validate()?;
        let mut seen = HashSet::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            strategy.validate()?;
            if !seen.insert(strategy.fingerprint()) {
                return Err(ConfigError::InvalidParameter {
                    name: "strategies",
                    reason: format!("{} is listed more than once", strategy.label()),
                });
            }
        }
        self.weights.validate()
    }

    /// Run the {strategy x symbol} cross-product and rank the results.
    pub fn run(
        &self,
        source: &dyn SeriesSource,
        symbols: &[String],
    ) -> Result<BatchReport, ConfigError> {
        self.validate()?;
        let start = Instant::now();
        info!(
            symbols = symbols.len(),
            strategies = self.strategies.len(),
            parallel = self.parallel,
            "starting batch"
        );

        let per_symbol: Vec<SymbolOutcome> = if self.parallel {
            symbols
                .par_iter()
                .map(|symbol| self.run_symbol(source, symbol))
                .collect()
        } else {
            symbols
                .iter()
                .map(|symbol| self.run_symbol(source, symbol))
                .collect()
        };

        let mut rows = Vec::with_capacity(symbols.len() * self.strategies.len());
        let mut results = Vec::new();
        for outcome in per_symbol {
            rows.extend(outcome.rows);
            results.extend(outcome.results);
        }

        let cancelled = self.cancel.load(Ordering::Relaxed);
        let table = RankingTable::build(rows, &self.weights);
        info!(
            pairs = table.len(),
            scored = table.scored().count(),
            cancelled,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "batch complete"
        );
        Ok(BatchReport {
            table,
            results,
            cancelled,
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// All strategies on one symbol. The series is loaded once; a load
    /// failure fails every pair on the symbol.
    fn run_symbol(&self, source: &dyn SeriesSource, symbol: &str) -> SymbolOutcome {
        let mut outcome = SymbolOutcome::default();

        if self.is_cancelled() {
            outcome.rows = self
                .strategies
                .iter()
                .map(|s| RankingRow::cancelled(s, symbol))
                .collect();
            return outcome;
        }

        let series = match source.load(symbol) {
            Ok(series) => series,
            Err(e) => {
                warn!(symbol, error = %e, "failed to load series, skipping symbol");
                let reason = format!("load failed: {e}");
                outcome.rows = self
                    .strategies
                    .iter()
                    .map(|s| RankingRow::failed(s, symbol, reason.clone()))
                    .collect();
                return outcome;
            }
        };

        for strategy in &self.strategies {
            if self.is_cancelled() {
                outcome.rows.push(RankingRow::cancelled(strategy, symbol));
                continue;
            }
            match run_backtest(&series, strategy, &self.sim) {
                Ok(result) => {
                    if !result.status.is_completed() {
                        warn!(
                            symbol,
                            strategy = %result.strategy_label,
                            bars = result.bar_count,
                            required = result.warmup_bars,
                            "insufficient history"
                        );
                    }
                    outcome.rows.push(RankingRow::from_result(&result));
                    outcome.results.push(result);
                }
                Err(e) => {
                    warn!(symbol, strategy = %strategy.label(), error = %e, "backtest failed");
                    outcome
                        .rows
                        .push(RankingRow::failed(strategy, symbol, e.to_string()));
                }
            }
        }
        debug!(symbol, pairs = outcome.rows.len(), "symbol done");
        outcome
    }
}

#[derive(Default)]
struct SymbolOutcome {
    rows: Vec<RankingRow>,
    results: Vec<BacktestResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use niftylab_core::data::random_walk;

    use crate::ranking::Outcome;

    fn source(symbols: &[&str], bars: usize) -> MemorySource {
        symbols
            .iter()
            .enumerate()
            .map(|(i, s)| random_walk(s, Interval::Day1, bars, i as u64 + 1).unwrap())
            .collect()
    }

    fn symbols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn runs_full_cross_product() {
        let src = source(&["A.NS", "B.NS", "C.NS"], 300);
        let runner = BatchRunner::new(StrategyConfig::default_set(), SimulatorConfig::default());
        let report = runner.run(&src, &src.symbols()).unwrap();
        assert_eq!(report.table.len(), 15);
        assert_eq!(report.results.len(), 15);
        assert_eq!(report.table.scored().count(), 15);
        assert!(!report.cancelled);
    }

    #[test]
    fn missing_symbol_fails_every_pair_on_it() {
        let src = source(&["A.NS"], 300);
        let runner = BatchRunner::new(StrategyConfig::default_set(), SimulatorConfig::default());
        let report = runner.run(&src, &symbols(&["A.NS", "GONE.NS"])).unwrap();
        let failed: Vec<&RankingRow> = report
            .table
            .rows
            .iter()
            .filter(|r| r.symbol == "GONE.NS")
            .collect();
        assert_eq!(failed.len(), 5);
        assert!(failed
            .iter()
            .all(|r| matches!(r.outcome, Outcome::Failed { .. }) && r.score.is_none()));
        assert_eq!(report.table.scored().count(), 5);
    }

    #[test]
    fn short_series_rows_are_marked_not_dropped() {
        let src = source(&["SHORT.NS"], 20);
        let runner = BatchRunner::new(StrategyConfig::default_set(), SimulatorConfig::default());
        let report = runner.run(&src, &src.symbols()).unwrap();
        // Only RSI(14) and MOM(12) fit in 20 bars
        assert_eq!(report.table.len(), 5);
        assert_eq!(report.table.scored().count(), 2);
        assert!(report
            .table
            .unscored()
            .all(|r| matches!(r.outcome, Outcome::InsufficientData { available: 20, .. })));
    }

    #[test]
    fn invalid_config_aborts_before_running() {
        let runner = BatchRunner::new(
            vec![StrategyConfig::Momentum { window: 0 }],
            SimulatorConfig::default(),
        );
        assert!(runner.run(&MemorySource::new(), &symbols(&["A"])).is_err());
    }

    #[test]
    fn pre_set_cancel_flag_cancels_every_pair() {
        let src = source(&["A.NS", "B.NS"], 200);
        let runner = BatchRunner::new(StrategyConfig::default_set(), SimulatorConfig::default());
        runner.cancel_flag().store(true, Ordering::Relaxed);
        let report = runner.run(&src, &src.symbols()).unwrap();
        assert!(report.cancelled);
        assert!(report.results.is_empty());
        assert_eq!(report.table.len(), 10);
        assert!(report
            .table
            .rows
            .iter()
            .all(|r| r.outcome == Outcome::Cancelled));
    }

    #[test]
    fn result_lookup_by_row() {
        let src = source(&["A.NS"], 250);
        let runner = BatchRunner::new(
            vec![StrategyConfig::MaCrossover { fast: 5, slow: 20 }],
            SimulatorConfig::default(),
        );
        let report = runner.run(&src, &src.symbols()).unwrap();
        let row = &report.table.rows[0];
        let result = report.result_for(row).unwrap();
        assert_eq!(Some(&result.kpis), row.kpis.as_ref());
    }

    #[test]
    fn rows_find_their_own_result() {
        let src = source(&["A.NS", "B.NS"], 300);
        let runner = BatchRunner::new(StrategyConfig::default_set(), SimulatorConfig::default());
        let report = runner.run(&src, &src.symbols()).unwrap();
        for row in &report.table.rows {
            let result = report.result_for(row).unwrap();
            assert_eq!(result.symbol, row.symbol);
            assert_eq!(result.strategy_label, row.strategy);
            assert_eq!(Some(&result.kpis), row.kpis.as_ref());
        }
    }

    #[test]
    fn duplicate_strategies_are_rejected() {
        let ma = StrategyConfig::MaCrossover { fast: 5, slow: 20 };
        let runner = BatchRunner::new(vec![ma.clone(), ma], SimulatorConfig::default());
        let err = runner.run(&source(&["A.NS"], 100), &symbols(&["A.NS"]));
        assert!(matches!(
            err,
            Err(ConfigError::InvalidParameter { name: "strategies", .. })
        ));
    }
}
