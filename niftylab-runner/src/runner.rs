//! Single-pair backtest runner: wires signal generation, the simulator and
//! the performance analysis together for one (strategy, instrument) pair.
//!
//! No I/O happens here. Callers load the series first (see
//! [`crate::batch::SeriesSource`]).

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use niftylab_core::data::DataError;
use niftylab_core::domain::{EquityCurve, Interval, PriceSeries, Trade};
use niftylab_core::engine::{simulate, SimulatorConfig};
use niftylab_core::error::ConfigError;
use niftylab_core::signals::StrategyConfig;

use crate::metrics::KpiReport;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Current schema version for persisted results.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// How a backtest ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// The series is shorter than the strategy's warm-up. Nothing was
    /// simulated; the ledger is empty and the curve flat.
    InsufficientData { required: usize, available: usize },
}

impl RunStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }
}

/// Complete result of one backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub symbol: String,
    pub interval: Interval,
    pub strategy: StrategyConfig,
    pub strategy_label: String,
    /// Hash of the strategy parameters.
    pub fingerprint: String,
    pub status: RunStatus,
    pub bar_count: usize,
    pub warmup_bars: usize,

    // ── Signals ──
    pub entry_count: usize,
    pub exit_count: usize,
    /// Entry signals that found too little cash to buy one unit.
    pub skipped_entries: usize,

    pub trades: Vec<Trade>,
    pub equity_curve: EquityCurve,
    pub kpis: KpiReport,
}

/// Run one strategy over one series.
///
/// Invalid strategy or simulator parameters fail with `RunError::Config`
/// before anything runs. A series shorter than the strategy's warm-up is
/// not an error: the result carries `RunStatus::InsufficientData`.
pub fn run_backtest(
    series: &PriceSeries,
    strategy: &StrategyConfig,
    sim: &SimulatorConfig,
) -> Result<BacktestResult, RunError> {
    sim.validate()?;
    let generator = strategy.build()?;

    let warmup_bars = strategy.warmup_bars();
    let mut result = BacktestResult {
        schema_version: SCHEMA_VERSION,
        symbol: series.symbol().to_string(),
        interval: series.interval(),
        strategy: strategy.clone(),
        strategy_label: strategy.label(),
        fingerprint: strategy.fingerprint(),
        status: RunStatus::Completed,
        bar_count: series.len(),
        warmup_bars,
        entry_count: 0,
        exit_count: 0,
        skipped_entries: 0,
        trades: Vec::new(),
        equity_curve: EquityCurve::default(),
        kpis: KpiReport::empty(sim.starting_cash),
    };

    if series.len() < warmup_bars {
        debug!(
            symbol = series.symbol(),
            strategy = %result.strategy_label,
            required = warmup_bars,
            available = series.len(),
            "insufficient history, skipping simulation"
        );
        result.status = RunStatus::InsufficientData {
            required: warmup_bars,
            available: series.len(),
        };
        result.equity_curve = EquityCurve::flat(&series.timestamps(), sim.starting_cash);
        result.kpis = KpiReport::compute(&result.equity_curve.values(), &[], sim.starting_cash);
        return Ok(result);
    }

    let signals = generator.generate(series);
    let sim_result = simulate(series, &signals, sim)?;
    let kpis = KpiReport::compute(
        &sim_result.equity_curve.values(),
        &sim_result.trades,
        sim.starting_cash,
    );

    debug!(
        symbol = series.symbol(),
        strategy = %result.strategy_label,
        trades = sim_result.trades.len(),
        total_return = kpis.total_return,
        "backtest complete"
    );

    result.entry_count = signals.entry_count();
    result.exit_count = signals.exit_count();
    result.skipped_entries = sim_result.skipped_entries;
    result.trades = sim_result.trades;
    result.equity_curve = sim_result.equity_curve;
    result.kpis = kpis;
    Ok(result)
}
