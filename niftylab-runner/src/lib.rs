//! NiftyLab Runner: backtest orchestration on top of `niftylab-core`.
//!
//! This crate provides:
//! - Performance analysis (KPI report) over an equity curve and trade ledger
//! - The single-pair runner with insufficient-history handling
//! - The batch runner over {strategy x instrument} with cooperative cancellation
//! - Composite ranking and CSV/JSON export
//! - The TOML run configuration

pub mod batch;
pub mod config;
pub mod export;
pub mod metrics;
pub mod ranking;
pub mod runner;

pub use batch::{BatchReport, BatchRunner, MemorySource, SeriesSource, StoreSource};
pub use config::{RunConfig, RunConfigError};
pub use metrics::{annualized_sharpe, KpiReport};
pub use ranking::{Outcome, RankingRow, RankingTable, RankingWeights};
pub use runner::{run_backtest, BacktestResult, RunError, RunStatus};
