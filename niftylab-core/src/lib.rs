//! NiftyLab Core: domain types, indicators, strategy signals and the
//! portfolio simulator, plus the data collaborators that feed them.
//!
//! The simulation path is pure: series in, signals, trades and equity out.
//! It reads no files, no environment and no global state. Everything under
//! [`data`] sits outside that path and is wired in by the caller.

pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod signals;

pub use domain::{Bar, EquityCurve, ExitReason, Interval, PriceSeries, Trade};
pub use engine::{simulate, SimulationResult, SimulatorConfig};
pub use error::ConfigError;
pub use signals::{SignalGenerator, SignalPair, StrategyConfig};
