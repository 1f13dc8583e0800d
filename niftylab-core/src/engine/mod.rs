//! Portfolio simulation: one long-only position, driven bar by bar by a
//! signal pair.
//!
//! Per bar, in fixed order:
//!
//! 1. Exit: close an open position if the exit flag is set
//! 2. Entry: open a position if flat and the entry flag is set
//! 3. End of data: force-close a position still open on the final bar
//! 4. Mark-to-market: record cash + quantity × close

pub mod config;
pub mod cost_model;
pub mod simulator;

pub use config::SimulatorConfig;
pub use cost_model::{CostModel, Side};
pub use simulator::{simulate, SimulationResult};
