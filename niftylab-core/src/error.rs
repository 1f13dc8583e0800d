//! Configuration errors shared by the simulator and the strategy factory.
//!
//! Invalid parameters are reported eagerly, before any bar is processed.
//! Nothing in the core clamps a bad value into range.

use thiserror::Error;

/// Invalid simulator or strategy parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("starting cash must be positive (got {0})")]
    NonPositiveStartingCash(f64),

    #[error("{name} must be non-negative (got {value})")]
    NegativeRate { name: &'static str, value: f64 },

    #[error("allocation must be in (0, 1] (got {0})")]
    AllocationOutOfRange(f64),

    #[error("indicator window '{name}' must be positive")]
    NonPositiveWindow { name: &'static str },

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}
