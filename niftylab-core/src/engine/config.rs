//! Simulator parameters.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Cash, friction and sizing parameters for one simulation.
///
/// Rates are fractions: `commission_rate = 0.001` is 0.1% of notional per
/// side, `slippage_rate = 0.0005` moves each fill 0.05% against the trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub starting_cash: f64,
    pub commission_rate: f64,
    pub slippage_rate: f64,
    /// Fraction of current cash committed on entry, in (0, 1].
    pub allocation: f64,
    /// Floor quantities to whole units. Leftover cash stays uninvested.
    pub whole_units: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            starting_cash: 100_000.0,
            commission_rate: 0.001,
            slippage_rate: 0.0005,
            allocation: 0.95,
            whole_units: false,
        }
    }
}

impl SimulatorConfig {
    /// No commission, no slippage.
    pub fn frictionless() -> Self {
        Self {
            commission_rate: 0.0,
            slippage_rate: 0.0,
            ..Self::default()
        }
    }

    /// Reject invalid parameters. Nothing is clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.starting_cash.is_finite() || self.starting_cash <= 0.0 {
            return Err(ConfigError::NonPositiveStartingCash(self.starting_cash));
        }
        for (name, value) in [
            ("commission_rate", self.commission_rate),
            ("slippage_rate", self.slippage_rate),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NegativeRate { name, value });
            }
        }
        if self.allocation.is_nan() || self.allocation <= 0.0 || self.allocation > 1.0 {
            return Err(ConfigError::AllocationOutOfRange(self.allocation));
        }
        Ok(())
    }
}
