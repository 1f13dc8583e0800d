//! Momentum: rate of change crossing zero.

use crate::domain::PriceSeries;
use crate::error::ConfigError;
use crate::indicators::roc;

use super::{crossed_above_level, crossed_below_level, SignalGenerator, SignalPair};

#[derive(Debug, Clone)]
pub struct Momentum {
    window: usize,
}

impl Momentum {
    pub fn new(window: usize) -> Result<Self, ConfigError> {
        if window == 0 {
            return Err(ConfigError::NonPositiveWindow { name: "window" });
        }
        Ok(Self { window })
    }
}

impl SignalGenerator for Momentum {
    fn name(&self) -> &str {
        "momentum"
    }

    fn min_bars(&self) -> usize {
        self.window + 1
    }

    fn generate(&self, series: &PriceSeries) -> SignalPair {
        let values = roc(&series.closes(), self.window);
        SignalPair::new(
            crossed_above_level(&values, 0.0),
            crossed_below_level(&values, 0.0),
        )
    }
}
