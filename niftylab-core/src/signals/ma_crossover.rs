//! Moving average crossover: golden cross in, death cross out.

use crate::domain::PriceSeries;
use crate::error::ConfigError;
use crate::indicators::sma;

use super::{crossed_above, crossed_below, SignalGenerator, SignalPair};

/// Enters when the fast SMA crosses above the slow SMA, exits on the
/// reverse crossover.
#[derive(Debug, Clone)]
pub struct MaCrossover {
    fast: usize,
    slow: usize,
}

impl MaCrossover {
    pub fn new(fast: usize, slow: usize) -> Result<Self, ConfigError> {
        if fast == 0 {
            return Err(ConfigError::NonPositiveWindow { name: "fast" });
        }
        if slow == 0 {
            return Err(ConfigError::NonPositiveWindow { name: "slow" });
        }
        if fast >= slow {
            return Err(ConfigError::InvalidParameter {
                name: "fast",
                reason: format!("fast window ({fast}) must be shorter than slow ({slow})"),
            });
        }
        Ok(Self { fast, slow })
    }
}

impl SignalGenerator for MaCrossover {
    fn name(&self) -> &str {
        "ma_crossover"
    }

    fn min_bars(&self) -> usize {
        self.slow + 1
    }

    fn generate(&self, series: &PriceSeries) -> SignalPair {
        let closes = series.closes();
        let fast = sma(&closes, self.fast);
        let slow = sma(&closes, self.slow);
        SignalPair::new(crossed_above(&fast, &slow), crossed_below(&fast, &slow))
    }
}
