//! RSI mean reversion: buy the oversold dip, sell the overbought rip.

use crate::domain::PriceSeries;
use crate::error::ConfigError;
use crate::indicators::rsi;

use super::{crossed_above_level, crossed_below_level, SignalGenerator, SignalPair};

/// Enters when RSI crosses below `oversold`, exits when it crosses above
/// `overbought`.
#[derive(Debug, Clone)]
pub struct RsiReversion {
    window: usize,
    oversold: f64,
    overbought: f64,
}

impl RsiReversion {
    pub fn new(window: usize, oversold: f64, overbought: f64) -> Result<Self, ConfigError> {
        if window == 0 {
            return Err(ConfigError::NonPositiveWindow { name: "window" });
        }
        let in_range = |v: f64| v.is_finite() && (0.0..=100.0).contains(&v);
        if !in_range(oversold) || !in_range(overbought) || oversold >= overbought {
            return Err(ConfigError::InvalidParameter {
                name: "oversold",
                reason: format!(
                    "thresholds must satisfy 0 <= oversold < overbought <= 100 \
                     (got {oversold}, {overbought})"
                ),
            });
        }
        Ok(Self {
            window,
            oversold,
            overbought,
        })
    }
}

impl SignalGenerator for RsiReversion {
    fn name(&self) -> &str {
        "rsi_reversion"
    }

    fn min_bars(&self) -> usize {
        self.window + 1
    }

    fn generate(&self, series: &PriceSeries) -> SignalPair {
        let values = rsi(&series.closes(), self.window);
        SignalPair::new(
            crossed_below_level(&values, self.oversold),
            crossed_above_level(&values, self.overbought),
        )
    }
}
