//! Bollinger breakout: ride closes that escape the upper band.

use crate::domain::PriceSeries;
use crate::error::ConfigError;
use crate::indicators::bollinger;

use super::{crossed_above, crossed_below, SignalGenerator, SignalPair};

/// Enters when the close crosses above the upper band, exits when it
/// crosses below the lower band.
#[derive(Debug, Clone)]
pub struct BollingerBreakout {
    window: usize,
    k: f64,
}

impl BollingerBreakout {
    pub fn new(window: usize, k: f64) -> Result<Self, ConfigError> {
        if window == 0 {
            return Err(ConfigError::NonPositiveWindow { name: "window" });
        }
        if !k.is_finite() || k <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "k",
                reason: format!("band multiplier must be positive (got {k})"),
            });
        }
        Ok(Self { window, k })
    }
}

impl SignalGenerator for BollingerBreakout {
    fn name(&self) -> &str {
        "bollinger_breakout"
    }

    fn min_bars(&self) -> usize {
        self.window + 1
    }

    fn generate(&self, series: &PriceSeries) -> SignalPair {
        let closes = series.closes();
        let bands = bollinger(&closes, self.window, self.k);
        SignalPair::new(
            crossed_above(&closes, &bands.upper),
            crossed_below(&closes, &bands.lower),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_multiplier() {
        assert!(BollingerBreakout::new(20, 0.0).is_err());
        assert!(BollingerBreakout::new(20, f64::INFINITY).is_err());
        assert!(BollingerBreakout::new(0, 2.0).is_err());
        assert!(BollingerBreakout::new(20, 2.0).is_ok());
    }
}
