//! MACD signal-line crossover.

use crate::domain::PriceSeries;
use crate::error::ConfigError;
use crate::indicators::macd;

use super::{crossed_above, crossed_below, SignalGenerator, SignalPair};

/// Enters when the MACD line crosses above its signal line, exits on the
/// reverse crossover.
#[derive(Debug, Clone)]
pub struct MacdSignal {
    fast: usize,
    slow: usize,
    signal: usize,
}

impl MacdSignal {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Result<Self, ConfigError> {
        for (name, window) in [("fast", fast), ("slow", slow), ("signal", signal)] {
            if window == 0 {
                return Err(ConfigError::NonPositiveWindow { name });
            }
        }
        if fast >= slow {
            return Err(ConfigError::InvalidParameter {
                name: "fast",
                reason: format!("fast EMA ({fast}) must be shorter than slow EMA ({slow})"),
            });
        }
        Ok(Self { fast, slow, signal })
    }
}

impl SignalGenerator for MacdSignal {
    fn name(&self) -> &str {
        "macd_signal"
    }

    /// The slow window must be shorter than the series, and the signal
    /// line needs `signal` defined MACD values.
    fn min_bars(&self) -> usize {
        (self.slow + 1).max(self.slow + self.signal - 1)
    }

    fn generate(&self, series: &PriceSeries) -> SignalPair {
        let m = macd(&series.closes(), self.fast, self.slow, self.signal);
        SignalPair::new(
            crossed_above(&m.macd, &m.signal),
            crossed_below(&m.macd, &m.signal),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Interval;
    use chrono::NaiveDate;

    #[test]
    fn min_bars_covers_signal_line() {
        assert_eq!(MacdSignal::new(12, 26, 9).unwrap().min_bars(), 34);
        assert_eq!(MacdSignal::new(12, 26, 1).unwrap().min_bars(), 27);
    }

    #[test]
    fn no_signal_before_signal_line_is_defined() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let closes: Vec<f64> = (0..120)
            .map(|i| 500.0 + (i as f64 * 0.2).sin() * 25.0)
            .collect();
        let series = PriceSeries::from_closes("HDFCBANK.NS", Interval::Day1, start, &closes)
            .unwrap();
        let sig = MacdSignal::new(12, 26, 9).unwrap().generate(&series);
        assert!(sig.entry[..33].iter().all(|&e| !e));
        assert!(sig.exit[..33].iter().all(|&e| !e));
        assert!(sig.entry_count() >= 1);
        assert!(sig.exit_count() >= 1);
    }

    #[test]
    fn rejects_bad_windows() {
        assert!(MacdSignal::new(26, 12, 9).is_err());
        assert!(MacdSignal::new(12, 26, 0).is_err());
    }
}
