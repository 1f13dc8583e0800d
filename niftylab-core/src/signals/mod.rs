//! Signal generation: one strategy per module, one shared contract.
//!
//! A strategy turns a price series into two boolean sequences, `entry` and
//! `exit`, aligned with the bars. Strategies never see cash, positions or
//! trades; the simulator alone decides what a signal does.
//!
//! # Crossing rule
//! "a crosses above b" at bar t means `a[t] > b[t]` and the relation did not
//! already hold at t-1. A bar where the previous relation is undefined
//! (warm-up) counts as "not above", so a relation that is already true on the
//! first fully defined bar fires. An undefined value at t never fires, and a
//! tie at t is not a cross.

pub mod bollinger_breakout;
pub mod config;
pub mod ma_crossover;
pub mod macd_signal;
pub mod momentum;
pub mod rsi_reversion;

use serde::{Deserialize, Serialize};

use crate::domain::PriceSeries;

pub use bollinger_breakout::BollingerBreakout;
pub use config::StrategyConfig;
pub use ma_crossover::MaCrossover;
pub use macd_signal::MacdSignal;
pub use momentum::Momentum;
pub use rsi_reversion::RsiReversion;

/// Entry and exit flags, one of each per bar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalPair {
    pub entry: Vec<bool>,
    pub exit: Vec<bool>,
}

impl SignalPair {
    /// No signal on any of `n` bars.
    pub fn quiet(n: usize) -> Self {
        Self {
            entry: vec![false; n],
            exit: vec![false; n],
        }
    }

    pub fn new(entry: Vec<bool>, exit: Vec<bool>) -> Self {
        debug_assert_eq!(entry.len(), exit.len(), "signal sequences must align");
        Self { entry, exit }
    }

    pub fn len(&self) -> usize {
        self.entry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_empty()
    }

    pub fn entry_count(&self) -> usize {
        self.entry.iter().filter(|&&e| e).count()
    }

    pub fn exit_count(&self) -> usize {
        self.exit.iter().filter(|&&e| e).count()
    }
}

/// A strategy's signal rule.
///
/// # Contract
/// - Output has exactly `series.len()` entries in each sequence.
/// - Same series and parameters → identical output; no state survives a call.
/// - Bars whose indicator values are undefined assert neither flag.
pub trait SignalGenerator: Send + Sync {
    /// Stable identifier (e.g. "ma_crossover").
    fn name(&self) -> &str;

    /// Shortest series on which any bar can carry a defined signal.
    fn min_bars(&self) -> usize;

    fn generate(&self, series: &PriceSeries) -> SignalPair;
}

/// Bars where `a` crosses above `b`.
pub fn crossed_above(a: &[f64], b: &[f64]) -> Vec<bool> {
    crossings(a, b, |x, y| x > y)
}

/// Bars where `a` crosses below `b`.
pub fn crossed_below(a: &[f64], b: &[f64]) -> Vec<bool> {
    crossings(a, b, |x, y| x < y)
}

/// Bars where `a` crosses above a constant level.
pub fn crossed_above_level(a: &[f64], level: f64) -> Vec<bool> {
    crossed_above(a, &vec![level; a.len()])
}

/// Bars where `a` crosses below a constant level.
pub fn crossed_below_level(a: &[f64], level: f64) -> Vec<bool> {
    crossed_below(a, &vec![level; a.len()])
}

/// NaN comparisons are false, which gives the crossing rule above: an
/// undefined current bar never holds, an undefined previous bar never "held".
fn crossings(a: &[f64], b: &[f64], holds: impl Fn(f64, f64) -> bool) -> Vec<bool> {
    debug_assert_eq!(a.len(), b.len());
    (0..a.len())
        .map(|t| {
            let now = holds(a[t], b[t]);
            let before = t > 0 && holds(a[t - 1], b[t - 1]);
            now && !before
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAN: f64 = f64::NAN;

    #[test]
    fn cross_above_requires_change_of_relation() {
        let a = [1.0, 2.0, 3.0, 3.0, 1.0, 4.0];
        let b = [2.0, 2.0, 2.0, 2.0, 2.0, 2.0];
        // t=1 tie is not a cross, t=2 crosses, t=3 already above, t=5 crosses again
        assert_eq!(
            crossed_above(&a, &b),
            vec![false, false, true, false, false, true]
        );
        assert_eq!(
            crossed_below(&a, &b),
            vec![true, false, false, false, true, false]
        );
    }

    #[test]
    fn tie_then_move_is_a_cross() {
        // prev <= threshold and curr > threshold
        let a = [2.0, 2.5];
        let b = [2.0, 2.0];
        assert_eq!(crossed_above(&a, &b), vec![false, true]);
    }

    #[test]
    fn undefined_current_never_fires() {
        let a = [1.0, NAN, 3.0];
        let b = [2.0, 2.0, NAN];
        assert_eq!(crossed_above(&a, &b), vec![false, false, false]);
        assert_eq!(crossed_below(&a, &b), vec![true, false, false]);
    }

    #[test]
    fn undefined_previous_counts_as_not_holding() {
        let a = [NAN, NAN, 5.0, 6.0];
        let b = [NAN, NAN, 4.0, 4.0];
        assert_eq!(crossed_above(&a, &b), vec![false, false, true, false]);
    }

    #[test]
    fn level_crossings() {
        let rsi = [NAN, 35.0, 29.0, 25.0, 31.0, 71.0, 75.0];
        assert_eq!(
            crossed_below_level(&rsi, 30.0),
            vec![false, false, true, false, false, false, false]
        );
        assert_eq!(
            crossed_above_level(&rsi, 70.0),
            vec![false, false, false, false, false, true, false]
        );
    }

    #[test]
    fn signal_pair_counts() {
        let pair = SignalPair::new(vec![true, false, true], vec![false, true, false]);
        assert_eq!(pair.len(), 3);
        assert_eq!(pair.entry_count(), 2);
        assert_eq!(pair.exit_count(), 1);
        assert_eq!(SignalPair::quiet(4).entry_count(), 0);
    }
}
