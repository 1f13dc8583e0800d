//! Seeded synthetic price series for offline runs, tests and benchmarks.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{Bar, Interval, PriceSeries, SeriesError};

const START_PRICE: f64 = 1_000.0;
const DRIFT: f64 = 0.0002;
const VOLATILITY: f64 = 0.015;

/// Geometric random walk of `n` bars. Same `(symbol, interval, n, seed)`
/// always yields the same series.
pub fn random_walk(
    symbol: &str,
    interval: Interval,
    n: usize,
    seed: u64,
) -> Result<PriceSeries, SeriesError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let step = interval.step();
    let start = start_time(interval);

    let mut bars = Vec::with_capacity(n);
    let mut prev_close = START_PRICE;
    for i in 0..n {
        let open = prev_close;
        let close = open * (DRIFT + VOLATILITY * standard_normal(&mut rng)).exp();
        let wick_up = 1.0 + rng.gen::<f64>() * VOLATILITY * 0.5;
        let wick_down = 1.0 - rng.gen::<f64>() * VOLATILITY * 0.5;
        bars.push(Bar {
            timestamp: start + step * i as i32,
            open,
            high: open.max(close) * wick_up,
            low: open.min(close) * wick_down,
            close,
            volume: rng.gen_range(10_000..1_000_000),
        });
        prev_close = close;
    }
    PriceSeries::new(symbol, interval, bars)
}

/// Box-Muller transform.
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn start_time(interval: Interval) -> NaiveDateTime {
    let time = if interval.is_intraday() {
        NaiveTime::from_hms_opt(9, 15, 0).unwrap_or(NaiveTime::MIN)
    } else {
        NaiveTime::MIN
    };
    NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap_or_default()
        .and_time(time)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_series() {
        let a = random_walk("SYN1", Interval::Day1, 300, 42).unwrap();
        let b = random_walk("SYN1", Interval::Day1, 300, 42).unwrap();
        assert_eq!(a, b);
        let c = random_walk("SYN1", Interval::Day1, 300, 43).unwrap();
        assert_ne!(a.closes(), c.closes());
    }

    #[test]
    fn bars_are_sane_and_ascending() {
        let s = random_walk("SYN2", Interval::Minute5, 500, 7).unwrap();
        assert_eq!(s.len(), 500);
        assert!(s.bars().iter().all(Bar::is_sane));
        assert_eq!(s.first().unwrap().timestamp.to_string(), "2020-01-01 09:15:00");
    }

    #[test]
    fn zero_length_is_empty() {
        assert!(random_walk("SYN3", Interval::Day1, 0, 1).unwrap().is_empty());
    }
}
