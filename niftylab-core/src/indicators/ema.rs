//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2/(n+1).
//! Seed: SMA of the first `n` defined values. Leading undefined input is
//! skipped, which lets the MACD signal line run over the MACD line.

use super::window_exhausts;

/// EMA of a slice, seeded with the SMA of its first `period` defined values.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window_exhausts(period, n) {
        return result;
    }

    let Some(start) = values.iter().position(|v| !v.is_nan()) else {
        return result;
    };
    let seed_end = start + period - 1;
    if seed_end >= n {
        return result;
    }

    let seed_window = &values[start..=seed_end];
    if seed_window.iter().any(|v| v.is_nan()) {
        return result;
    }
    let seed = seed_window.iter().sum::<f64>() / period as f64;
    result[seed_end] = seed;

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = seed;
    for i in (seed_end + 1)..n {
        if values[i].is_nan() {
            // Once tainted, the recursion never recovers.
            break;
        }
        let value = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = value;
        prev = value;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn ema_3_known_values() {
        // alpha = 0.5, seed at 2 = mean(10,11,12) = 11
        // EMA[3] = 0.5*13 + 0.5*11 = 12, EMA[4] = 0.5*14 + 0.5*12 = 13
        let result = ema(&[10.0, 11.0, 12.0, 13.0, 14.0], 3);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 11.0, DEFAULT_EPSILON);
        assert_approx(result[3], 12.0, DEFAULT_EPSILON);
        assert_approx(result[4], 13.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_skips_leading_undefined() {
        let result = ema(&[f64::NAN, f64::NAN, 10.0, 11.0, 12.0, 13.0], 3);
        assert!(result[..4].iter().all(|v| v.is_nan()));
        assert_approx(result[4], 11.0, DEFAULT_EPSILON);
        assert_approx(result[5], 12.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_nan_in_seed_produces_all_nan() {
        let result = ema(&[10.0, f64::NAN, 12.0, 13.0, 14.0], 3);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn ema_nan_after_seed_propagates() {
        let result = ema(&[10.0, 11.0, 12.0, f64::NAN, 14.0], 3);
        assert_approx(result[2], 11.0, DEFAULT_EPSILON);
        assert!(result[3].is_nan());
        assert!(result[4].is_nan());
    }

    #[test]
    fn ema_not_enough_defined_values() {
        let result = ema(&[f64::NAN, f64::NAN, f64::NAN, 1.0, 2.0], 3);
        assert!(result.iter().all(|v| v.is_nan()));
    }
}
