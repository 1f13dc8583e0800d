//! Simple Moving Average (SMA).
//!
//! Arithmetic mean of the trailing `window` values.
//! First defined value at index window-1.

use super::window_exhausts;

/// Mean of the trailing `window` values of a slice.
///
/// Each window is summed from scratch so equal windows produce bit-equal
/// means; crossover detection compares these values for ties.
pub fn sma(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window_exhausts(window, n) {
        return result;
    }

    for i in (window - 1)..n {
        let slice = &values[i + 1 - window..=i];
        // NaN anywhere in the window propagates through the sum.
        result[i] = slice.iter().sum::<f64>() / window as f64;
    }
    result
}
