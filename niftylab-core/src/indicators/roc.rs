//! Rate of Change (ROC) momentum.
//!
//! ROC[t] = (x[t] - x[t-window]) / x[t-window], as a fraction.
//! First defined value at index `window`.

use super::window_exhausts;

pub fn roc(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window_exhausts(window, n) {
        return result;
    }

    for i in window..n {
        let prev = values[i - window];
        let curr = values[i];
        if prev.is_nan() || curr.is_nan() || prev == 0.0 {
            continue;
        }
        result[i] = (curr - prev) / prev;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn roc_basic() {
        let result = roc(&[100.0, 110.0, 121.0], 1);
        assert!(result[0].is_nan());
        assert_approx(result[1], 0.10, DEFAULT_EPSILON);
        assert_approx(result[2], 0.10, DEFAULT_EPSILON);
    }

    #[test]
    fn roc_period_2() {
        let result = roc(&[100.0, 110.0, 121.0], 2);
        assert!(result[1].is_nan());
        assert_approx(result[2], 0.21, DEFAULT_EPSILON);
    }

    #[test]
    fn roc_negative() {
        let result = roc(&[100.0, 90.0], 1);
        assert_approx(result[1], -0.10, DEFAULT_EPSILON);
    }

    #[test]
    fn roc_zero_base_is_undefined() {
        let result = roc(&[0.0, 5.0, 6.0], 1);
        assert!(result[1].is_nan());
        assert_approx(result[2], 0.2, DEFAULT_EPSILON);
    }
}
