//! Relative Strength Index (RSI).
//!
//! Average gain and average loss are simple means of the last `window`
//! price changes (no Wilder smoothing).
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss).
//! First defined value at index `window` (needs window + 1 closes).
//! Edge cases: avg_loss == 0 → 100; no movement at all → 50.

use super::window_exhausts;

/// RSI over trailing simple averages of gains and losses.
pub fn rsi(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window_exhausts(window, n) {
        return result;
    }

    let changes: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

    // changes[k] is the move from bar k to bar k+1
    for i in window..n {
        let mut gain = 0.0;
        let mut loss = 0.0;
        let mut undefined = false;
        for &ch in &changes[i - window..i] {
            if ch.is_nan() {
                undefined = true;
                break;
            }
            if ch > 0.0 {
                gain += ch;
            } else {
                loss -= ch;
            }
        }
        if undefined {
            continue;
        }
        result[i] = rsi_from_averages(gain / window as f64, loss / window as f64);
    }
    result
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
