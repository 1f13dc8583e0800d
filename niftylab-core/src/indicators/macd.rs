//! MACD: moving average convergence/divergence.
//!
//! MACD line = EMA(fast) - EMA(slow); signal = EMA(MACD line, signal);
//! histogram = MACD line - signal. The MACD line is defined from index
//! slow-1, the signal line from slow+signal-2.

use super::ema::ema;
use super::window_exhausts;

#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    let n = values.len();
    if window_exhausts(fast, n) || window_exhausts(slow, n) || signal == 0 {
        return Macd {
            macd: vec![f64::NAN; n],
            signal: vec![f64::NAN; n],
            histogram: vec![f64::NAN; n],
        };
    }

    let fast_ema = ema(values, fast);
    let slow_ema = ema(values, slow);
    // NaN - x stays NaN, so the line is undefined until both EMAs are.
    let line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal_line = ema(&line, signal);
    let histogram = line.iter().zip(&signal_line).map(|(m, s)| m - s).collect();

    Macd {
        macd: line,
        signal: signal_line,
        histogram,
    }
}
