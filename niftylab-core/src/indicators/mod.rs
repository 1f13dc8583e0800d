//! Indicator library: pure functions over a price column.
//!
//! Every function returns a `Vec<f64>` aligned 1:1 with its input. Bars
//! without enough history hold `f64::NAN`, the undefined marker; a zero is
//! always a real value. When the window is zero or not shorter than the
//! input, every element is undefined. Callers treat undefined as "no signal".
//!
//! No indicator value at bar t depends on data after bar t.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod roc;
pub mod rsi;
pub mod sma;

pub use bollinger::{bollinger, BollingerBands};
pub use ema::ema;
pub use macd::{macd, Macd};
pub use roc::roc;
pub use rsi::rsi;
pub use sma::sma;

/// True when `window` leaves no room for a single defined value.
pub(crate) fn window_exhausts(window: usize, len: usize) -> bool {
    window == 0 || window >= len
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
