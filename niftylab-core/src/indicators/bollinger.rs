//! Bollinger Bands: SMA +/- k population standard deviations.
//!
//! Also derives bandwidth = (upper - lower) / middle and
//! %B = (close - lower) / (upper - lower), undefined when the bands coincide.
//! First defined value at index window-1.

use super::window_exhausts;

/// All band series, each aligned with the input.
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
    pub bandwidth: Vec<f64>,
    pub percent_b: Vec<f64>,
}

impl BollingerBands {
    fn undefined(n: usize) -> Self {
        Self {
            upper: vec![f64::NAN; n],
            middle: vec![f64::NAN; n],
            lower: vec![f64::NAN; n],
            bandwidth: vec![f64::NAN; n],
            percent_b: vec![f64::NAN; n],
        }
    }
}

pub fn bollinger(values: &[f64], window: usize, k: f64) -> BollingerBands {
    let n = values.len();
    let mut bands = BollingerBands::undefined(n);
    if window_exhausts(window, n) {
        return bands;
    }

    for i in (window - 1)..n {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        let mean = slice.iter().sum::<f64>() / window as f64;
        let variance = slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / window as f64;
        let stdev = variance.sqrt();

        let upper = mean + k * stdev;
        let lower = mean - k * stdev;
        bands.upper[i] = upper;
        bands.middle[i] = mean;
        bands.lower[i] = lower;
        if mean != 0.0 {
            bands.bandwidth[i] = (upper - lower) / mean;
        }
        if upper != lower {
            bands.percent_b[i] = (values[i] - lower) / (upper - lower);
        }
    }
    bands
}
