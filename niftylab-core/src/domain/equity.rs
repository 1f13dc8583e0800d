//! Equity curve: one account valuation per bar.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Account state recorded at the close of one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    /// Cash plus the open position marked at the bar close.
    pub equity: f64,
    pub cash: f64,
    pub in_position: bool,
}

/// Time-indexed equity values, aligned 1:1 with the simulated series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquityCurve {
    points: Vec<EquityPoint>,
}

impl EquityCurve {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            points: Vec::with_capacity(n),
        }
    }

    pub(crate) fn push(&mut self, point: EquityPoint) {
        self.points.push(point);
    }

    /// A curve that stays at `cash` on every timestamp.
    pub fn flat(timestamps: &[NaiveDateTime], cash: f64) -> Self {
        Self {
            points: timestamps
                .iter()
                .map(|&timestamp| EquityPoint {
                    timestamp,
                    equity: cash,
                    cash,
                    in_position: false,
                })
                .collect(),
        }
    }

    pub fn points(&self) -> &[EquityPoint] {
        &self.points
    }

    /// Equity values in bar order.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.equity).collect()
    }

    pub fn final_equity(&self) -> Option<f64> {
        self.points.last().map(|p| p.equity)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
