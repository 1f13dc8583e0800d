//! Trade: a completed entry → exit round trip.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// The strategy asserted its exit signal.
    Signal,
    /// The series ended with the position still open.
    EndOfData,
}

/// Immutable record of one long round trip.
///
/// `entry_price` and `exit_price` are effective per-unit prices net of
/// slippage and commission; `entry_close`/`exit_close` are the raw bar
/// closes the fills were derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    // ── Entry ──
    pub entry_bar: usize,
    pub entry_timestamp: NaiveDateTime,
    pub entry_close: f64,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_bar: usize,
    pub exit_timestamp: NaiveDateTime,
    pub exit_close: f64,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Size ──
    pub quantity: f64,

    // ── Costs (currency, both legs) ──
    pub commission: f64,
    pub slippage: f64,

    // ── Result ──
    /// Percent move of the raw closes, before any cost.
    pub gross_return_pct: f64,
    pub net_pnl: f64,
    pub holding_bars: usize,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }

    /// Net return as a fraction of the capital committed at entry.
    pub fn net_return(&self) -> f64 {
        let cost = self.entry_price * self.quantity;
        if cost <= 0.0 {
            return 0.0;
        }
        self.net_pnl / cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn sample_trade() -> Trade {
        Trade {
            entry_bar: 4,
            entry_timestamp: ts(5),
            entry_close: 100.0,
            entry_price: 100.15,
            exit_bar: 9,
            exit_timestamp: ts(12),
            exit_close: 110.0,
            exit_price: 109.835,
            exit_reason: ExitReason::Signal,
            quantity: 10.0,
            commission: 2.1,
            slippage: 1.05,
            gross_return_pct: 10.0,
            net_pnl: 96.85,
            holding_bars: 5,
        }
    }

    #[test]
    fn winner_is_positive_net_pnl() {
        assert!(sample_trade().is_winner());
        let mut loser = sample_trade();
        loser.net_pnl = 0.0;
        assert!(!loser.is_winner());
    }

    #[test]
    fn net_return_uses_effective_entry_cost() {
        let t = sample_trade();
        let expected = 96.85 / (100.15 * 10.0);
        assert!((t.net_return() - expected).abs() < 1e-12);
    }

    #[test]
    fn exit_reason_serializes_snake_case() {
        let json = serde_json::to_string(&ExitReason::EndOfData).unwrap();
        assert_eq!(json, "\"end_of_data\"");
    }
}
