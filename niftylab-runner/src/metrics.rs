//! Performance analysis: pure functions over an equity curve and a trade
//! ledger.
//!
//! Every metric is a pure function of its inputs. No dependency on the
//! simulator, the data layer or the batch runner.

use serde::{Deserialize, Serialize};

use niftylab_core::domain::{Interval, Trade};

/// KPI report for one (strategy, instrument) backtest.
///
/// `total_return`, `max_drawdown` and `win_rate` are fractions;
/// `avg_trade_return_pct` is in percent. `sharpe_ratio` is per bar and
/// not annualized (see [`annualized_sharpe`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiReport {
    pub total_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    /// `f64::INFINITY` when every trade won; `0.0` with no trades.
    #[serde(with = "non_finite")]
    pub profit_factor: f64,
    pub trade_count: usize,
    /// `0.0` when there are no trades.
    pub avg_trade_return_pct: f64,
    pub final_equity: f64,
}

impl KpiReport {
    /// Compute all metrics from equity values, the trade ledger and the
    /// capital the run started with.
    pub fn compute(equity: &[f64], trades: &[Trade], starting_cash: f64) -> Self {
        let final_equity = equity.last().copied().unwrap_or(starting_cash);
        Self {
            total_return: total_return(final_equity, starting_cash),
            sharpe_ratio: sharpe_ratio(equity),
            max_drawdown: max_drawdown(equity),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            trade_count: trades.len(),
            avg_trade_return_pct: avg_trade_return_pct(trades),
            final_equity,
        }
    }

    /// Report for a run that never traded and never moved.
    pub fn empty(starting_cash: f64) -> Self {
        Self::compute(&[], &[], starting_cash)
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// `final / starting - 1`. Zero when the starting capital is not positive.
pub fn total_return(final_equity: f64, starting_cash: f64) -> f64 {
    if starting_cash <= 0.0 {
        return 0.0;
    }
    final_equity / starting_cash - 1.0
}

/// Per-bar Sharpe: mean of simple bar returns over their sample standard
/// deviation. Zero when the deviation is zero or there are fewer than two
/// returns.
pub fn sharpe_ratio(equity: &[f64]) -> f64 {
    let returns = bar_returns(equity);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / std
}

/// Scale a per-bar Sharpe to a yearly figure for display.
pub fn annualized_sharpe(per_bar: f64, interval: Interval) -> f64 {
    per_bar * interval.periods_per_year().sqrt()
}

/// Deepest fall from a running peak, as a non-positive fraction
/// (-0.15 is a 15% drawdown).
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &eq in equity {
        peak = peak.max(eq);
        if peak > 0.0 {
            worst = worst.min(eq / peak - 1.0);
        }
    }
    worst
}

/// Fraction of trades with positive net P&L.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Gross profit over gross loss.
///
/// No trades, or only break-even trades: `0.0`. Winners but no losers:
/// `f64::INFINITY`; consumers must handle it explicitly.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.net_pnl > 0.0)
        .map(|t| t.net_pnl)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.net_pnl < 0.0)
        .map(|t| t.net_pnl.abs())
        .sum();

    if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Mean gross return per trade, in percent.
pub fn avg_trade_return_pct(trades: &[Trade]) -> f64 {
    let pcts: Vec<f64> = trades.iter().map(|t| t.gross_return_pct).collect();
    mean_f64(&pcts)
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple returns between consecutive equity values.
pub fn bar_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1).
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// JSON has no infinity. Non-finite values travel as the strings `inf`,
/// `-inf` and `NaN`, finite ones as plain numbers.
pub(crate) mod non_finite {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            s.serialize_f64(*value)
        } else {
            s.serialize_str(&format_f64(*value))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }
        match Repr::deserialize(d)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(s) => s.parse::<f64>().map_err(D::Error::custom),
        }
    }

    pub fn format_f64(value: f64) -> String {
        if value == f64::INFINITY {
            "inf".to_string()
        } else if value == f64::NEG_INFINITY {
            "-inf".to_string()
        } else {
            value.to_string()
        }
    }
}
