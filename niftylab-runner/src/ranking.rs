//! Ranking table: one row per (strategy, instrument) pair, ordered by a
//! weighted composite score.
//!
//! Each metric is min-max normalized to [0.0, 1.0] over the rows that have a
//! result, then blended with [`RankingWeights`]. Pairs without a result stay
//! in the table, marked with the reason, and sort after every scored row.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use niftylab_core::error::ConfigError;
use niftylab_core::signals::StrategyConfig;

use crate::metrics::KpiReport;
use crate::runner::{BacktestResult, RunStatus};

/// Relative weight of each metric in the composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingWeights {
    pub sharpe: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            sharpe: 0.4,
            total_return: 0.3,
            max_drawdown: 0.2,
            win_rate: 0.1,
        }
    }
}

impl RankingWeights {
    fn total(&self) -> f64 {
        self.sharpe + self.total_return + self.max_drawdown + self.win_rate
    }

    /// Weights must be finite and non-negative, with a positive sum.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("ranking.sharpe", self.sharpe),
            ("ranking.total_return", self.total_return),
            ("ranking.max_drawdown", self.max_drawdown),
            ("ranking.win_rate", self.win_rate),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NegativeRate { name, value });
            }
        }
        if self.total() <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "ranking",
                reason: "at least one weight must be positive".into(),
            });
        }
        Ok(())
    }
}

/// What happened to one pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Scored,
    InsufficientData { required: usize, available: usize },
    Failed { reason: String },
    /// The batch was cancelled before this pair started.
    Cancelled,
}

impl Outcome {
    /// Short text for tables and exports.
    pub fn describe(&self) -> String {
        match self {
            Outcome::Scored => "ok".to_string(),
            Outcome::InsufficientData {
                required,
                available,
            } => format!("insufficient history ({available} of {required} bars)"),
            Outcome::Failed { reason } => format!("failed: {reason}"),
            Outcome::Cancelled => "cancelled".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRow {
    /// Strategy label, e.g. `MA(10,50)`.
    pub strategy: String,
    /// Fingerprint of the strategy config that produced the row.
    #[serde(default)]
    pub fingerprint: String,
    pub symbol: String,
    pub outcome: Outcome,
    /// Present only for scored rows.
    pub kpis: Option<KpiReport>,
    /// Composite score in [0.0, 1.0]; `None` for rows without a result.
    pub score: Option<f64>,
}

impl RankingRow {
    pub fn from_result(result: &BacktestResult) -> Self {
        let (outcome, kpis) = match result.status {
            RunStatus::Completed => (Outcome::Scored, Some(result.kpis.clone())),
            RunStatus::InsufficientData {
                required,
                available,
            } => (
                Outcome::InsufficientData {
                    required,
                    available,
                },
                None,
            ),
        };
        Self {
            strategy: result.strategy_label.clone(),
            fingerprint: result.fingerprint.clone(),
            symbol: result.symbol.clone(),
            outcome,
            kpis,
            score: None,
        }
    }

    pub fn failed(strategy: &StrategyConfig, symbol: &str, reason: impl Into<String>) -> Self {
        Self::without_result(
            strategy,
            symbol,
            Outcome::Failed {
                reason: reason.into(),
            },
        )
    }

    pub fn cancelled(strategy: &StrategyConfig, symbol: &str) -> Self {
        Self::without_result(strategy, symbol, Outcome::Cancelled)
    }

    fn without_result(strategy: &StrategyConfig, symbol: &str, outcome: Outcome) -> Self {
        Self {
            strategy: strategy.label(),
            fingerprint: strategy.fingerprint(),
            symbol: symbol.to_string(),
            outcome,
            kpis: None,
            score: None,
        }
    }

    pub fn is_scored(&self) -> bool {
        self.kpis.is_some()
    }
}

/// Rows ordered best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingTable {
    pub rows: Vec<RankingRow>,
}

impl RankingTable {
    /// Score every row that has KPIs and sort the table.
    pub fn build(mut rows: Vec<RankingRow>, weights: &RankingWeights) -> Self {
        let scores = composite_scores(&rows, weights);
        for (row, score) in rows.iter_mut().zip(scores) {
            row.score = score;
        }
        rows.sort_by(compare_rows);
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first `n` rows (fewer if the table is shorter).
    pub fn top(&self, n: usize) -> &[RankingRow] {
        &self.rows[..n.min(self.rows.len())]
    }

    pub fn scored(&self) -> impl Iterator<Item = &RankingRow> {
        self.rows.iter().filter(|r| r.is_scored())
    }

    pub fn unscored(&self) -> impl Iterator<Item = &RankingRow> {
        self.rows.iter().filter(|r| !r.is_scored())
    }
}

/// Composite score per row, `None` where the row has no KPIs.
pub fn composite_scores(rows: &[RankingRow], weights: &RankingWeights) -> Vec<Option<f64>> {
    let kpis: Vec<&KpiReport> = rows.iter().filter_map(|r| r.kpis.as_ref()).collect();
    if kpis.is_empty() {
        return vec![None; rows.len()];
    }

    let sharpe = MinMax::over(kpis.iter().map(|k| k.sharpe_ratio));
    let total_return = MinMax::over(kpis.iter().map(|k| k.total_return));
    // Drawdowns are non-positive, so the shallowest is the maximum and
    // plain min-max already ranks it best.
    let drawdown = MinMax::over(kpis.iter().map(|k| k.max_drawdown));
    let win_rate = MinMax::over(kpis.iter().map(|k| k.win_rate));

    let total_weight = weights.total();
    rows.iter()
        .map(|row| {
            let k = row.kpis.as_ref()?;
            if total_weight <= 0.0 {
                return Some(0.0);
            }
            let blended = weights.sharpe * sharpe.normalize(k.sharpe_ratio)
                + weights.total_return * total_return.normalize(k.total_return)
                + weights.max_drawdown * drawdown.normalize(k.max_drawdown)
                + weights.win_rate * win_rate.normalize(k.win_rate);
            Some(blended / total_weight)
        })
        .collect()
}

/// Scored rows by descending score, then everything else. Ties fall back
/// to (strategy, symbol) so the order never depends on input order.
fn compare_rows(a: &RankingRow, b: &RankingRow) -> Ordering {
    let by_score = match (a.score, b.score) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_score
        .then_with(|| a.strategy.cmp(&b.strategy))
        .then_with(|| a.symbol.cmp(&b.symbol))
}

/// Observed range of one metric.
struct MinMax {
    min: f64,
    max: f64,
}

impl MinMax {
    fn over(values: impl Iterator<Item = f64>) -> Self {
        values.filter(|v| v.is_finite()).fold(
            Self {
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
            },
            |acc, v| Self {
                min: acc.min.min(v),
                max: acc.max.max(v),
            },
        )
    }

    /// Position of `value` in the range; 0.5 when the range is degenerate.
    fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if !value.is_finite() || !span.is_finite() || span < 1e-12 {
            return 0.5;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }
}
