//! Export: ranking table and trade ledgers as CSV and JSON.
//!
//! An infinite profit factor (no losing trades) is written as `inf` in
//! both formats. Missing KPIs for pairs without a result are empty CSV
//! cells and `null` in JSON.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use niftylab_core::domain::{EquityCurve, ExitReason, Trade};

use crate::batch::BatchReport;
use crate::metrics::non_finite::format_f64;
use crate::ranking::RankingTable;
use crate::runner::{BacktestResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_ranking_json(table: &RankingTable) -> Result<String> {
    serde_json::to_string_pretty(table).context("failed to serialize ranking table to JSON")
}

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_result_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult`, rejecting schema versions newer than
/// this build understands.
pub fn import_result_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// One line per ranking row, best first.
///
/// Columns: rank, strategy, symbol, status, score, total_return,
/// sharpe_ratio, max_drawdown, win_rate, profit_factor, trade_count,
/// avg_trade_return_pct, final_equity
pub fn export_ranking_csv(table: &RankingTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "rank",
        "strategy",
        "symbol",
        "status",
        "score",
        "total_return",
        "sharpe_ratio",
        "max_drawdown",
        "win_rate",
        "profit_factor",
        "trade_count",
        "avg_trade_return_pct",
        "final_equity",
    ])?;

    for (i, row) in table.rows.iter().enumerate() {
        let rank = if row.score.is_some() {
            (i + 1).to_string()
        } else {
            String::new()
        };
        let score = row.score.map(|s| format!("{s:.6}")).unwrap_or_default();
        let kpi_cells = match &row.kpis {
            Some(k) => [
                format!("{:.6}", k.total_return),
                format!("{:.6}", k.sharpe_ratio),
                format!("{:.6}", k.max_drawdown),
                format!("{:.4}", k.win_rate),
                if k.profit_factor.is_finite() {
                    format!("{:.4}", k.profit_factor)
                } else {
                    format_f64(k.profit_factor)
                },
                k.trade_count.to_string(),
                format!("{:.4}", k.avg_trade_return_pct),
                format!("{:.2}", k.final_equity),
            ],
            None => Default::default(),
        };

        let mut record = vec![
            rank,
            row.strategy.clone(),
            row.symbol.clone(),
            row.outcome.describe(),
            score,
        ];
        record.extend(kpi_cells);
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export a trade ledger, tagged with the strategy and symbol it came from.
pub fn export_trades_csv<'a>(
    ledgers: impl IntoIterator<Item = (&'a str, &'a str, &'a [Trade])>,
) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "strategy",
        "symbol",
        "entry_bar",
        "entry_time",
        "entry_close",
        "entry_price",
        "exit_bar",
        "exit_time",
        "exit_close",
        "exit_price",
        "exit_reason",
        "quantity",
        "commission",
        "slippage",
        "gross_return_pct",
        "net_pnl",
        "holding_bars",
    ])?;

    for (strategy, symbol, trades) in ledgers {
        for t in trades {
            wtr.write_record([
                strategy.to_string(),
                symbol.to_string(),
                t.entry_bar.to_string(),
                t.entry_timestamp.to_string(),
                format!("{:.4}", t.entry_close),
                format!("{:.6}", t.entry_price),
                t.exit_bar.to_string(),
                t.exit_timestamp.to_string(),
                format!("{:.4}", t.exit_close),
                format!("{:.6}", t.exit_price),
                exit_reason_code(t.exit_reason).to_string(),
                format!("{:.6}", t.quantity),
                format!("{:.2}", t.commission),
                format!("{:.2}", t.slippage),
                format!("{:.4}", t.gross_return_pct),
                format!("{:.2}", t.net_pnl),
                t.holding_bars.to_string(),
            ])?;
        }
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn exit_reason_code(reason: ExitReason) -> &'static str {
    match reason {
        ExitReason::Signal => "signal",
        ExitReason::EndOfData => "end_of_data",
    }
}

/// Bar-by-bar equity curve.
pub fn export_equity_csv(curve: &EquityCurve) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "timestamp", "equity", "cash", "in_position"])?;
    for (i, p) in curve.points().iter().enumerate() {
        wtr.write_record([
            &i.to_string(),
            &p.timestamp.to_string(),
            &format!("{:.2}", p.equity),
            &format!("{:.2}", p.cash),
            &p.in_position.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write the artifacts of a batch into `output_dir`:
/// - `ranking.csv` and `ranking.json`: the ranking table
/// - `trades.csv`: every trade of every pair that ran
///
/// Returns the paths written.
pub fn save_batch(report: &BatchReport, output_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let ranking_csv = output_dir.join("ranking.csv");
    std::fs::write(&ranking_csv, export_ranking_csv(&report.table)?)
        .with_context(|| format!("failed to write {}", ranking_csv.display()))?;

    let ranking_json = output_dir.join("ranking.json");
    std::fs::write(&ranking_json, export_ranking_json(&report.table)?)
        .with_context(|| format!("failed to write {}", ranking_json.display()))?;

    let trades_csv = output_dir.join("trades.csv");
    let ledgers = report.results.iter().map(|r| {
        (
            r.strategy_label.as_str(),
            r.symbol.as_str(),
            r.trades.as_slice(),
        )
    });
    std::fs::write(&trades_csv, export_trades_csv(ledgers)?)
        .with_context(|| format!("failed to write {}", trades_csv.display()))?;

    Ok(vec![ranking_csv, ranking_json, trades_csv])
}
