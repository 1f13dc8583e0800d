//! PortfolioSimulator: Flat / InPosition state machine over one series.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, EquityCurve, EquityPoint, ExitReason, PriceSeries, Trade};
use crate::error::ConfigError;
use crate::signals::SignalPair;

use super::config::SimulatorConfig;
use super::cost_model::{CostModel, Side};

/// Trade ledger and equity curve of one simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub trades: Vec<Trade>,
    pub equity_curve: EquityCurve,
    /// Entry signals dropped because the allocation could not buy one unit.
    pub skipped_entries: usize,
}

impl SimulationResult {
    pub fn final_equity(&self) -> Option<f64> {
        self.equity_curve.final_equity()
    }
}

/// The open position and the costs already paid to open it.
#[derive(Debug, Clone)]
struct OpenPosition {
    entry_bar: usize,
    entry_timestamp: NaiveDateTime,
    entry_close: f64,
    entry_fill: f64,
    quantity: f64,
    /// Cash spent on entry, commission included.
    cost_basis: f64,
    entry_commission: f64,
    entry_slippage: f64,
}

#[derive(Debug)]
enum State {
    Flat,
    InPosition(OpenPosition),
}

/// Simulate a long-only, single-position portfolio through `series`.
///
/// Exit is evaluated before entry on every bar. A bar that closes a position
/// never opens a new one, and a position is never opened and closed on the
/// same bar. A position still open on the final
/// bar is closed at that bar's close with `ExitReason::EndOfData`; entry
/// signals on the final bar are ignored for the same reason.
///
/// Returns `ConfigError` for invalid parameters or a signal pair that is not
/// aligned with the series. Zero trades is not an error.
pub fn simulate(
    series: &PriceSeries,
    signals: &SignalPair,
    config: &SimulatorConfig,
) -> Result<SimulationResult, ConfigError> {
    config.validate()?;
    if signals.entry.len() != series.len() || signals.exit.len() != series.len() {
        return Err(ConfigError::InvalidParameter {
            name: "signals",
            reason: format!(
                "signal lengths ({}, {}) do not match series length {}",
                signals.entry.len(),
                signals.exit.len(),
                series.len()
            ),
        });
    }

    let costs = CostModel::from_config(config);
    let bars = series.bars();
    let last = bars.len().saturating_sub(1);

    let mut cash = config.starting_cash;
    let mut state = State::Flat;
    let mut trades = Vec::new();
    let mut skipped_entries = 0;
    let mut equity_curve = EquityCurve::with_capacity(bars.len());

    for (t, bar) in bars.iter().enumerate() {
        let flat_at_open = matches!(state, State::Flat);

        // 1. Exit
        if signals.exit[t] {
            if let State::InPosition(pos) = std::mem::replace(&mut state, State::Flat) {
                trades.push(close_position(
                    pos,
                    t,
                    bar,
                    ExitReason::Signal,
                    &costs,
                    &mut cash,
                ));
            }
        }

        // 2. Entry, only from a bar that started flat
        if signals.entry[t] && flat_at_open && t < last {
            match open_position(t, bar, config, &costs, &mut cash) {
                Some(pos) => state = State::InPosition(pos),
                None => skipped_entries += 1,
            }
        }

        // 3. End of data
        if t == last {
            if let State::InPosition(pos) = std::mem::replace(&mut state, State::Flat) {
                trades.push(close_position(
                    pos,
                    t,
                    bar,
                    ExitReason::EndOfData,
                    &costs,
                    &mut cash,
                ));
            }
        }

        // 4. Mark-to-market
        let (equity, in_position) = match &state {
            State::Flat => (cash, false),
            State::InPosition(pos) => (cash + pos.quantity * bar.close, true),
        };
        equity_curve.push(EquityPoint {
            timestamp: bar.timestamp,
            equity,
            cash,
            in_position,
        });
    }

    Ok(SimulationResult {
        trades,
        equity_curve,
        skipped_entries,
    })
}

/// Size and open a position, or `None` if the allocation cannot buy one unit.
fn open_position(
    bar_index: usize,
    bar: &Bar,
    config: &SimulatorConfig,
    costs: &CostModel,
    cash: &mut f64,
) -> Option<OpenPosition> {
    let close = bar.close;
    let fill = costs.fill_price(close, Side::Buy);
    let unit_cost = costs.effective_price(fill, Side::Buy);
    let budget = *cash * config.allocation;

    let mut quantity = budget / unit_cost;
    if config.whole_units {
        quantity = quantity.floor();
    }
    if !quantity.is_finite() || quantity < 1.0 {
        return None;
    }

    let notional = fill * quantity;
    let commission = costs.commission(fill, quantity);
    let cost_basis = notional + commission;
    // Rounding can leave a sub-cent negative balance at full allocation.
    *cash = (*cash - cost_basis).max(0.0);

    Some(OpenPosition {
        entry_bar: bar_index,
        entry_timestamp: bar.timestamp,
        entry_close: close,
        entry_fill: fill,
        quantity,
        cost_basis,
        entry_commission: commission,
        entry_slippage: costs.slippage_amount(close, fill, quantity),
    })
}

fn close_position(
    pos: OpenPosition,
    bar_index: usize,
    bar: &Bar,
    reason: ExitReason,
    costs: &CostModel,
    cash: &mut f64,
) -> Trade {
    let close = bar.close;
    let fill = costs.fill_price(close, Side::Sell);
    let proceeds = fill * pos.quantity;
    let commission = costs.commission(fill, pos.quantity);
    *cash += proceeds - commission;

    Trade {
        entry_bar: pos.entry_bar,
        entry_timestamp: pos.entry_timestamp,
        entry_close: pos.entry_close,
        entry_price: costs.effective_price(pos.entry_fill, Side::Buy),
        exit_bar: bar_index,
        exit_timestamp: bar.timestamp,
        exit_close: close,
        exit_price: costs.effective_price(fill, Side::Sell),
        exit_reason: reason,
        quantity: pos.quantity,
        commission: pos.entry_commission + commission,
        slippage: pos.entry_slippage + costs.slippage_amount(close, fill, pos.quantity),
        gross_return_pct: (close / pos.entry_close - 1.0) * 100.0,
        net_pnl: proceeds - commission - pos.cost_basis,
        holding_bars: bar_index - pos.entry_bar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Interval;
    use chrono::NaiveDate;

    fn series(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        PriceSeries::from_closes("RELIANCE.NS", Interval::Day1, start, closes).unwrap()
    }

    fn flags(n: usize, on: &[usize]) -> Vec<bool> {
        (0..n).map(|i| on.contains(&i)).collect()
    }

    #[test]
    fn frictionless_round_trip() {
        let s = series(&[100.0, 100.0, 110.0, 120.0]);
        let sig = SignalPair::new(flags(4, &[1]), flags(4, &[3]));
        let cfg = SimulatorConfig {
            allocation: 1.0,
            ..SimulatorConfig::frictionless()
        };
        let result = simulate(&s, &sig, &cfg).unwrap();

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.quantity, 1_000.0);
        assert_eq!(trade.exit_reason, ExitReason::Signal);
        assert_eq!(trade.holding_bars, 2);
        assert!((trade.net_pnl - 20_000.0).abs() < 1e-6);
        assert!((trade.gross_return_pct - 20.0).abs() < 1e-9);
        assert_eq!(
            result.equity_curve.values(),
            vec![100_000.0, 100_000.0, 110_000.0, 120_000.0]
        );
    }

    #[test]
    fn fees_charged_on_both_legs() {
        let s = series(&[100.0, 100.0, 100.0]);
        let sig = SignalPair::new(flags(3, &[0]), flags(3, &[1]));
        let cfg = SimulatorConfig {
            starting_cash: 10_000.0,
            commission_rate: 0.01,
            slippage_rate: 0.0,
            allocation: 0.5,
            whole_units: false,
        };
        let result = simulate(&s, &sig, &cfg).unwrap();
        let trade = &result.trades[0];

        // 5000 budget buys 5000 / 101 units; both legs pay 1%.
        let qty = 5_000.0 / 101.0;
        assert!((trade.quantity - qty).abs() < 1e-9);
        assert!((trade.commission - 2.0 * qty).abs() < 1e-9);
        assert!((trade.net_pnl + 2.0 * qty).abs() < 1e-9);
        assert!((trade.entry_price - 101.0).abs() < 1e-9);
        assert!((trade.exit_price - 99.0).abs() < 1e-9);
        assert_eq!(trade.gross_return_pct, 0.0);
    }

    #[test]
    fn exit_before_entry_on_same_bar() {
        let s = series(&[100.0, 101.0, 102.0, 103.0, 104.0]);
        // bar 2 carries both flags: the open position closes and no new one opens
        let sig = SignalPair::new(flags(5, &[0, 2]), flags(5, &[2]));
        let result = simulate(&s, &sig, &SimulatorConfig::default()).unwrap();
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].exit_bar, 2);
        assert!(!result.equity_curve.points()[2].in_position);
        assert!(!result.equity_curve.points()[3].in_position);
    }

    #[test]
    fn both_flags_while_flat_opens() {
        let s = series(&[100.0, 101.0, 102.0]);
        let sig = SignalPair::new(flags(3, &[0]), flags(3, &[0]));
        let result = simulate(&s, &sig, &SimulatorConfig::default()).unwrap();
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].entry_bar, 0);
        assert_eq!(result.trades[0].exit_reason, ExitReason::EndOfData);
    }

    #[test]
    fn orphan_exit_is_dropped() {
        let s = series(&[100.0, 101.0, 102.0]);
        let sig = SignalPair::new(flags(3, &[]), flags(3, &[0, 1]));
        let result = simulate(&s, &sig, &SimulatorConfig::default()).unwrap();
        assert!(result.trades.is_empty());
        assert_eq!(result.final_equity(), Some(100_000.0));
    }

    #[test]
    fn open_position_is_force_closed_at_end() {
        let s = series(&[100.0, 105.0, 110.0]);
        let sig = SignalPair::new(flags(3, &[0]), flags(3, &[]));
        let result = simulate(&s, &sig, &SimulatorConfig::default()).unwrap();
        let trade = &result.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::EndOfData);
        assert_eq!(trade.exit_bar, 2);
        let last = result.equity_curve.points()[2];
        assert!(!last.in_position);
        assert_eq!(last.equity, last.cash);
    }

    #[test]
    fn entry_on_final_bar_is_ignored() {
        let s = series(&[100.0, 101.0]);
        let sig = SignalPair::new(flags(2, &[1]), flags(2, &[]));
        let result = simulate(&s, &sig, &SimulatorConfig::default()).unwrap();
        assert!(result.trades.is_empty());
        assert_eq!(result.skipped_entries, 0);
    }

    #[test]
    fn insufficient_cash_skips_entry() {
        let s = series(&[5_000.0, 5_100.0, 5_200.0]);
        let sig = SignalPair::new(flags(3, &[0]), flags(3, &[]));
        let cfg = SimulatorConfig {
            starting_cash: 1_000.0,
            ..SimulatorConfig::default()
        };
        let result = simulate(&s, &sig, &cfg).unwrap();
        assert!(result.trades.is_empty());
        assert_eq!(result.skipped_entries, 1);
        assert_eq!(result.final_equity(), Some(1_000.0));
    }

    #[test]
    fn whole_units_floor_quantity_and_keep_leftover_cash() {
        let s = series(&[300.0, 300.0, 300.0]);
        let sig = SignalPair::new(flags(3, &[0]), flags(3, &[]));
        let cfg = SimulatorConfig {
            starting_cash: 1_000.0,
            allocation: 1.0,
            whole_units: true,
            ..SimulatorConfig::frictionless()
        };
        let result = simulate(&s, &sig, &cfg).unwrap();
        assert_eq!(result.trades[0].quantity, 3.0);
        let first = result.equity_curve.points()[0];
        assert!((first.cash - 100.0).abs() < 1e-9);
        assert!((first.equity - 1_000.0).abs() < 1e-9);
    }

    #[test]
    fn misaligned_signals_are_rejected() {
        let s = series(&[100.0, 101.0, 102.0]);
        let sig = SignalPair::quiet(2);
        assert!(matches!(
            simulate(&s, &sig, &SimulatorConfig::default()),
            Err(ConfigError::InvalidParameter { name: "signals", .. })
        ));
    }

    #[test]
    fn invalid_config_fails_before_simulating() {
        let s = series(&[100.0, 101.0]);
        let cfg = SimulatorConfig {
            starting_cash: 0.0,
            ..Default::default()
        };
        assert_eq!(
            simulate(&s, &SignalPair::quiet(2), &cfg),
            Err(ConfigError::NonPositiveStartingCash(0.0))
        );
    }

    #[test]
    fn empty_series_gives_empty_result() {
        let s = series(&[]);
        let result = simulate(&s, &SignalPair::quiet(0), &SimulatorConfig::default()).unwrap();
        assert!(result.trades.is_empty());
        assert!(result.equity_curve.is_empty());
    }
}
