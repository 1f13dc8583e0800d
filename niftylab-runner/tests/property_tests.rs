//! Property tests for the analyzer and the ranking table.

use proptest::prelude::*;

use niftylab_runner::metrics::{max_drawdown, sharpe_ratio};
use niftylab_runner::{KpiReport, Outcome, RankingRow, RankingTable, RankingWeights};

fn arb_equity() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1_000.0..200_000.0f64, 0..200)
}

fn arb_kpis() -> impl Strategy<Value = KpiReport> {
    (-2.0..2.0f64, -0.9..3.0f64, -0.9..0.0f64, 0.0..1.0f64).prop_map(
        |(sharpe, total_return, max_drawdown, win_rate)| KpiReport {
            total_return,
            sharpe_ratio: sharpe,
            max_drawdown,
            win_rate,
            profit_factor: 1.0,
            trade_count: 5,
            avg_trade_return_pct: 0.0,
            final_equity: 100_000.0 * (1.0 + total_return),
        },
    )
}

fn arb_rows() -> impl Strategy<Value = Vec<RankingRow>> {
    prop::collection::vec(prop::option::weighted(0.8, arb_kpis()), 0..30).prop_map(|kpis| {
        kpis.into_iter()
            .enumerate()
            .map(|(i, k)| RankingRow {
                strategy: format!("S{}", i % 4),
                fingerprint: String::new(),
                symbol: format!("SYM{i}"),
                outcome: if k.is_some() {
                    Outcome::Scored
                } else {
                    Outcome::Cancelled
                },
                kpis: k,
                score: None,
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn drawdown_is_non_positive_and_bounded(equity in arb_equity()) {
        let dd = max_drawdown(&equity);
        prop_assert!(dd <= 0.0);
        prop_assert!(dd > -1.0);
    }

    #[test]
    fn sharpe_is_always_finite(equity in arb_equity()) {
        prop_assert!(sharpe_ratio(&equity).is_finite());
    }

    #[test]
    fn scores_are_in_unit_range_and_sorted(rows in arb_rows()) {
        let n = rows.len();
        let scored = rows.iter().filter(|r| r.kpis.is_some()).count();
        let table = RankingTable::build(rows, &RankingWeights::default());

        prop_assert_eq!(table.len(), n);
        // every scored row precedes every unscored row
        prop_assert!(table.rows[..scored].iter().all(|r| r.score.is_some()));
        prop_assert!(table.rows[scored..].iter().all(|r| r.score.is_none()));

        for pair in table.rows[..scored].windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
        for row in &table.rows[..scored] {
            let s = row.score.unwrap();
            prop_assert!((-1e-12..=1.0 + 1e-12).contains(&s));
        }
    }

    #[test]
    fn ranking_ignores_input_order(rows in arb_rows()) {
        let mut reversed = rows.clone();
        reversed.reverse();
        let a = RankingTable::build(rows, &RankingWeights::default());
        let b = RankingTable::build(reversed, &RankingWeights::default());
        prop_assert_eq!(a, b);
    }
}
