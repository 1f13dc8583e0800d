//! PriceSeries: ordered bars for one instrument at one interval.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::bar::Bar;

/// Minutes in one NSE cash-market session (09:15–15:30).
const SESSION_MINUTES: u32 = 375;

/// Trading days per year used for annualization.
pub const TRADING_DAYS_PER_YEAR: u32 = 252;

/// Sampling interval of a price series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "1wk")]
    Week1,
}

impl Interval {
    pub const ALL: [Interval; 7] = [
        Interval::Minute1,
        Interval::Minute5,
        Interval::Minute15,
        Interval::Minute30,
        Interval::Hour1,
        Interval::Day1,
        Interval::Week1,
    ];

    /// Short code used in config files and storage paths.
    pub fn code(&self) -> &'static str {
        match self {
            Interval::Minute1 => "1m",
            Interval::Minute5 => "5m",
            Interval::Minute15 => "15m",
            Interval::Minute30 => "30m",
            Interval::Hour1 => "1h",
            Interval::Day1 => "1d",
            Interval::Week1 => "1wk",
        }
    }

    /// Interval parameter understood by the Yahoo chart API.
    pub fn yahoo_code(&self) -> &'static str {
        match self {
            Interval::Hour1 => "60m",
            other => other.code(),
        }
    }

    /// Whether bars of this interval carry an intraday time component.
    pub fn is_intraday(&self) -> bool {
        !matches!(self, Interval::Day1 | Interval::Week1)
    }

    /// Calendar step between consecutive generated bars.
    pub fn step(&self) -> chrono::Duration {
        match self {
            Interval::Minute1 => chrono::Duration::minutes(1),
            Interval::Minute5 => chrono::Duration::minutes(5),
            Interval::Minute15 => chrono::Duration::minutes(15),
            Interval::Minute30 => chrono::Duration::minutes(30),
            Interval::Hour1 => chrono::Duration::hours(1),
            Interval::Day1 => chrono::Duration::days(1),
            Interval::Week1 => chrono::Duration::weeks(1),
        }
    }

    /// Number of bars in a trading year. Partial trailing bars of a session
    /// (e.g. the last 15 minutes for 1h bars) count as one bar.
    pub fn periods_per_year(&self) -> f64 {
        let per_day = |minutes: u32| SESSION_MINUTES.div_ceil(minutes);
        let bars = match self {
            Interval::Minute1 => per_day(1) * TRADING_DAYS_PER_YEAR,
            Interval::Minute5 => per_day(5) * TRADING_DAYS_PER_YEAR,
            Interval::Minute15 => per_day(15) * TRADING_DAYS_PER_YEAR,
            Interval::Minute30 => per_day(30) * TRADING_DAYS_PER_YEAR,
            Interval::Hour1 => per_day(60) * TRADING_DAYS_PER_YEAR,
            Interval::Day1 => TRADING_DAYS_PER_YEAR,
            Interval::Week1 => 52,
        };
        bars as f64
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Interval {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::ALL
            .into_iter()
            .find(|i| i.code() == s || i.yahoo_code() == s)
            .ok_or_else(|| SeriesError::UnknownInterval(s.to_string()))
    }
}

/// Violations found while building a `PriceSeries`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("bar {index} at {timestamp} is not after the previous bar")]
    NotAscending {
        index: usize,
        timestamp: NaiveDateTime,
    },

    #[error("bar {index} at {timestamp} violates OHLC invariants")]
    InsaneBar {
        index: usize,
        timestamp: NaiveDateTime,
    },

    #[error("unknown interval '{0}'")]
    UnknownInterval(String),
}

/// Ordered OHLCV bars for exactly one instrument and one interval.
///
/// Timestamps are strictly increasing. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    interval: Interval,
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Build a series, validating ordering and bar sanity.
    pub fn new(
        symbol: impl Into<String>,
        interval: Interval,
        bars: Vec<Bar>,
    ) -> Result<Self, SeriesError> {
        for (i, bar) in bars.iter().enumerate() {
            if !bar.is_sane() {
                return Err(SeriesError::InsaneBar {
                    index: i,
                    timestamp: bar.timestamp,
                });
            }
            if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
                return Err(SeriesError::NotAscending {
                    index: i,
                    timestamp: bar.timestamp,
                });
            }
        }
        Ok(Self {
            symbol: symbol.into(),
            interval,
            bars,
        })
    }

    /// Build a series from close prices alone, one bar per interval step
    /// starting at `start`. OHL are derived from the close (open = previous
    /// close). Used by tests, benches and synthetic data.
    pub fn from_closes(
        symbol: impl Into<String>,
        interval: Interval,
        start: NaiveDateTime,
        closes: &[f64],
    ) -> Result<Self, SeriesError> {
        let step = interval.step();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let open = if i == 0 { close } else { closes[i - 1] };
                Bar {
                    timestamp: start + step * i as i32,
                    open,
                    high: open.max(close),
                    low: open.min(close),
                    close,
                    volume: 1_000,
                }
            })
            .collect();
        Self::new(symbol, interval, bars)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Close prices in bar order.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.bars.iter().map(|b| b.timestamp).collect()
    }
}
