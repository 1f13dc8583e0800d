//! Data provider trait and structured error types.
//!
//! `DataProvider` abstracts over market-data sources so the download path
//! can run against Yahoo Finance in production and an in-memory fake in
//! tests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Bar, Interval, SeriesError};

/// Failures while fetching, validating or storing market data.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("provider is refusing requests (circuit breaker open)")]
    ProviderBlocked,

    #[error("no stored data for {symbol} at {interval}; run `niftylab download {symbol}` first")]
    NoStoredData { symbol: String, interval: Interval },

    #[error("quarantined corrupt file {path}: {reason}")]
    Quarantined { path: String, reason: String },

    #[error("store error: {0}")]
    Store(String),

    #[error("parquet I/O error: {0}")]
    Parquet(String),

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error("data error: {0}")]
    Other(String),
}

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    YahooFinance,
    Store,
    Synthetic,
}

/// A source of OHLCV bars.
///
/// Implementations return bars in any order and may include bad rows;
/// the download path sorts, deduplicates and validates before storing.
/// Symbols are opaque keys passed through unchanged.
pub trait DataProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Recorded in the store metadata of every series this provider fetched.
    fn source(&self) -> DataSource;

    /// Fetch bars for `symbol` at `interval` between `start` and `end`
    /// (inclusive calendar dates).
    fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError>;

    /// False while the provider is rate-limited or blocked.
    fn is_available(&self) -> bool;
}
