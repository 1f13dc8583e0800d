//! Download orchestrator: fetch, clean and store many symbols in sequence.

use chrono::NaiveDate;
use tracing::{info, warn};

use super::provider::{DataError, DataProvider};
use super::store::ParquetStore;
use crate::domain::{Bar, Interval, PriceSeries};

/// Progress callbacks for multi-symbol downloads.
pub trait DownloadProgress: Send {
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    fn on_complete(&self, symbol: &str, index: usize, total: usize, result: &Result<usize, DataError>);

    fn on_batch_complete(&self, summary: &DownloadSummary);
}

/// Reports progress through `tracing` events.
pub struct LogProgress;

impl DownloadProgress for LogProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        info!(symbol, "[{}/{total}] fetching", index + 1);
    }

    fn on_complete(
        &self,
        symbol: &str,
        _index: usize,
        _total: usize,
        result: &Result<usize, DataError>,
    ) {
        match result {
            Ok(bars) => info!(symbol, bars, "stored"),
            Err(e) => warn!(symbol, error = %e, "download failed"),
        }
    }

    fn on_batch_complete(&self, summary: &DownloadSummary) {
        info!(
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed(),
            total = summary.total,
            "download complete"
        );
    }
}

/// Outcome of a batch download.
#[derive(Debug, Default)]
pub struct DownloadSummary {
    pub total: usize,
    pub succeeded: usize,
    /// Already stored over the requested range.
    pub skipped: usize,
    pub errors: Vec<(String, DataError)>,
}

impl DownloadSummary {
    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Fetch each symbol, clean the bars and write them to `store`.
///
/// Symbols whose stored range already covers `start..=end` in trading
/// days are skipped unless `force`. Fetched bars are merged into any
/// stored history.
/// Once the provider reports itself unavailable the remaining symbols are
/// failed with `ProviderBlocked` without being requested.
#[allow(clippy::too_many_arguments)]
pub fn download_symbols(
    provider: &dyn DataProvider,
    store: &ParquetStore,
    symbols: &[String],
    interval: Interval,
    start: NaiveDate,
    end: NaiveDate,
    force: bool,
    progress: &dyn DownloadProgress,
) -> DownloadSummary {
    let total = symbols.len();
    let mut summary = DownloadSummary {
        total,
        ..Default::default()
    };

    for (i, symbol) in symbols.iter().enumerate() {
        progress.on_start(symbol, i, total);

        let fresh = store
            .meta(symbol, interval)
            .is_some_and(|meta| meta.covers(start, end));
        if fresh && !force {
            summary.skipped += 1;
            continue;
        }

        let result = download_single(provider, store, symbol, interval, start, end);
        progress.on_complete(symbol, i, total, &result);
        match result {
            Ok(_) => summary.succeeded += 1,
            Err(e) => summary.errors.push((symbol.clone(), e)),
        }

        if !provider.is_available() {
            for rest in &symbols[i + 1..] {
                summary.errors.push((rest.clone(), DataError::ProviderBlocked));
            }
            break;
        }
    }

    progress.on_batch_complete(&summary);
    summary
}

/// Fetch one symbol and merge it into whatever is already stored, so a
/// request over a shorter range never truncates a longer history. Fetched
/// bars replace stored bars with the same timestamp.
fn download_single(
    provider: &dyn DataProvider,
    store: &ParquetStore,
    symbol: &str,
    interval: Interval,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<usize, DataError> {
    let fetched = provider.fetch(symbol, interval, start, end)?;
    let mut bars = match store.load(symbol, interval) {
        Ok(stored) => stored.bars().to_vec(),
        Err(DataError::NoStoredData { .. }) => Vec::new(),
        Err(e) => {
            warn!(symbol, error = %e, "stored copy unusable, replacing it");
            Vec::new()
        }
    };
    bars.extend(fetched);
    let series = clean_bars(symbol, interval, bars)?;
    store.write(&series, provider.source())?;
    Ok(series.len())
}

/// Sort by time, keep the last bar of any duplicated timestamp and drop
/// bars that violate OHLC sanity.
pub fn clean_bars(symbol: &str, interval: Interval, mut bars: Vec<Bar>) -> Result<PriceSeries, DataError> {
    let fetched = bars.len();
    bars.sort_by_key(|b| b.timestamp);

    let mut cleaned: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars {
        if !bar.is_sane() {
            continue;
        }
        match cleaned.last_mut() {
            Some(prev) if prev.timestamp == bar.timestamp => *prev = bar,
            _ => cleaned.push(bar),
        }
    }

    if cleaned.len() < fetched {
        warn!(symbol, dropped = fetched - cleaned.len(), "dropped duplicate or invalid bars");
    }
    if cleaned.is_empty() {
        return Err(DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        });
    }
    Ok(PriceSeries::new(symbol, interval, cleaned)?)
}
