//! Parquet store with Hive-style partitioning.
//!
//! Layout:
//! ```text
//! {root}/interval={code}/symbol={SYMBOL}.parquet
//! {root}/interval={code}/symbol={SYMBOL}.meta.json
//! ```
//!
//! - Atomic writes (write to `.tmp`, rename into place)
//! - Schema and content-hash validation on load
//! - Corrupt files are renamed to `*.quarantined` and reported
//! - Metadata sidecar per series (bar count, range, hash, source)

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::provider::{DataError, DataSource};
use crate::domain::{Bar, Interval, PriceSeries};

const COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

/// Sidecar describing one stored series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreMeta {
    pub symbol: String,
    pub interval: Interval,
    pub first: NaiveDateTime,
    pub last: NaiveDateTime,
    pub bar_count: usize,
    pub data_hash: String,
    pub source: DataSource,
    pub stored_at: NaiveDateTime,
}

/// Calendar days a stored range may fall short of a requested bound and
/// still count as covering it. NSE holidays rarely close the market for
/// more than two weekdays in a row.
const HOLIDAY_SLACK_DAYS: i64 = 2;

impl StoreMeta {
    /// Whether the stored range spans `start..=end` in trading days.
    ///
    /// Bounds that fall on a weekend are moved to the nearest weekday
    /// inside the range, and each side tolerates a short holiday gap (a
    /// full bar for weekly data).
    pub fn covers(&self, start: NaiveDate, end: NaiveDate) -> bool {
        let slack = Duration::days(HOLIDAY_SLACK_DAYS.max(self.interval.step().num_days() - 1));
        let first_session = roll_to_weekday(start, 1);
        let last_session = roll_to_weekday(end, -1);
        if first_session > last_session {
            return self.first.date() <= end && self.last.date() >= start;
        }
        self.first.date() <= first_session + slack && self.last.date() + slack >= last_session
    }
}

/// Step `date` by `dir` days until it is a weekday.
fn roll_to_weekday(mut date: NaiveDate, dir: i64) -> NaiveDate {
    while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        date += Duration::days(dir);
    }
    date
}

pub struct ParquetStore {
    root: PathBuf,
}

impl ParquetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn interval_dir(&self, interval: Interval) -> PathBuf {
        self.root.join(format!("interval={}", interval.code()))
    }

    fn data_path(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.interval_dir(interval)
            .join(format!("symbol={symbol}.parquet"))
    }

    fn meta_path(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.interval_dir(interval)
            .join(format!("symbol={symbol}.meta.json"))
    }

    /// Persist a series, replacing any stored copy.
    pub fn write(&self, series: &PriceSeries, source: DataSource) -> Result<StoreMeta, DataError> {
        let symbol = series.symbol();
        check_symbol(symbol)?;
        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return Err(DataError::Store(format!("refusing to store empty series {symbol}")));
        };

        let dir = self.interval_dir(series.interval());
        fs::create_dir_all(&dir)
            .map_err(|e| DataError::Store(format!("failed to create {}: {e}", dir.display())))?;

        let meta = StoreMeta {
            symbol: symbol.to_string(),
            interval: series.interval(),
            first: first.timestamp,
            last: last.timestamp,
            bar_count: series.len(),
            data_hash: content_hash(series.bars())?,
            source,
            stored_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::Store(format!("meta serialization: {e}")))?;

        // Both temp files must exist before anything stored is replaced.
        let meta_path = self.meta_path(symbol, series.interval());
        let meta_tmp = meta_path.with_extension("json.tmp");
        fs::write(&meta_tmp, meta_json).map_err(|e| {
            let _ = fs::remove_file(&meta_tmp);
            DataError::Store(format!("meta write: {e}"))
        })?;

        let mut df = bars_to_dataframe(series.bars())?;
        let path = self.data_path(symbol, series.interval());
        let tmp_path = path.with_extension("parquet.tmp");
        if let Err(e) = write_parquet(&mut df, &tmp_path) {
            let _ = fs::remove_file(&tmp_path);
            let _ = fs::remove_file(&meta_tmp);
            return Err(e);
        }

        // New data must never sit next to the old sidecar's hash. A data
        // file without a sidecar still loads.
        let swap = remove_if_exists(&meta_path)
            .and_then(|()| fs::rename(&tmp_path, &path))
            .map_err(|e| format!("atomic rename failed: {e}"))
            .and_then(|()| {
                fs::rename(&meta_tmp, &meta_path).map_err(|e| format!("meta write: {e}"))
            });
        if let Err(reason) = swap {
            let _ = fs::remove_file(&tmp_path);
            let _ = fs::remove_file(&meta_tmp);
            return Err(DataError::Store(reason));
        }

        debug!(symbol, interval = %series.interval(), bars = series.len(), "stored series");
        Ok(meta)
    }

    /// Load a stored series.
    ///
    /// A file that fails schema, sanity or hash validation is quarantined
    /// and reported as `DataError::Quarantined`. A file that cannot be
    /// opened is left in place and reported as `DataError::Store`.
    pub fn load(&self, symbol: &str, interval: Interval) -> Result<PriceSeries, DataError> {
        check_symbol(symbol)?;
        let path = self.data_path(symbol, interval);
        if !path.exists() {
            return Err(DataError::NoStoredData {
                symbol: symbol.to_string(),
                interval,
            });
        }

        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(DataError::NoStoredData {
                    symbol: symbol.to_string(),
                    interval,
                })
            }
            Err(e) => {
                return Err(DataError::Store(format!(
                    "failed to open {}: {e}",
                    path.display()
                )))
            }
        };

        let validated = read_bars(file).and_then(|bars| {
            if let Some(meta) = self.meta(symbol, interval) {
                if meta.data_hash != content_hash(&bars)? {
                    return Err(DataError::Store("content hash mismatch".into()));
                }
            }
            Ok(PriceSeries::new(symbol, interval, bars)?)
        });

        match validated {
            Ok(series) => Ok(series),
            Err(e) => Err(self.quarantine(&path, symbol, interval, e.to_string())),
        }
    }

    /// Move a file that failed validation aside and drop its sidecar.
    fn quarantine(
        &self,
        path: &Path,
        symbol: &str,
        interval: Interval,
        reason: String,
    ) -> DataError {
        let target = path.with_extension("parquet.quarantined");
        warn!(path = %path.display(), %reason, "quarantining corrupt store file");
        if let Err(e) = fs::rename(path, &target) {
            warn!(path = %path.display(), error = %e, "quarantine rename failed");
            return DataError::Store(format!(
                "{} failed validation ({reason}) and could not be quarantined: {e}",
                path.display()
            ));
        }
        if let Err(e) = remove_if_exists(&self.meta_path(symbol, interval)) {
            warn!(symbol, error = %e, "failed to remove sidecar of quarantined file");
        }
        DataError::Quarantined {
            path: path.display().to_string(),
            reason,
        }
    }

    pub fn meta(&self, symbol: &str, interval: Interval) -> Option<StoreMeta> {
        let content = fs::read_to_string(self.meta_path(symbol, interval)).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn contains(&self, symbol: &str, interval: Interval) -> bool {
        self.data_path(symbol, interval).exists()
    }

    /// Metadata of every stored series, by interval then symbol.
    pub fn list(&self) -> Vec<StoreMeta> {
        let mut metas = Vec::new();
        for interval in Interval::ALL {
            let Ok(entries) = fs::read_dir(self.interval_dir(interval)) else {
                continue;
            };
            let mut found: Vec<StoreMeta> = entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| {
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.ends_with(".meta.json"))
                })
                .filter_map(|path| fs::read_to_string(path).ok())
                .filter_map(|content| serde_json::from_str(&content).ok())
                .collect();
            found.sort_by(|a, b| a.symbol.cmp(&b.symbol));
            metas.extend(found);
        }
        metas
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn check_symbol(symbol: &str) -> Result<(), DataError> {
    if symbol.is_empty() || symbol.contains(['/', '\\']) || symbol.starts_with('.') {
        return Err(DataError::Store(format!("invalid symbol key '{symbol}'")));
    }
    Ok(())
}

fn content_hash(bars: &[Bar]) -> Result<String, DataError> {
    let bytes = serde_json::to_vec(bars)
        .map_err(|e| DataError::Store(format!("hash serialization: {e}")))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn bars_to_dataframe(bars: &[Bar]) -> Result<DataFrame, DataError> {
    let millis: Vec<i64> = bars
        .iter()
        .map(|b| b.timestamp.and_utc().timestamp_millis())
        .collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<u64> = bars.iter().map(|b| b.volume).collect();

    DataFrame::new(vec![
        Column::new("timestamp".into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .map_err(|e| DataError::Parquet(format!("timestamp cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| DataError::Parquet(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file =
        fs::File::create(path).map_err(|e| DataError::Parquet(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| DataError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}

fn read_bars(file: fs::File) -> Result<Vec<Bar>, DataError> {
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::Parquet(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(DataError::Store("empty parquet file".into()));
    }
    for name in COLUMNS {
        if df.column(name).is_err() {
            return Err(DataError::Store(format!("missing column '{name}'")));
        }
    }
    dataframe_to_bars(&df)
}

fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<Bar>, DataError> {
    let cast = |name: &str, dtype: DataType| -> Result<Column, DataError> {
        df.column(name)
            .and_then(|c| c.cast(&dtype))
            .map_err(|e| DataError::Parquet(format!("column '{name}': {e}")))
    };
    let type_err = |e: PolarsError| DataError::Parquet(format!("column type: {e}"));

    let ts_col = cast("timestamp", DataType::Int64)?;
    let open_col = cast("open", DataType::Float64)?;
    let high_col = cast("high", DataType::Float64)?;
    let low_col = cast("low", DataType::Float64)?;
    let close_col = cast("close", DataType::Float64)?;
    let vol_col = cast("volume", DataType::UInt64)?;

    let ts = ts_col.i64().map_err(type_err)?;
    let open = open_col.f64().map_err(type_err)?;
    let high = high_col.f64().map_err(type_err)?;
    let low = low_col.f64().map_err(type_err)?;
    let close = close_col.f64().map_err(type_err)?;
    let volume = vol_col.u64().map_err(type_err)?;

    (0..df.height())
        .map(|i| {
            let millis = ts
                .get(i)
                .ok_or_else(|| DataError::Parquet(format!("null timestamp at row {i}")))?;
            let timestamp = DateTime::from_timestamp_millis(millis)
                .ok_or_else(|| DataError::Parquet(format!("timestamp out of range at row {i}")))?
                .naive_utc();
            Ok(Bar {
                timestamp,
                open: open.get(i).unwrap_or(f64::NAN),
                high: high.get(i).unwrap_or(f64::NAN),
                low: low.get(i).unwrap_or(f64::NAN),
                close: close.get(i).unwrap_or(f64::NAN),
                volume: volume.get(i).unwrap_or(0),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_series(symbol: &str) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        PriceSeries::from_closes(symbol, Interval::Day1, start, &[100.0, 101.5, 99.25, 102.0])
            .unwrap()
    }

    #[test]
    fn write_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());
        let series = sample_series("RELIANCE.NS");

        let meta = store.write(&series, DataSource::Synthetic).unwrap();
        assert_eq!(meta.bar_count, 4);
        assert!(dir
            .path()
            .join("interval=1d/symbol=RELIANCE.NS.parquet")
            .exists());

        let loaded = store.load("RELIANCE.NS", Interval::Day1).unwrap();
        assert_eq!(loaded, series);
    }

    #[test]
    fn missing_series_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());
        assert!(matches!(
            store.load("TCS.NS", Interval::Day1),
            Err(DataError::NoStoredData { .. })
        ));
    }

    #[test]
    fn corrupt_file_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());
        store.write(&sample_series("INFY.NS"), DataSource::Synthetic).unwrap();

        let path = dir.path().join("interval=1d/symbol=INFY.NS.parquet");
        fs::write(&path, b"not a parquet file").unwrap();

        assert!(matches!(
            store.load("INFY.NS", Interval::Day1),
            Err(DataError::Quarantined { .. })
        ));
        assert!(!path.exists());
        assert!(path.with_extension("parquet.quarantined").exists());
        assert!(store.meta("INFY.NS", Interval::Day1).is_none());
    }

    #[test]
    fn failed_rewrite_keeps_previous_copy_loadable() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let short =
            PriceSeries::from_closes("X.NS", Interval::Day1, start, &[10.0, 11.0, 12.0]).unwrap();
        store.write(&short, DataSource::Synthetic).unwrap();

        let meta_tmp = dir.path().join("interval=1d/symbol=X.NS.meta.json.tmp");
        fs::create_dir(&meta_tmp).unwrap();
        let err = store.write(&sample_series("X.NS"), DataSource::Synthetic);
        assert!(matches!(err, Err(DataError::Store(_))));
        assert!(!dir.path().join("interval=1d/symbol=X.NS.parquet.tmp").exists());

        assert_eq!(store.load("X.NS", Interval::Day1).unwrap(), short);
        assert!(!dir
            .path()
            .join("interval=1d/symbol=X.NS.parquet.quarantined")
            .exists());

        fs::remove_dir(&meta_tmp).unwrap();
        store.write(&sample_series("X.NS"), DataSource::Synthetic).unwrap();
        assert_eq!(store.load("X.NS", Interval::Day1).unwrap().len(), 4);
        assert_eq!(store.meta("X.NS", Interval::Day1).unwrap().bar_count, 4);
    }

    #[test]
    fn data_without_sidecar_still_loads() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());
        let series = sample_series("SBIN.NS");
        store.write(&series, DataSource::Synthetic).unwrap();
        fs::remove_file(dir.path().join("interval=1d/symbol=SBIN.NS.meta.json")).unwrap();

        assert_eq!(store.load("SBIN.NS", Interval::Day1).unwrap(), series);
    }

    #[test]
    fn failed_quarantine_is_reported_and_file_left_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());
        store.write(&sample_series("ITC.NS"), DataSource::Synthetic).unwrap();

        let path = dir.path().join("interval=1d/symbol=ITC.NS.parquet");
        fs::write(&path, b"garbage").unwrap();
        // A non-empty directory in the way makes the rename fail.
        let blocker = path.with_extension("parquet.quarantined");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), b"x").unwrap();

        match store.load("ITC.NS", Interval::Day1) {
            Err(DataError::Store(msg)) => {
                assert!(msg.contains("could not be quarantined"), "{msg}")
            }
            other => panic!("expected a store error, got {other:?}"),
        }
        assert!(path.exists());
        assert!(store.meta("ITC.NS", Interval::Day1).is_some());
    }

    #[test]
    fn list_reports_stored_series() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());
        store.write(&sample_series("TCS.NS"), DataSource::Synthetic).unwrap();
        store.write(&sample_series("ITC.NS"), DataSource::Synthetic).unwrap();

        let listed = store.list();
        let symbols: Vec<&str> = listed.iter().map(|m| m.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["ITC.NS", "TCS.NS"]);

        let meta = &listed[0];
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        assert!(meta.covers(d(1), d(4)));
    }

    #[test]
    fn coverage_follows_trading_days() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());
        // 2024-01-01 (Mon) through 2024-01-04 (Thu)
        let meta = store.write(&sample_series("TCS.NS"), DataSource::Synthetic).unwrap();
        let d = |month, day| NaiveDate::from_ymd_opt(2024, month, day).unwrap();

        // Saturday start rolls forward to Monday; Sunday end rolls back to
        // Friday, one holiday-sized gap after the last bar.
        assert!(meta.covers(d(1, 1) - Duration::days(2), d(1, 7)));
        // a start one weekday past the first bar is inside the range
        assert!(meta.covers(d(1, 2), d(1, 4)));
        // the stored history stops well before the request ends
        assert!(!meta.covers(d(1, 1), d(1, 12)));
        // nor does it reach back far enough
        assert!(!meta.covers(d(1, 1) - Duration::days(10), d(1, 4)));
    }

    #[test]
    fn rejects_path_like_symbols() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());
        assert!(store.load("../etc", Interval::Day1).is_err());
    }
}
