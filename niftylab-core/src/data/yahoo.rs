//! Yahoo Finance data provider.
//!
//! Fetches OHLCV bars from the v8 chart API with retries, exponential
//! backoff and a shared `RequestThrottle`. NSE tickers carry the `.NS`
//! suffix (`RELIANCE.NS`); symbols are passed through as given.
//!
//! Yahoo timestamps are UTC epoch seconds. Bars are converted to exchange
//! local time (IST, UTC+05:30); daily and weekly bars are normalized to
//! midnight of their trading date.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use tracing::{debug, warn};

use super::provider::{DataError, DataProvider, DataSource};
use super::throttle::RequestThrottle;
use crate::domain::{Bar, Interval};

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// IST offset in seconds.
const EXCHANGE_UTC_OFFSET: i32 = 5 * 3600 + 30 * 60;

// ─── Response schema ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

// ─── Provider ────────────────────────────────────────────────────────

pub struct YahooProvider {
    client: reqwest::blocking::Client,
    throttle: Arc<RequestThrottle>,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    pub fn new(throttle: Arc<RequestThrottle>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            throttle,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    fn chart_url(symbol: &str, interval: Interval, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        // period2 is exclusive
        let end_ts = end
            .succ_opt()
            .unwrap_or(end)
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();
        format!(
            "{CHART_URL}/{symbol}?period1={start_ts}&period2={end_ts}&interval={}\
             &includePrePost=false",
            interval.yahoo_code()
        )
    }

    fn fetch_with_retry(
        &self,
        symbol: &str,
        interval: Interval,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        let url = Self::chart_url(symbol, interval, start, end);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                warn!(symbol, attempt, ?delay, "retrying Yahoo request");
                std::thread::sleep(delay);
            }
            if !self.throttle.is_allowed() {
                return Err(DataError::ProviderBlocked);
            }
            self.throttle.wait_turn();

            let resp = match self.client.get(&url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();
            if status == reqwest::StatusCode::FORBIDDEN {
                self.throttle.trip();
                return Err(DataError::ProviderBlocked);
            }
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.throttle.record_failure();
                let retry_after_secs = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(DataError::RateLimited { retry_after_secs });
                continue;
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                });
            }
            if !status.is_success() {
                self.throttle.record_failure();
                last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                continue;
            }

            let chart: ChartResponse = resp.json().map_err(|e| {
                DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
            })?;
            let bars = parse_response(symbol, interval, chart)?;
            self.throttle.record_success();
            debug!(symbol, %interval, bars = bars.len(), "fetched from Yahoo");
            return Ok(bars);
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn source(&self) -> DataSource {
        DataSource::YahooFinance
    }

    fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        self.fetch_with_retry(symbol, interval, start, end)
    }

    fn is_available(&self) -> bool {
        self.throttle.is_allowed()
    }
}

// ─── Parsing ─────────────────────────────────────────────────────────

fn parse_response(
    symbol: &str,
    interval: Interval,
    resp: ChartResponse,
) -> Result<Vec<Bar>, DataError> {
    let result = match (resp.chart.result, resp.chart.error) {
        (Some(result), _) => result,
        (None, Some(err)) if err.code == "Not Found" => {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
        }
        (None, Some(err)) => {
            return Err(DataError::ResponseFormatChanged(format!(
                "{}: {}",
                err.code, err.description
            )))
        }
        (None, None) => {
            return Err(DataError::ResponseFormatChanged(
                "empty result with no error".into(),
            ))
        }
    };

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;
    // A valid symbol with no trading in range has no timestamp array.
    let Some(timestamps) = data.timestamp else {
        return Ok(Vec::new());
    };
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let timestamp = exchange_time(ts, interval).ok_or_else(|| {
            DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
        })?;
        let field = |v: &Vec<Option<f64>>| v.get(i).copied().flatten();
        // Holidays and halted sessions come back as null rows.
        let (Some(open), Some(high), Some(low), Some(close)) = (
            field(&quote.open),
            field(&quote.high),
            field(&quote.low),
            field(&quote.close),
        ) else {
            continue;
        };
        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
        });
    }
    Ok(bars)
}

fn exchange_time(epoch_secs: i64, interval: Interval) -> Option<NaiveDateTime> {
    let offset = FixedOffset::east_opt(EXCHANGE_UTC_OFFSET)?;
    let local = DateTime::from_timestamp(epoch_secs, 0)?
        .with_timezone(&offset)
        .naive_local();
    if interval.is_intraday() {
        Some(local)
    } else {
        Some(local.date().and_time(NaiveTime::MIN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str, interval: Interval) -> Result<Vec<Bar>, DataError> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        parse_response("TCS.NS", interval, resp)
    }

    #[test]
    fn parses_daily_bars_and_skips_null_rows() {
        // 2024-01-01 03:45 UTC = 09:15 IST
        let json = r#"{"chart":{"result":[{"timestamp":[1704080700,1704167100,1704253500],
            "indicators":{"quote":[{
                "open":[3700.0,null,3720.5],
                "high":[3750.0,null,3760.0],
                "low":[3690.0,null,3710.0],
                "close":[3740.0,null,3755.0],
                "volume":[120000,null,98000]}]}}],"error":null}}"#;
        let bars = parse(json, Interval::Day1).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp.to_string(), "2024-01-01 00:00:00");
        assert_eq!(bars[1].close, 3755.0);
        assert_eq!(bars[1].volume, 98000);
    }

    #[test]
    fn intraday_bars_keep_exchange_time() {
        let json = r#"{"chart":{"result":[{"timestamp":[1704080700],
            "indicators":{"quote":[{"open":[1.0],"high":[2.0],"low":[0.5],"close":[1.5],
            "volume":[null]}]}}],"error":null}}"#;
        let bars = parse(json, Interval::Minute15).unwrap();
        assert_eq!(bars[0].timestamp.to_string(), "2024-01-01 09:15:00");
        assert_eq!(bars[0].volume, 0);
    }

    #[test]
    fn not_found_error_maps_to_symbol_not_found() {
        let json = r#"{"chart":{"result":null,
            "error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(matches!(
            parse(json, Interval::Day1),
            Err(DataError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn chart_url_uses_yahoo_interval_code() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let url = YahooProvider::chart_url("INFY.NS", Interval::Hour1, d(1), d(31));
        assert!(url.contains("/INFY.NS?"));
        assert!(url.contains("interval=60m"));
        assert!(url.contains("period1=1704067200"));
    }
}
