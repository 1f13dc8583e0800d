//! NiftyLab CLI: download, run, cache and universe commands.
//!
//! Commands:
//! - `download`: fetch bars from Yahoo Finance into the Parquet store
//! - `run`: backtest every configured strategy on every symbol and rank them
//! - `cache status`: list stored series with their ranges and sizes
//! - `universe`: print the groups of a universe file

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use niftylab_core::data::{
    download_symbols, random_walk, LogProgress, ParquetStore, RequestThrottle, Universe,
    YahooProvider,
};
use niftylab_core::{Interval, SimulatorConfig, StrategyConfig};
use niftylab_runner::export::save_batch;
use niftylab_runner::{
    annualized_sharpe, BatchReport, BatchRunner, MemorySource, RankingWeights, RunConfig,
    StoreSource,
};

#[derive(Parser)]
#[command(
    name = "niftylab",
    version,
    about = "NiftyLab: strategy backtesting over NSE price history"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download bars from Yahoo Finance and store them as Parquet.
    Download {
        /// Symbols to download (e.g. RELIANCE.NS TCS.NS).
        symbols: Vec<String>,

        /// Add every symbol of this universe file.
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Only this group of the universe.
        #[arg(long, requires = "universe")]
        group: Option<String>,

        /// Bar interval: 1m, 5m, 15m, 30m, 1h, 1d, 1wk.
        #[arg(long, default_value = "1d")]
        interval: Interval,

        /// Start date (YYYY-MM-DD). Defaults to 5 years ago.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Re-download even if the stored range already covers the request.
        #[arg(long, default_value_t = false)]
        force: bool,

        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Rank strategies across symbols from a TOML run file.
    Run {
        /// Path to a TOML run config.
        #[arg(long, conflicts_with = "synthetic")]
        config: Option<PathBuf>,

        /// Skip the store: run the default strategies on N seeded
        /// random-walk series.
        #[arg(long, value_name = "N")]
        synthetic: Option<usize>,

        /// Bars per synthetic series.
        #[arg(long, default_value_t = 1_000)]
        bars: usize,

        /// Output directory for ranking.csv, ranking.json and trades.csv.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Run pairs one after another instead of on the thread pool.
        #[arg(long, default_value_t = false)]
        serial: bool,

        /// Rows of the ranking to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Store management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Show the groups and symbols of a universe file.
    Universe {
        /// Universe TOML. Defaults to the built-in NSE universe.
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List stored series: interval, date range, bar count, size.
    Status {
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Download {
            symbols,
            universe,
            group,
            interval,
            start,
            end,
            force,
            cache_dir,
        } => run_download(
            symbols, universe, group, interval, start, end, force, &cache_dir,
        ),
        Commands::Run {
            config,
            synthetic,
            bars,
            output_dir,
            serial,
            top,
        } => match (config, synthetic) {
            (Some(path), None) => run_from_config(&path, &output_dir, serial, top),
            (None, Some(n)) => run_synthetic(n, bars, &output_dir, serial, top),
            _ => bail!("one of --config or --synthetic is required"),
        },
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
        },
        Commands::Universe { file } => run_universe(file.as_deref()),
    }
}

fn parse_date(value: Option<&str>, default: NaiveDate) -> Result<NaiveDate> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
        })
        .transpose()
        .map(|d| d.unwrap_or(default))
}

#[allow(clippy::too_many_arguments)]
fn run_download(
    mut symbols: Vec<String>,
    universe: Option<PathBuf>,
    group: Option<String>,
    interval: Interval,
    start: Option<String>,
    end: Option<String>,
    force: bool,
    cache_dir: &Path,
) -> Result<()> {
    if let Some(path) = universe {
        let universe = Universe::from_file(&path)
            .with_context(|| format!("failed to load universe {}", path.display()))?;
        match group {
            Some(name) => symbols.extend_from_slice(universe.group(&name)?),
            None => symbols.extend(universe.all_symbols()),
        }
    }
    if symbols.is_empty() {
        bail!("no symbols given: pass SYMBOLS or --universe");
    }

    let today = chrono::Local::now().date_naive();
    let start_date = parse_date(start.as_deref(), today - chrono::Duration::days(365 * 5))?;
    let end_date = parse_date(end.as_deref(), today)?;
    if start_date > end_date {
        bail!("start date {start_date} is after end date {end_date}");
    }

    let throttle = Arc::new(RequestThrottle::default_provider());
    let provider = YahooProvider::new(throttle).context("failed to build HTTP client")?;
    let store = ParquetStore::new(cache_dir);

    let summary = download_symbols(
        &provider,
        &store,
        &symbols,
        interval,
        start_date,
        end_date,
        force,
        &LogProgress,
    );

    println!(
        "Downloaded {} / {} ({} already stored, {} failed)",
        summary.succeeded,
        summary.total,
        summary.skipped,
        summary.failed()
    );
    if !summary.all_succeeded() {
        for (sym, err) in &summary.errors {
            eprintln!("Error for {sym}: {err}");
        }
        std::process::exit(1);
    }
    Ok(())
}

fn run_from_config(path: &Path, output_dir: &Path, serial: bool, top: usize) -> Result<()> {
    let config = RunConfig::from_file(path)
        .with_context(|| format!("failed to load run config {}", path.display()))?;
    config.validate().context("invalid run config")?;
    let symbols = config.resolve_symbols()?;
    info!(run_id = %config.run_id(), symbols = symbols.len(), "run config loaded");

    let source = StoreSource::new(ParquetStore::new(config.cache_dir()), config.data.interval);
    let runner = BatchRunner::new(config.effective_strategies(), config.simulator.clone())
        .with_weights(config.ranking.clone())
        .with_parallelism(!serial);
    let report = runner.run(&source, &symbols)?;

    finish(&report, config.data.interval, output_dir, top)
}

fn run_synthetic(
    count: usize,
    bars: usize,
    output_dir: &Path,
    serial: bool,
    top: usize,
) -> Result<()> {
    if count == 0 {
        bail!("--synthetic needs at least one series");
    }
    let interval = Interval::Day1;
    let mut source = MemorySource::new();
    for i in 0..count {
        let symbol = format!("SYN{:03}", i + 1);
        source.insert(random_walk(&symbol, interval, bars, i as u64 + 1)?);
    }

    let runner = BatchRunner::new(StrategyConfig::default_set(), SimulatorConfig::default())
        .with_weights(RankingWeights::default())
        .with_parallelism(!serial);
    let report = runner.run(&source, &source.symbols())?;

    finish(&report, interval, output_dir, top)
}

fn finish(report: &BatchReport, interval: Interval, output_dir: &Path, top: usize) -> Result<()> {
    print_ranking(report, interval, top);
    let written = save_batch(report, output_dir)?;
    for path in &written {
        println!("Wrote {}", path.display());
    }
    if report.cancelled {
        println!("Run was cancelled before every pair completed.");
    }
    Ok(())
}

fn print_ranking(report: &BatchReport, interval: Interval, top: usize) {
    let table = &report.table;
    println!();
    println!(
        "=== Ranking: {} pairs, {} scored ===",
        table.len(),
        table.scored().count()
    );
    println!(
        "{:>4}  {:<18} {:<14} {:>7} {:>9} {:>8} {:>8} {:>6} {:>7} {:>6}",
        "#", "Strategy", "Symbol", "Score", "Return", "Sharpe*", "MaxDD", "Win", "PF", "Trades"
    );
    println!("{}", "-".repeat(98));
    for (i, row) in table.scored().take(top).enumerate() {
        let (Some(score), Some(k)) = (row.score, row.kpis.as_ref()) else {
            continue;
        };
        let pf = if k.profit_factor.is_finite() {
            format!("{:.2}", k.profit_factor)
        } else {
            "inf".to_string()
        };
        println!(
            "{:>4}  {:<18} {:<14} {:>7.3} {:>8.2}% {:>8.2} {:>7.2}% {:>5.1}% {:>7} {:>6}",
            i + 1,
            row.strategy,
            row.symbol,
            score,
            k.total_return * 100.0,
            annualized_sharpe(k.sharpe_ratio, interval),
            k.max_drawdown * 100.0,
            k.win_rate * 100.0,
            pf,
            k.trade_count
        );
    }
    println!("* Sharpe annualized for {interval} bars");

    let unscored: Vec<_> = table.unscored().collect();
    if !unscored.is_empty() {
        println!();
        println!("No result ({}):", unscored.len());
        for row in unscored {
            println!("  {:<18} {:<14} {}", row.strategy, row.symbol, row.outcome.describe());
        }
    }
    println!();
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let store = ParquetStore::new(cache_dir);
    let metas = store.list();
    if metas.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    let mut total_size = 0u64;
    println!("Cache: {}", cache_dir.display());
    println!();
    println!(
        "{:<16} {:<5} {:<41} {:>8} {:>10}",
        "Symbol", "Int", "Range", "Bars", "Size"
    );
    println!("{}", "-".repeat(84));
    for meta in &metas {
        let interval_dir = cache_dir.join(format!("interval={}", meta.interval.code()));
        let size = dir_size(&interval_dir, &meta.symbol);
        total_size += size;
        println!(
            "{:<16} {:<5} {:<41} {:>8} {:>10}",
            meta.symbol,
            meta.interval.code(),
            format!("{} to {}", meta.first, meta.last),
            meta.bar_count,
            format_size(size)
        );
    }
    println!();
    println!("Series: {}  Total size: {}", metas.len(), format_size(total_size));
    Ok(())
}

/// Bytes of the data file and sidecar of `symbol` in one interval directory.
fn dir_size(interval_dir: &Path, symbol: &str) -> u64 {
    ["parquet", "meta.json"]
        .iter()
        .filter_map(|ext| {
            std::fs::metadata(interval_dir.join(format!("symbol={symbol}.{ext}"))).ok()
        })
        .map(|m| m.len())
        .sum()
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn run_universe(file: Option<&Path>) -> Result<()> {
    let universe = match file {
        Some(path) => Universe::from_file(path)
            .with_context(|| format!("failed to load universe {}", path.display()))?,
        None => Universe::default_nse(),
    };
    for name in universe.group_names() {
        let symbols = universe.group(name)?;
        println!("{name} ({}): {}", symbols.len(), symbols.join(", "));
    }
    println!("{} unique symbols", universe.symbol_count());
    Ok(())
}
