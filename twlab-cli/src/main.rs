//! TwLab CLI — single-stock diagnosis and whole-market scan for Taiwan equities.
//!
//! Commands:
//! - `diagnose`: indicators, breakout signals and the forward-hold backtest for one stock
//! - `scan`: rank the day's movers, walking back over holidays
//! - `indicators`: latest indicator readings for one stock

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use twlab_core::data::{CircuitBreaker, DataFeed, FinMindFeed, InstrumentDirectory, SyntheticFeed};
use twlab_core::domain::CapitalTier;
use twlab_core::scanner::{RankBy, ScanOutcome, ScanStatus};
use twlab_runner::export::{save_candidates_csv, save_trades_csv};
use twlab_runner::{
    diagnose, export_json, scan_configured, AppConfig, CachedFeed, Diagnosis, FetchCache,
};

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "twlab.toml";

#[derive(Parser)]
#[command(
    name = "twlab",
    about = "TwLab CLI — Taiwan stock breakout diagnosis and market scanner"
)]
struct Cli {
    /// Path to a TOML config file. Defaults to ./twlab.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the offline synthetic feed instead of FinMind.
    #[arg(long, global = true, default_value_t = false)]
    synthetic: bool,

    /// Debug-level logging (overrides RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Diagnose one stock: indicators, breakout signals, backtest.
    Diagnose {
        /// Stock id (e.g., 2330).
        id: String,

        /// Bars to hold after entry.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=10))]
        hold_days: Option<u32>,

        /// Calendar days of history to fetch.
        #[arg(long)]
        days: Option<u32>,

        /// Last date of the history (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<String>,

        /// Print the full diagnosis as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Write the trade list to this CSV file.
        #[arg(long)]
        trades_csv: Option<PathBuf>,
    },
    /// Scan the market for the day's movers.
    Scan {
        /// Date to scan (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<String>,

        /// Minimum intraday change in percent.
        #[arg(long)]
        min_return: Option<f64>,

        /// Minimum volume in shares.
        #[arg(long)]
        min_volume: Option<f64>,

        /// Ranking: return, volume.
        #[arg(long)]
        rank_by: Option<String>,

        /// Calendar days to walk back when the date has no data.
        #[arg(long)]
        lookback: Option<u32>,

        /// Capital tier: large, mid, small.
        #[arg(long)]
        tier: Option<String>,

        /// Keep only the top N candidates.
        #[arg(long)]
        limit: Option<usize>,

        /// Instrument directory TOML for names and capital (overrides `[directory] path`).
        #[arg(long)]
        directory: Option<PathBuf>,

        /// Write candidates to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Print the outcome as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Latest indicator readings for one stock.
    Indicators {
        /// Stock id (e.g., 2330).
        id: String,

        /// Last date of the history (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let cache = Arc::new(FetchCache::new(config.cache.ttl()));

    if cli.synthetic {
        info!("using synthetic feed");
        let feed = CachedFeed::new(SyntheticFeed::default(), cache);
        dispatch(cli.command, &config, &feed)
    } else {
        let circuit_breaker = Arc::new(CircuitBreaker::default_feed());
        let feed = CachedFeed::new(
            FinMindFeed::new(config.finmind_config(), circuit_breaker)?,
            cache,
        );
        dispatch(cli.command, &config, &feed)
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            AppConfig::from_file(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => AppConfig::default(),
    }
    .with_env_overrides();
    config.validate()?;
    debug!(config_id = %config.config_id()?, "config loaded");
    Ok(config)
}

fn dispatch<F: DataFeed + InstrumentDirectory>(
    command: Commands,
    config: &AppConfig,
    feed: &F,
) -> Result<()> {
    match command {
        Commands::Diagnose {
            id,
            hold_days,
            days,
            as_of,
            json,
            trades_csv,
        } => run_diagnose(feed, config, &id, hold_days, days, as_of, json, trades_csv),
        Commands::Scan {
            date,
            min_return,
            min_volume,
            rank_by,
            lookback,
            tier,
            limit,
            directory,
            csv,
            json,
        } => {
            let overrides = ScanOverrides {
                min_return,
                min_volume,
                rank_by,
                lookback,
                tier,
                limit,
                directory,
            };
            run_scan(feed, config, date, overrides, csv, json)
        }
        Commands::Indicators { id, as_of } => run_indicators(feed, config, &id, as_of),
    }
}

fn parse_date(s: Option<&str>) -> Result<NaiveDate> {
    Ok(s.map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()?
        .unwrap_or_else(|| chrono::Local::now().date_naive()))
}

#[allow(clippy::too_many_arguments)]
fn run_diagnose(
    feed: &dyn DataFeed,
    config: &AppConfig,
    id: &str,
    hold_days: Option<u32>,
    days: Option<u32>,
    as_of: Option<String>,
    json: bool,
    trades_csv: Option<PathBuf>,
) -> Result<()> {
    let as_of = parse_date(as_of.as_deref())?;
    let mut diag_config = config.diagnosis.clone();
    if let Some(h) = hold_days {
        diag_config.hold_days = h as usize;
    }
    if let Some(d) = days {
        diag_config.history_days = d;
    }

    let diag = diagnose(feed, id, as_of, &diag_config, &config.indicators)?;

    if let Some(path) = trades_csv {
        save_trades_csv(&path, &diag.backtest.details)?;
        info!(path = %path.display(), trades = diag.backtest.details.len(), "trades written");
    }

    if json {
        println!("{}", export_json(&diag)?);
    } else {
        print_diagnosis(&diag);
    }
    Ok(())
}

fn run_indicators(feed: &dyn DataFeed, config: &AppConfig, id: &str, as_of: Option<String>) -> Result<()> {
    let as_of = parse_date(as_of.as_deref())?;
    let diag = diagnose(feed, id, as_of, &config.diagnosis, &config.indicators)?;

    let Some(indicators) = diag.indicators.as_ref() else {
        report_not_ready(&diag);
        return Ok(());
    };
    if let Some(bar) = diag.latest_bar() {
        println!("{} {}  close {:.2}", diag.instrument_id, bar.date, bar.close);
    }
    for (name, value) in indicators.latest() {
        println!("  {name:<22} {value:>12.4}");
    }
    Ok(())
}

struct ScanOverrides {
    min_return: Option<f64>,
    min_volume: Option<f64>,
    rank_by: Option<String>,
    lookback: Option<u32>,
    tier: Option<String>,
    limit: Option<usize>,
    directory: Option<PathBuf>,
}

fn run_scan(
    feed: &(impl DataFeed + InstrumentDirectory),
    config: &AppConfig,
    date: Option<String>,
    overrides: ScanOverrides,
    csv: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date.as_deref())?;
    let mut config = config.clone();
    if overrides.directory.is_some() {
        config.directory.path = overrides.directory;
    }
    let scan_config = &mut config.scan;
    if let Some(v) = overrides.min_return {
        scan_config.min_return_pct = v;
    }
    if let Some(v) = overrides.min_volume {
        scan_config.min_volume = v;
    }
    if let Some(s) = overrides.rank_by.as_deref() {
        let Some(rank_by) = RankBy::parse(s) else {
            bail!("unknown ranking '{s}'. Valid: return, volume");
        };
        scan_config.rank_by = rank_by;
    }
    if let Some(v) = overrides.lookback {
        scan_config.lookback_days = v;
    }
    if let Some(s) = overrides.tier.as_deref() {
        let Some(tier) = CapitalTier::parse(s) else {
            bail!("unknown capital tier '{s}'. Valid: large, mid, small");
        };
        scan_config.capital_tier = Some(tier);
    }
    if overrides.limit.is_some() {
        scan_config.limit = overrides.limit;
    }

    let outcome = scan_configured(feed, feed, date, &config)?;

    if let Some(path) = csv {
        save_candidates_csv(&path, &outcome.candidates)?;
        info!(path = %path.display(), candidates = outcome.candidates.len(), "candidates written");
    }

    if json {
        println!("{}", export_json(&outcome)?);
    } else {
        print_scan(&outcome);
    }
    Ok(())
}

fn report_not_ready(diag: &Diagnosis) {
    match diag.status_error() {
        Some(e) => println!("{}: {e}", diag.instrument_id),
        None => println!("{}: no data", diag.instrument_id),
    }
}

fn print_diagnosis(diag: &Diagnosis) {
    let Some(indicators) = diag.indicators.as_ref() else {
        report_not_ready(diag);
        return;
    };

    println!();
    println!("=== {} as of {} ===", diag.instrument_id, diag.as_of);
    if let (Some(first), Some(last)) = (diag.series.first_date(), diag.series.last_date()) {
        println!("History:        {first} to {last} ({} bars)", diag.series.len());
    }
    if let Some(bar) = diag.latest_bar() {
        println!(
            "Latest:         {}  O {:.2}  H {:.2}  L {:.2}  C {:.2}  V {}",
            bar.date, bar.open, bar.high, bar.low, bar.close, bar.volume
        );
    }

    println!();
    println!("--- Indicators ---");
    for (name, value) in indicators.latest() {
        println!("  {name:<22} {value:>12.4}");
    }

    let dates = diag.signal_dates();
    println!();
    println!("--- Breakout signals ({}) ---", dates.len());
    for date in dates.iter().rev().take(10) {
        println!("  {date}");
    }

    let bt = &diag.backtest;
    println!();
    println!("--- Backtest (hold {} days) ---", bt.hold_days);
    println!("Win rate:       {:.1}%", bt.win_rate);
    println!("Trades:         {} ({} wins)", bt.signal_count, bt.wins);
    if bt.signal_count > 0 {
        println!("Avg return:     {:.2}%", bt.average_return);
        println!("Best / worst:   {:.2}% / {:.2}%", bt.best_return, bt.worst_return);
        println!();
        println!(
            "  {:<10}  {:<10}  {:>9}  {:<10}  {:>9}  {:>8}",
            "signal", "entry", "price", "exit", "price", "return"
        );
        for t in &bt.details {
            println!(
                "  {:<10}  {:<10}  {:>9.2}  {:<10}  {:>9.2}  {:>7.2}%",
                t.signal_date, t.entry_date, t.entry_price, t.exit_date, t.exit_price, t.return_pct
            );
        }
    }
}

fn scan_headline(date: NaiveDate, outcome: &ScanOutcome) -> String {
    let mut line = format!(
        "{date}: {} of {} instruments passed the filter",
        outcome.matched, outcome.snapshot_size
    );
    if outcome.candidates.len() < outcome.matched {
        line.push_str(&format!(", showing top {}", outcome.candidates.len()));
    }
    line
}

fn print_scan(outcome: &ScanOutcome) {
    match outcome.status {
        ScanStatus::Found { date } => {
            if date != outcome.requested {
                println!(
                    "No data for {}; showing latest trading day {date}.",
                    outcome.requested
                );
            }
            println!("{}", scan_headline(date, outcome));
        }
        ScanStatus::NoDataFound {
            searched_from,
            days_searched,
        } => {
            println!("No trading data in the {days_searched} days up to {searched_from}.");
            return;
        }
    }

    if outcome.is_empty() {
        return;
    }
    println!();
    println!(
        "  {:>4}  {:<8}  {:<16}  {:>10}  {:>8}  {:>14}",
        "#", "id", "name", "close", "change", "volume"
    );
    for (i, c) in outcome.candidates.iter().enumerate() {
        println!(
            "  {:>4}  {:<8}  {:<16}  {:>10.2}  {:>7.2}%  {:>14}",
            i + 1,
            c.instrument_id,
            c.display_name,
            c.close,
            c.pct_change,
            c.volume
        );
    }
}
