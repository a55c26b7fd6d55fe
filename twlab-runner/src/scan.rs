//! Market scan pipeline.

use chrono::NaiveDate;
use tracing::{debug, warn};

use twlab_core::data::{DataFeed, InstrumentDirectory};
use twlab_core::scanner::{MarketScanner, ScanConfig, ScanOutcome, ScanStatus};

use crate::config::AppConfig;
use crate::diagnose::RunError;

/// Scan the market as of `date`, walking back up to `lookback_days` for the
/// latest trading day with data.
pub fn scan(
    feed: &dyn DataFeed,
    directory: &dyn InstrumentDirectory,
    date: NaiveDate,
    config: &ScanConfig,
) -> Result<ScanOutcome, RunError> {
    let outcome = MarketScanner::new(feed, directory).scan(date, config)?;
    if let ScanStatus::NoDataFound { days_searched, .. } = outcome.status {
        warn!(
            requested = %date,
            days_searched,
            "no trading day found; widen lookback_days or check the feed"
        );
    }
    Ok(outcome)
}

/// Scan with a full application config.
///
/// The config is validated first. If `[directory] path` names a file, that
/// listing replaces `fallback` for labeling and the capital-tier filter.
pub fn scan_configured(
    feed: &dyn DataFeed,
    fallback: &dyn InstrumentDirectory,
    date: NaiveDate,
    config: &AppConfig,
) -> Result<ScanOutcome, RunError> {
    config.validate()?;
    match config.load_directory()? {
        Some(directory) => {
            debug!(instruments = directory.len(), "using configured directory file");
            scan(feed, &directory, date, &config.scan)
        }
        None => scan(feed, fallback, date, &config.scan),
    }
}
