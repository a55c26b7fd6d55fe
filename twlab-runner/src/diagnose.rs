//! Single-stock diagnosis: fetch → normalize → indicators → breakout → backtest.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use twlab_core::backtest::{BacktestEvaluator, BacktestResult, DEFAULT_HOLD_DAYS};
use twlab_core::data::{fetch_or_empty, normalize, DataFeed, FeedRequest, NormalizeOptions, DEFAULT_MIN_BARS};
use twlab_core::domain::{Bar, Series, SeriesStatus};
use twlab_core::indicators::{IndicatorParams, IndicatorSet};
use twlab_core::signal::{BreakoutConfig, BreakoutDetector};
use twlab_core::AnalysisError;

use crate::config::ConfigError;

/// Errors from runner operations.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Longest history a diagnosis may request, in calendar days.
pub const MAX_HISTORY_DAYS: u32 = 3650;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisConfig {
    /// Calendar days of history fetched before `as_of`.
    pub history_days: u32,
    pub hold_days: usize,
    pub min_bars: usize,
    pub breakout: BreakoutConfig,
}

impl Default for DiagnosisConfig {
    fn default() -> Self {
        Self {
            history_days: 180,
            hold_days: DEFAULT_HOLD_DAYS,
            min_bars: DEFAULT_MIN_BARS,
            breakout: BreakoutConfig::default(),
        }
    }
}

impl DiagnosisConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.history_days == 0 || self.history_days > MAX_HISTORY_DAYS {
            return Err(AnalysisError::invalid(format!(
                "history_days must be in 1..={MAX_HISTORY_DAYS}, got {}",
                self.history_days
            )));
        }
        if self.hold_days == 0 {
            return Err(AnalysisError::invalid("hold_days must be > 0"));
        }
        if self.min_bars == 0 {
            return Err(AnalysisError::invalid("min_bars must be > 0"));
        }
        self.breakout.validate()
    }
}

/// Everything the single-stock view shows for one instrument.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnosis {
    pub instrument_id: String,
    pub as_of: NaiveDate,
    pub status: SeriesStatus,
    pub series: Series,
    /// `None` unless the series is ready.
    pub indicators: Option<IndicatorSet>,
    pub signal_indices: Vec<usize>,
    pub backtest: BacktestResult,
}

impl Diagnosis {
    pub fn latest_bar(&self) -> Option<&Bar> {
        self.series.bars().last()
    }

    /// Dates of the bars that fired the breakout signal.
    pub fn signal_dates(&self) -> Vec<NaiveDate> {
        let bars = self.series.bars();
        self.signal_indices
            .iter()
            .filter_map(|&i| bars.get(i).map(|b| b.date))
            .collect()
    }

    /// `DataUnavailable` / `InsufficientHistory` for a series that is not ready.
    pub fn status_error(&self) -> Option<AnalysisError> {
        self.series.status_error()
    }
}

/// Diagnose `instrument_id` on history ending at `as_of`.
///
/// Configuration is validated before anything is fetched. A feed failure or
/// a short history is not an error: the result carries the series status
/// with no indicators and an empty backtest.
pub fn diagnose(
    feed: &dyn DataFeed,
    instrument_id: &str,
    as_of: NaiveDate,
    config: &DiagnosisConfig,
    params: &IndicatorParams,
) -> Result<Diagnosis, RunError> {
    let instrument_id = instrument_id.trim();
    if instrument_id.is_empty() {
        return Err(AnalysisError::invalid("instrument id is empty").into());
    }
    config.validate()?;
    params.validate()?;
    let detector = BreakoutDetector::new(config.breakout.clone())?;
    let evaluator = BacktestEvaluator::new(config.hold_days)?;

    let start = as_of - Duration::days(i64::from(config.history_days));
    let records = fetch_or_empty(feed, &FeedRequest::history(instrument_id, start, as_of));
    let series = normalize(
        instrument_id,
        &records,
        &NormalizeOptions {
            min_bars: config.min_bars,
        },
    );

    if !series.is_ready() {
        info!(
            instrument = instrument_id,
            status = ?series.status(),
            "series not ready, skipping analysis"
        );
        return Ok(Diagnosis {
            instrument_id: instrument_id.to_string(),
            as_of,
            status: series.status(),
            series,
            indicators: None,
            signal_indices: Vec::new(),
            backtest: BacktestResult::empty(config.hold_days),
        });
    }

    let indicators = IndicatorSet::compute(&series, params)?;
    let signal = detector.detect(series.bars());
    let backtest = evaluator.evaluate(&series, &signal.indices);

    debug!(
        instrument = instrument_id,
        bars = series.len(),
        signals = signal.count(),
        realizable = backtest.signal_count,
        "diagnosis computed"
    );
    info!(
        instrument = instrument_id,
        win_rate = backtest.win_rate,
        signal_count = backtest.signal_count,
        "diagnosis complete"
    );

    Ok(Diagnosis {
        instrument_id: instrument_id.to_string(),
        as_of,
        status: series.status(),
        series,
        indicators: Some(indicators),
        signal_indices: signal.indices,
        backtest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use twlab_core::data::SyntheticFeed;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn synthetic_diagnosis_is_ready() {
        let feed = SyntheticFeed::default();
        let diag = diagnose(
            &feed,
            "2330",
            d(2024, 6, 28),
            &DiagnosisConfig::default(),
            &IndicatorParams::default(),
        )
        .unwrap();
        assert_eq!(diag.status, SeriesStatus::Ready);
        let set = diag.indicators.as_ref().unwrap();
        assert_eq!(set.len(), diag.series.len());
        assert!(diag.backtest.signal_count <= diag.signal_indices.len());
        assert_eq!(diag.signal_dates().len(), diag.signal_indices.len());
        assert!(diag.status_error().is_none());
    }

    #[test]
    fn short_history_is_insufficient() {
        let feed = SyntheticFeed::default();
        let config = DiagnosisConfig {
            history_days: 10,
            ..Default::default()
        };
        let diag = diagnose(&feed, "2330", d(2024, 6, 28), &config, &IndicatorParams::default())
            .unwrap();
        assert!(matches!(diag.status, SeriesStatus::Insufficient { .. }));
        assert!(diag.indicators.is_none());
        assert_eq!(diag.backtest.signal_count, 0);
        assert!(matches!(
            diag.status_error(),
            Some(AnalysisError::InsufficientHistory { .. })
        ));
    }

    #[test]
    fn invalid_hold_days_fails_fast() {
        let feed = SyntheticFeed::default();
        let config = DiagnosisConfig {
            hold_days: 0,
            ..Default::default()
        };
        let err = diagnose(&feed, "2330", d(2024, 6, 28), &config, &IndicatorParams::default());
        assert!(matches!(
            err,
            Err(RunError::Analysis(AnalysisError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn blank_id_rejected() {
        let feed = SyntheticFeed::default();
        let err = diagnose(
            &feed,
            "  ",
            d(2024, 6, 28),
            &DiagnosisConfig::default(),
            &IndicatorParams::default(),
        );
        assert!(err.is_err());
    }
}
