//! Series: the ordered bar history of one instrument.
//!
//! A series is built fresh per query by the normalizer and never mutated
//! afterwards. Derived data (indicators, signals) lives in separate arrays
//! aligned to `bars`.

use crate::error::AnalysisError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::bar::Bar;

/// Whether a series can feed the indicator/backtest pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesStatus {
    /// Enough valid bars for the longest indicator window.
    Ready,
    /// The feed returned nothing usable.
    Unavailable,
    /// Some valid bars, but fewer than required.
    Insufficient { valid: usize, required: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    instrument_id: String,
    bars: Vec<Bar>,
    status: SeriesStatus,
}

impl Series {
    /// Build a series from bars in any order.
    ///
    /// Bars are sorted ascending by date; when a date repeats, the occurrence
    /// that came last in `bars` wins. Status is derived from `min_bars`.
    pub fn new(instrument_id: impl Into<String>, mut bars: Vec<Bar>, min_bars: usize) -> Self {
        // Stable sort keeps input order among equal dates.
        bars.sort_by_key(|b| b.date);
        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => deduped.push(bar),
            }
        }

        let status = if deduped.is_empty() {
            SeriesStatus::Unavailable
        } else if deduped.len() < min_bars {
            SeriesStatus::Insufficient {
                valid: deduped.len(),
                required: min_bars,
            }
        } else {
            SeriesStatus::Ready
        };
        Self {
            instrument_id: instrument_id.into(),
            bars: deduped,
            status,
        }
    }

    /// An explicit empty series for an instrument the feed had no data for.
    pub fn unavailable(instrument_id: impl Into<String>) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            bars: Vec::new(),
            status: SeriesStatus::Unavailable,
        }
    }

    pub fn instrument_id(&self) -> &str {
        &self.instrument_id
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn status(&self) -> SeriesStatus {
        self.status
    }

    pub fn is_ready(&self) -> bool {
        self.status == SeriesStatus::Ready
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.open).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume as f64).collect()
    }

    /// The status as an error, for callers that want to report why a
    /// series produced an empty result. `None` when ready.
    pub fn status_error(&self) -> Option<AnalysisError> {
        match self.status {
            SeriesStatus::Ready => None,
            SeriesStatus::Unavailable => Some(AnalysisError::DataUnavailable {
                instrument: self.instrument_id.clone(),
            }),
            SeriesStatus::Insufficient { valid, required } => {
                Some(AnalysisError::InsufficientHistory { valid, required })
            }
        }
    }
}
