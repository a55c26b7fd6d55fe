//! Data feed traits and structured error types.
//!
//! `DataFeed` abstracts over data sources (FinMind, synthetic, cached
//! wrappers) so the scanner and runner can be driven by mocks in tests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::domain::InstrumentInfo;

/// One raw record as returned by a provider: field names and value types
/// vary by provider and are resolved by the normalizer.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Structured error types for feed operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("data error: {0}")]
    Other(String),
}

/// Datasets the core knows how to ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dataset {
    /// Daily OHLCV bars. Without an instrument id: every instrument for the
    /// requested date range (whole-market snapshot).
    DailyPrice,
    /// Listed instruments and their names.
    InstrumentInfo,
}

impl Dataset {
    /// Dataset name on the FinMind API.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DailyPrice => "TaiwanStockPrice",
            Self::InstrumentInfo => "TaiwanStockInfo",
        }
    }
}

/// `fetch(dataset_name, instrument_id?, start_date, end_date?)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedRequest {
    pub dataset: Dataset,
    pub instrument_id: Option<String>,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl FeedRequest {
    /// Daily bars of one instrument over `[start, end]`.
    pub fn history(instrument_id: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            dataset: Dataset::DailyPrice,
            instrument_id: Some(instrument_id.into()),
            start,
            end: Some(end),
        }
    }

    /// All instruments' bars for a single calendar date.
    pub fn snapshot(date: NaiveDate) -> Self {
        Self {
            dataset: Dataset::DailyPrice,
            instrument_id: None,
            start: date,
            end: Some(date),
        }
    }
}

/// Trait for daily bar sources.
///
/// Implementations own their transport concerns (rate limiting, retries).
/// Callers should go through `fetch_or_empty` so that a failed or malformed
/// response never escapes as an error.
pub trait DataFeed: Send + Sync {
    /// Human-readable name of this feed.
    fn name(&self) -> &str;

    fn fetch(&self, request: &FeedRequest) -> Result<Vec<RawRecord>, DataError>;
}

/// Source of instrument labels for scan results.
pub trait InstrumentDirectory: Send + Sync {
    fn list_instruments(&self) -> Result<Vec<InstrumentInfo>, DataError>;
}

/// Fetch, treating every failure as "no data".
pub fn fetch_or_empty(feed: &dyn DataFeed, request: &FeedRequest) -> Vec<RawRecord> {
    match feed.fetch(request) {
        Ok(records) => records,
        Err(e) => {
            warn!(
                feed = feed.name(),
                dataset = request.dataset.name(),
                instrument = request.instrument_id.as_deref().unwrap_or("*"),
                start = %request.start,
                error = %e,
                "fetch failed, treating as no data"
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingFeed;

    impl DataFeed for FailingFeed {
        fn name(&self) -> &str {
            "failing"
        }

        fn fetch(&self, _request: &FeedRequest) -> Result<Vec<RawRecord>, DataError> {
            Err(DataError::RateLimited {
                retry_after_secs: 60,
            })
        }
    }

    #[test]
    fn fetch_or_empty_swallows_errors() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let records = fetch_or_empty(&FailingFeed, &FeedRequest::snapshot(date));
        assert!(records.is_empty());
    }

    #[test]
    fn request_constructors() {
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let h = FeedRequest::history("2330", d1, d2);
        assert_eq!(h.instrument_id.as_deref(), Some("2330"));
        assert_eq!(h.end, Some(d2));

        let s = FeedRequest::snapshot(d2);
        assert_eq!(s.instrument_id, None);
        assert_eq!(s.start, d2);
        assert_eq!(s.end, Some(d2));
    }

    #[test]
    fn dataset_names() {
        assert_eq!(Dataset::DailyPrice.name(), "TaiwanStockPrice");
        assert_eq!(Dataset::InstrumentInfo.name(), "TaiwanStockInfo");
    }
}
