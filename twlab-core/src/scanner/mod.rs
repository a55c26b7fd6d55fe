//! Market-wide scanner.
//!
//! Resolves the most recent date with a non-empty snapshot, filters for
//! strong volume-price movers, labels them from the instrument directory and
//! ranks them.

pub mod config;
pub mod market;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use config::{RankBy, ScanConfig, MAX_LOOKBACK_DAYS, MAX_WORKERS};
pub use market::MarketScanner;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanCandidate {
    pub instrument_id: String,
    pub display_name: String,
    pub close: f64,
    /// (close − open) / open × 100.
    pub pct_change: f64,
    pub volume: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanStatus {
    /// Snapshot found for `date` (possibly earlier than requested).
    Found { date: NaiveDate },
    /// Every date in the lookback window came back empty.
    NoDataFound {
        searched_from: NaiveDate,
        days_searched: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub requested: NaiveDate,
    pub status: ScanStatus,
    /// Instruments in the resolved snapshot.
    pub snapshot_size: usize,
    /// Candidates that passed every filter, before `limit`.
    pub matched: usize,
    /// Ranked, after `limit`.
    pub candidates: Vec<ScanCandidate>,
}

impl ScanOutcome {
    pub fn resolved_date(&self) -> Option<NaiveDate> {
        match self.status {
            ScanStatus::Found { date } => Some(date),
            ScanStatus::NoDataFound { .. } => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
