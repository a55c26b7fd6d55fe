//! Bar: one trading day of one instrument.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar after normalization.
///
/// Volume is in shares (FinMind `Trading_Volume`), not lots of 1,000.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Returns true if any price field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// A bar is tradable when it carries real prices. Non-positive open or
    /// close marks a halted or corrupt record.
    pub fn is_tradable(&self) -> bool {
        !self.is_void() && self.open > 0.0 && self.close > 0.0
    }

    /// Intraday change in percent: `(close - open) / open * 100`.
    pub fn intraday_change_pct(&self) -> f64 {
        (self.close - self.open) / self.open * 100.0
    }
}
