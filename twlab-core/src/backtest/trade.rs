//! TradeDetail: one realized signal trade.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeDetail {
    // ── Traceability ──
    pub signal_bar: usize,
    pub signal_date: NaiveDate,

    // ── Entry: open of the bar after the signal ──
    pub entry_bar: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,

    // ── Exit: close `hold_days` bars after the signal ──
    pub exit_bar: usize,
    pub exit_date: NaiveDate,
    pub exit_price: f64,

    /// (exit / entry − 1) × 100.
    pub return_pct: f64,
    /// exit_price > entry_price.
    pub win: bool,
}

impl TradeDetail {
    /// Bars from entry to exit, inclusive.
    pub fn bars_held(&self) -> usize {
        self.exit_bar + 1 - self.entry_bar
    }

    pub fn calendar_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }
}
