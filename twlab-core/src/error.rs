//! Analysis error taxonomy.
//!
//! `DataUnavailable` and `InsufficientHistory` are normally surfaced as status
//! values next to an empty result (see `SeriesStatus`, `ScanStatus`).
//! `InvalidConfig` is the only variant returned as `Err`, and it is returned
//! before any fetch or computation starts.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("no data available for '{instrument}'")]
    DataUnavailable { instrument: String },

    #[error("insufficient history: {valid} valid bars, {required} required")]
    InsufficientHistory { valid: usize, required: usize },

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl AnalysisError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
