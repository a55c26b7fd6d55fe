//! Volume-price breakout.
//!
//! Bar `i` fires when it gains more than `return_threshold` over the previous
//! close on volume above `volume_multiple` times the mean volume of the
//! `volume_window` bars before it. The current bar is not part of its own
//! average, so the first `volume_window` bars can never fire.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::error::AnalysisError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakoutConfig {
    /// Fractional close-to-close gain, e.g. 0.03 for 3%.
    pub return_threshold: f64,
    pub volume_multiple: f64,
    pub volume_window: usize,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self {
            return_threshold: 0.03,
            volume_multiple: 2.0,
            volume_window: 5,
        }
    }
}

impl BreakoutConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.volume_window == 0 {
            return Err(AnalysisError::invalid("volume_window must be >= 1"));
        }
        if !self.volume_multiple.is_finite() || self.volume_multiple <= 0.0 {
            return Err(AnalysisError::invalid(format!(
                "volume_multiple must be positive, got {}",
                self.volume_multiple
            )));
        }
        if !self.return_threshold.is_finite()
            || self.return_threshold <= -1.0
            || self.return_threshold >= 1.0
        {
            return Err(AnalysisError::invalid(format!(
                "return_threshold must be within (-1, 1), got {}",
                self.return_threshold
            )));
        }
        Ok(())
    }
}

/// Per-bar flags plus the indices where they are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BreakoutSignal {
    pub flags: Vec<bool>,
    /// Strictly increasing.
    pub indices: Vec<usize>,
}

impl BreakoutSignal {
    pub fn count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Validated breakout rule.
#[derive(Debug, Clone)]
pub struct BreakoutDetector {
    config: BreakoutConfig,
}

impl BreakoutDetector {
    pub fn new(config: BreakoutConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BreakoutConfig {
        &self.config
    }

    /// Whether bar `i` is a breakout. Out-of-range and warm-up indices are not.
    pub fn evaluate(&self, bars: &[Bar], i: usize) -> bool {
        let w = self.config.volume_window;
        if i < w || i >= bars.len() {
            return false;
        }

        let prev_close = bars[i - 1].close;
        if prev_close.is_nan() || prev_close <= 0.0 {
            return false;
        }
        let pct_change = bars[i].close / prev_close - 1.0;

        let vol_avg = bars[i - w..i].iter().map(|b| b.volume as f64).sum::<f64>() / w as f64;

        pct_change > self.config.return_threshold
            && bars[i].volume as f64 > vol_avg * self.config.volume_multiple
    }

    pub fn detect(&self, bars: &[Bar]) -> BreakoutSignal {
        let flags: Vec<bool> = (0..bars.len()).map(|i| self.evaluate(bars, i)).collect();
        let indices = flags
            .iter()
            .enumerate()
            .filter_map(|(i, &f)| f.then_some(i))
            .collect();
        BreakoutSignal { flags, indices }
    }
}
