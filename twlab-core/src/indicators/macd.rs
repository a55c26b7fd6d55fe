//! MACD (Moving Average Convergence/Divergence).
//!
//! dif = EMA(close, fast) - EMA(close, slow)
//! dea = EMA(dif, signal)
//! histogram = dif - dea
//!
//! Lookback: slow - 1 for dif, slow + signal - 2 for dea and histogram.

use serde::Serialize;

use super::ema::ema_of_series;
use super::Indicator;
use crate::domain::Bar;

/// Which MACD line an `Indicator` instance yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdLine {
    Dif,
    Dea,
    Histogram,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacdSeries {
    pub dif: Vec<f64>,
    pub dea: Vec<f64>,
    pub histogram: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    line: MacdLine,
    name: String,
}

impl Macd {
    /// All three lines via `compute_all`; `compute` yields the histogram.
    ///
    /// # Panics
    /// If any window is zero or `fast >= slow`.
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        Self::line(fast, slow, signal, MacdLine::Histogram)
    }

    pub fn line(fast: usize, slow: usize, signal: usize, line: MacdLine) -> Self {
        assert!(fast >= 1 && signal >= 1, "MACD windows must be >= 1");
        assert!(fast < slow, "MACD fast window must be shorter than slow");
        let suffix = match line {
            MacdLine::Dif => "dif",
            MacdLine::Dea => "dea",
            MacdLine::Histogram => "histogram",
        };
        Self {
            fast,
            slow,
            signal,
            line,
            name: format!("macd_{suffix}_{fast}_{slow}_{signal}"),
        }
    }

    pub fn compute_all(&self, bars: &[Bar]) -> MacdSeries {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let fast = ema_of_series(&closes, self.fast);
        let slow = ema_of_series(&closes, self.slow);

        // NaN - x and x - NaN are both NaN, so dif is undefined until slow is.
        let dif: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let dea = ema_of_series(&dif, self.signal);
        let histogram = dif.iter().zip(&dea).map(|(d, e)| d - e).collect();

        MacdSeries {
            dif,
            dea,
            histogram,
        }
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        match self.line {
            MacdLine::Dif => self.slow - 1,
            MacdLine::Dea | MacdLine::Histogram => self.slow + self.signal - 2,
        }
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let all = self.compute_all(bars);
        match self.line {
            MacdLine::Dif => all.dif,
            MacdLine::Dea => all.dea,
            MacdLine::Histogram => all.histogram,
        }
    }
}
