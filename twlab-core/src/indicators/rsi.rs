//! Relative Strength Index (RSI).
//!
//! Simple trailing means of gains and losses over the last `period`
//! close-to-close changes (not Wilder smoothing):
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss).
//! Lookback: period.
//!
//! A window with no losses divides by `EPSILON` instead of zero, so a window
//! of pure gains reads ~100 and a flat window reads 0.

use super::Indicator;
use crate::domain::Bar;

/// Denominator used when the average loss is exactly zero.
pub const EPSILON: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    /// # Panics
    /// If `period` is zero.
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n <= self.period {
            return result;
        }

        // changes[i] = close[i] - close[i-1]; changes[0] is undefined.
        let changes: Vec<f64> = std::iter::once(f64::NAN)
            .chain(bars.windows(2).map(|w| w[1].close - w[0].close))
            .collect();

        for i in self.period..n {
            let window = &changes[i + 1 - self.period..=i];
            if window.iter().any(|c| c.is_nan()) {
                continue;
            }
            let gains: f64 = window.iter().filter(|c| **c > 0.0).sum();
            let losses: f64 = window.iter().filter(|c| **c < 0.0).map(|c| -c).sum();
            result[i] = rsi_value(gains / self.period as f64, losses / self.period as f64);
        }
        result
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    let denominator = if avg_loss == 0.0 { EPSILON } else { avg_loss };
    let rs = avg_gain / denominator;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}
