//! Bollinger Bands.
//!
//! - mid: SMA(close, window)
//! - upper / lower: mid ± k × sample stddev (N − 1) of the same window
//! - percent_b: (close − lower) / (upper − lower)
//! - bandwidth: (upper − lower) / mid
//!
//! percent_b and bandwidth are NaN when the band has zero width.
//! Lookback: window − 1.

use serde::Serialize;

use super::sma::sma_of_series;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
    PercentB,
    Bandwidth,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BollingerSeries {
    pub upper: Vec<f64>,
    pub mid: Vec<f64>,
    pub lower: Vec<f64>,
    pub percent_b: Vec<f64>,
    pub bandwidth: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    window: usize,
    k: f64,
    band: BollingerBand,
    name: String,
}

impl Bollinger {
    /// `compute` on this instance yields the middle band.
    ///
    /// # Panics
    /// If `window < 2`.
    pub fn new(window: usize, k: f64) -> Self {
        Self::band(window, k, BollingerBand::Middle)
    }

    pub fn band(window: usize, k: f64, band: BollingerBand) -> Self {
        assert!(window >= 2, "Bollinger window must be >= 2");
        let label = match band {
            BollingerBand::Upper => "upper",
            BollingerBand::Middle => "mid",
            BollingerBand::Lower => "lower",
            BollingerBand::PercentB => "percent_b",
            BollingerBand::Bandwidth => "bandwidth",
        };
        Self {
            window,
            k,
            band,
            name: format!("bollinger_{label}_{window}_{k}"),
        }
    }

    pub fn compute_all(&self, bars: &[Bar]) -> BollingerSeries {
        let n = bars.len();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let mid = sma_of_series(&closes, self.window);

        let mut out = BollingerSeries {
            upper: vec![f64::NAN; n],
            mid: mid.clone(),
            lower: vec![f64::NAN; n],
            percent_b: vec![f64::NAN; n],
            bandwidth: vec![f64::NAN; n],
        };

        for i in 0..n {
            let m = mid[i];
            if m.is_nan() {
                continue;
            }
            let window = &closes[i + 1 - self.window..=i];
            let var = window.iter().map(|c| (c - m).powi(2)).sum::<f64>()
                / (self.window - 1) as f64;
            let half_width = self.k * var.sqrt();
            let (upper, lower) = (m + half_width, m - half_width);
            out.upper[i] = upper;
            out.lower[i] = lower;

            let width = upper - lower;
            if width > 0.0 {
                out.percent_b[i] = (closes[i] - lower) / width;
                if m != 0.0 {
                    out.bandwidth[i] = width / m;
                }
            }
        }
        out
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let all = self.compute_all(bars);
        match self.band {
            BollingerBand::Upper => all.upper,
            BollingerBand::Middle => all.mid,
            BollingerBand::Lower => all.lower,
            BollingerBand::PercentB => all.percent_b,
            BollingerBand::Bandwidth => all.bandwidth,
        }
    }
}
