//! Indicator engine.
//!
//! Indicators are pure functions: bar history in, numeric series out, aligned
//! 1:1 with the input. Warm-up entries are `f64::NAN`; NaN in an input window
//! yields NaN in the output rather than a silently-wrong value.
//!
//! Multi-line indicators (MACD, Bollinger, Stochastic) expose one `Indicator`
//! instance per line, plus a `compute_all` that builds every line in one pass
//! for `IndicatorSet`.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stochastic;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use bollinger::{Bollinger, BollingerBand, BollingerSeries};
pub use ema::{ema_of_series, Ema};
pub use macd::{Macd, MacdLine, MacdSeries};
pub use rsi::{Rsi, EPSILON};
pub use sma::{sma_of_series, Sma};
pub use stochastic::{Stochastic, StochasticLine, StochasticSeries};

use crate::domain::{Bar, Series};
use crate::error::AnalysisError;

/// Trait for indicators.
///
/// `compute` returns a vector of the same length as `bars`; the first
/// `lookback()` entries are NaN. No value at index t may depend on bars after t.
pub trait Indicator: Send + Sync {
    /// Display name, e.g. `"sma_20"`.
    fn name(&self) -> &str;

    /// Number of bars consumed before the first defined value.
    fn lookback(&self) -> usize;

    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Windows and multipliers for the full indicator set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
    pub sma_windows: Vec<usize>,
    pub ema_windows: Vec<usize>,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_window: usize,
    pub bollinger_k: f64,
    pub stoch_period: usize,
    pub stoch_smoothing: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            sma_windows: vec![5, 10, 20, 60],
            ema_windows: vec![12, 26],
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_window: 20,
            bollinger_k: 2.0,
            stoch_period: 9,
            stoch_smoothing: 3,
        }
    }
}

impl IndicatorParams {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if let Some(w) = self.sma_windows.iter().chain(&self.ema_windows).find(|w| **w == 0) {
            return Err(AnalysisError::invalid(format!(
                "moving-average window must be >= 1, got {w}"
            )));
        }
        let windows = [
            ("rsi_period", self.rsi_period),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("stoch_period", self.stoch_period),
            ("stoch_smoothing", self.stoch_smoothing),
        ];
        for (name, value) in windows {
            if value == 0 {
                return Err(AnalysisError::invalid(format!("{name} must be >= 1")));
            }
        }
        if self.macd_fast >= self.macd_slow {
            return Err(AnalysisError::invalid(format!(
                "macd_fast ({}) must be less than macd_slow ({})",
                self.macd_fast, self.macd_slow
            )));
        }
        if self.bollinger_window < 2 {
            return Err(AnalysisError::invalid(
                "bollinger_window must be >= 2 (sample standard deviation)",
            ));
        }
        if !self.bollinger_k.is_finite() || self.bollinger_k <= 0.0 {
            return Err(AnalysisError::invalid(format!(
                "bollinger_k must be positive, got {}",
                self.bollinger_k
            )));
        }
        Ok(())
    }
}

/// Every indicator for one series. All vectors have the series length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSet {
    pub params: IndicatorParams,
    pub sma: BTreeMap<usize, Vec<f64>>,
    pub ema: BTreeMap<usize, Vec<f64>>,
    pub rsi: Vec<f64>,
    pub macd: MacdSeries,
    pub bollinger: BollingerSeries,
    pub stochastic: StochasticSeries,
}

impl IndicatorSet {
    /// Compute the full set. Parameters are validated first; a short or empty
    /// series simply produces NaN-filled (or empty) vectors.
    pub fn compute(series: &Series, params: &IndicatorParams) -> Result<Self, AnalysisError> {
        params.validate()?;
        let bars = series.bars();

        let sma = params
            .sma_windows
            .iter()
            .map(|&w| (w, Sma::new(w).compute(bars)))
            .collect();
        let ema = params
            .ema_windows
            .iter()
            .map(|&w| (w, Ema::new(w).compute(bars)))
            .collect();

        Ok(Self {
            params: params.clone(),
            sma,
            ema,
            rsi: Rsi::new(params.rsi_period).compute(bars),
            macd: Macd::new(params.macd_fast, params.macd_slow, params.macd_signal)
                .compute_all(bars),
            bollinger: Bollinger::new(params.bollinger_window, params.bollinger_k)
                .compute_all(bars),
            stochastic: Stochastic::new(params.stoch_period, params.stoch_smoothing)
                .compute_all(bars),
        })
    }

    /// Number of bars the set covers.
    pub fn len(&self) -> usize {
        self.rsi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rsi.is_empty()
    }

    /// Named readings at bar `index`, skipping undefined (NaN) values.
    pub fn readings_at(&self, index: usize) -> Vec<(String, f64)> {
        let mut out = Vec::new();
        let mut push = |name: String, values: &[f64]| {
            if let Some(v) = values.get(index).copied().filter(|v| !v.is_nan()) {
                out.push((name, v));
            }
        };

        for (w, values) in &self.sma {
            push(format!("sma_{w}"), values);
        }
        for (w, values) in &self.ema {
            push(format!("ema_{w}"), values);
        }
        push(format!("rsi_{}", self.params.rsi_period), &self.rsi);
        push("macd_dif".into(), &self.macd.dif);
        push("macd_dea".into(), &self.macd.dea);
        push("macd_histogram".into(), &self.macd.histogram);
        push("bollinger_upper".into(), &self.bollinger.upper);
        push("bollinger_mid".into(), &self.bollinger.mid);
        push("bollinger_lower".into(), &self.bollinger.lower);
        push("bollinger_percent_b".into(), &self.bollinger.percent_b);
        push("bollinger_bandwidth".into(), &self.bollinger.bandwidth);
        push("stoch_rsv".into(), &self.stochastic.rsv);
        push("stoch_k".into(), &self.stochastic.k);
        push("stoch_d".into(), &self.stochastic.d);
        out
    }

    /// Readings at the last bar.
    pub fn latest(&self) -> Vec<(String, f64)> {
        match self.len() {
            0 => Vec::new(),
            n => self.readings_at(n - 1),
        }
    }
}

/// Create synthetic bars from close prices for testing.
///
/// open = previous close (or close for the first bar), high/low = max/min of
/// open and close ± 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
