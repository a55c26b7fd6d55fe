//! Stochastic oscillator (KD).
//!
//! RSV = (close − lowest low) / (highest high − lowest low) × 100 over
//! `period` bars; NaN when the range is zero.
//! K = smoothed RSV, D = smoothed K, both exponential with
//! alpha = 1 / smoothing, seeded with the first defined input.
//! Lookback: period − 1 for every line.

use serde::Serialize;

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StochasticLine {
    Rsv,
    K,
    D,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StochasticSeries {
    pub rsv: Vec<f64>,
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Stochastic {
    period: usize,
    smoothing: usize,
    line: StochasticLine,
    name: String,
}

impl Stochastic {
    /// `compute` on this instance yields K.
    ///
    /// # Panics
    /// If `period` or `smoothing` is zero.
    pub fn new(period: usize, smoothing: usize) -> Self {
        Self::line(period, smoothing, StochasticLine::K)
    }

    pub fn line(period: usize, smoothing: usize, line: StochasticLine) -> Self {
        assert!(period >= 1, "stochastic period must be >= 1");
        assert!(smoothing >= 1, "stochastic smoothing must be >= 1");
        let label = match line {
            StochasticLine::Rsv => "rsv",
            StochasticLine::K => "k",
            StochasticLine::D => "d",
        };
        Self {
            period,
            smoothing,
            line,
            name: format!("stoch_{label}_{period}_{smoothing}"),
        }
    }

    pub fn compute_all(&self, bars: &[Bar]) -> StochasticSeries {
        let rsv = self.rsv(bars);
        let alpha = 1.0 / self.smoothing as f64;
        let k = smooth(&rsv, alpha);
        let d = smooth(&k, alpha);
        StochasticSeries { rsv, k, d }
    }

    fn rsv(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }
        for i in (self.period - 1)..n {
            let window = &bars[i + 1 - self.period..=i];
            let highest = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
            let lowest = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
            let range = highest - lowest;
            if range > 0.0 && range.is_finite() {
                result[i] = (bars[i].close - lowest) / range * 100.0;
            }
        }
        result
    }
}

/// Exponential smoothing that steps over NaN inputs without resetting.
fn smooth(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut state: Option<f64> = None;
    values
        .iter()
        .map(|&v| {
            if v.is_nan() {
                return f64::NAN;
            }
            let next = match state {
                None => v,
                Some(prev) => alpha * v + (1.0 - alpha) * prev,
            };
            state = Some(next);
            next
        })
        .collect()
}

impl Indicator for Stochastic {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let all = self.compute_all(bars);
        match self.line {
            StochasticLine::Rsv => all.rsv,
            StochasticLine::K => all.k,
            StochasticLine::D => all.d,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn rsv_known_value() {
        // make_bars pads high/low by 1.0 around open/close.
        // Window of 3 ending at index 2: closes 10, 12, 11 → opens 10, 10, 12
        // highs 11, 13, 13; lows 9, 9, 10 → HH 13, LL 9.
        let bars = make_bars(&[10.0, 12.0, 11.0]);
        let all = Stochastic::new(3, 3).compute_all(&bars);
        assert!(all.rsv[1].is_nan());
        assert_approx(all.rsv[2], (11.0 - 9.0) / 4.0 * 100.0, DEFAULT_EPSILON);
        // First defined input seeds both K and D.
        assert_approx(all.k[2], all.rsv[2], DEFAULT_EPSILON);
        assert_approx(all.d[2], all.rsv[2], DEFAULT_EPSILON);
    }

    #[test]
    fn smoothing_recurrence() {
        let out = smooth(&[f64::NAN, 30.0, 60.0, 90.0], 1.0 / 3.0);
        assert!(out[0].is_nan());
        assert_approx(out[1], 30.0, DEFAULT_EPSILON);
        assert_approx(out[2], 40.0, DEFAULT_EPSILON);
        assert_approx(out[3], 40.0 + (90.0 - 40.0) / 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn nan_gap_keeps_state() {
        let out = smooth(&[30.0, f64::NAN, 60.0], 0.5);
        assert_approx(out[0], 30.0, DEFAULT_EPSILON);
        assert!(out[1].is_nan());
        assert_approx(out[2], 45.0, DEFAULT_EPSILON);
    }

    #[test]
    fn zero_range_is_nan() {
        let bars: Vec<Bar> = make_bars(&[10.0; 5])
            .into_iter()
            .map(|mut b| {
                b.high = 10.0;
                b.low = 10.0;
                b
            })
            .collect();
        let all = Stochastic::new(3, 3).compute_all(&bars);
        assert!(all.rsv.iter().all(|v| v.is_nan()));
        assert!(all.k.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn lines_stay_in_0_100() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 + ((i * 13) % 17) as f64).collect();
        let all = Stochastic::new(9, 3).compute_all(&make_bars(&closes));
        for v in all.rsv.iter().chain(&all.k).chain(&all.d).filter(|v| !v.is_nan()) {
            assert!((0.0..=100.0).contains(v));
        }
        assert_eq!(Stochastic::line(9, 3, StochasticLine::D).lookback(), 8);
    }
}
