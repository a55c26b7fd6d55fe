//! BacktestEvaluator: converts signal indices into a win-rate/return summary.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::trade::TradeDetail;
use crate::domain::Series;
use crate::error::AnalysisError;

pub const DEFAULT_HOLD_DAYS: usize = 3;

/// Aggregate of all realizable signal trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub hold_days: usize,
    /// Percentage of winning trades, 0..=100, one decimal place.
    pub win_rate: f64,
    pub signal_count: usize,
    pub wins: usize,
    /// Mean `return_pct`; 0 when there are no trades.
    pub average_return: f64,
    pub best_return: f64,
    pub worst_return: f64,
    /// In signal order.
    pub details: Vec<TradeDetail>,
}

impl BacktestResult {
    pub fn empty(hold_days: usize) -> Self {
        Self {
            hold_days,
            win_rate: 0.0,
            signal_count: 0,
            wins: 0,
            average_return: 0.0,
            best_return: 0.0,
            worst_return: 0.0,
            details: Vec::new(),
        }
    }

    fn from_details(hold_days: usize, details: Vec<TradeDetail>) -> Self {
        let signal_count = details.len();
        if signal_count == 0 {
            return Self::empty(hold_days);
        }

        let wins = details.iter().filter(|t| t.win).count();
        let returns = details.iter().map(|t| t.return_pct);
        let average_return = returns.clone().sum::<f64>() / signal_count as f64;
        let best_return = returns.clone().fold(f64::NEG_INFINITY, f64::max);
        let worst_return = returns.fold(f64::INFINITY, f64::min);

        Self {
            hold_days,
            win_rate: round1(wins as f64 / signal_count as f64 * 100.0),
            signal_count,
            wins,
            average_return,
            best_return,
            worst_return,
            details,
        }
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacktestEvaluator {
    hold_days: usize,
}

impl BacktestEvaluator {
    pub fn new(hold_days: usize) -> Result<Self, AnalysisError> {
        if hold_days == 0 {
            return Err(AnalysisError::invalid("hold_days must be > 0"));
        }
        Ok(Self { hold_days })
    }

    pub fn hold_days(&self) -> usize {
        self.hold_days
    }

    /// Evaluate `signals` (bar indices into `series`).
    ///
    /// A series that is not ready yields `BacktestResult::empty`.
    pub fn evaluate(&self, series: &Series, signals: &[usize]) -> BacktestResult {
        if !series.is_ready() {
            return BacktestResult::empty(self.hold_days);
        }

        let bars = series.bars();
        let details: Vec<TradeDetail> = signals
            .iter()
            .filter_map(|&i| {
                let entry_bar = i.checked_add(1)?;
                let exit_bar = i.checked_add(self.hold_days)?;
                let (signal, entry, exit) = (bars.get(i)?, bars.get(entry_bar)?, bars.get(exit_bar)?);
                let (entry_price, exit_price) = (entry.open, exit.close);
                Some(TradeDetail {
                    signal_bar: i,
                    signal_date: signal.date,
                    entry_bar,
                    entry_date: entry.date,
                    entry_price,
                    exit_bar,
                    exit_date: exit.date,
                    exit_price,
                    return_pct: (exit_price / entry_price - 1.0) * 100.0,
                    win: exit_price > entry_price,
                })
            })
            .collect();

        let excluded = signals.len() - details.len();
        if excluded > 0 {
            debug!(
                instrument = series.instrument_id(),
                excluded,
                hold_days = self.hold_days,
                "signals too close to end of history"
            );
        }
        BacktestResult::from_details(self.hold_days, details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use chrono::NaiveDate;

    fn series_from(opens_closes: &[(f64, f64)], min_bars: usize) -> Series {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = opens_closes
            .iter()
            .enumerate()
            .map(|(i, &(open, close))| Bar {
                date: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close),
                low: open.min(close),
                close,
                volume: 1_000,
            })
            .collect();
        Series::new("TEST", bars, min_bars)
    }

    #[test]
    fn rejects_zero_hold() {
        assert!(matches!(
            BacktestEvaluator::new(0),
            Err(AnalysisError::InvalidConfig(_))
        ));
    }

    #[test]
    fn single_winning_trade() {
        // Signal at 1: buy open[2] = 100, sell close[4] = 110 with hold 3.
        let series = series_from(
            &[(100.0, 100.0), (100.0, 104.0), (100.0, 102.0), (102.0, 105.0), (105.0, 110.0)],
            1,
        );
        let result = BacktestEvaluator::new(3).unwrap().evaluate(&series, &[1]);
        assert_eq!(result.signal_count, 1);
        assert_eq!(result.wins, 1);
        assert_eq!(result.win_rate, 100.0);
        assert!((result.average_return - 10.0).abs() < 1e-9);

        let t = &result.details[0];
        assert_eq!((t.signal_bar, t.entry_bar, t.exit_bar), (1, 2, 4));
        assert_eq!(t.bars_held(), 3);
        assert_eq!(t.entry_date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    }

    #[test]
    fn unrealizable_signals_excluded() {
        let series = series_from(&[(10.0, 10.0); 6], 1);
        let eval = BacktestEvaluator::new(3).unwrap();
        // 2 + 3 = 5 is the last bar; 3 + 3 = 6 is out of range; 5 has no entry bar.
        let result = eval.evaluate(&series, &[2, 3, 5, 99]);
        assert_eq!(result.signal_count, 1);
        // close == open is not a win.
        assert_eq!(result.wins, 0);
        assert_eq!(result.win_rate, 0.0);
    }

    #[test]
    fn hold_one_is_same_bar_round_trip() {
        let series = series_from(&[(10.0, 10.0), (10.0, 9.0), (9.0, 9.9)], 1);
        let result = BacktestEvaluator::new(1).unwrap().evaluate(&series, &[1]);
        let t = &result.details[0];
        assert_eq!(t.entry_bar, t.exit_bar);
        assert!((t.return_pct - 10.0).abs() < 1e-9);
    }

    #[test]
    fn win_rate_rounds_to_one_decimal() {
        // Three trades, one win → 33.3.
        let series = series_from(
            &[
                (10.0, 10.0),
                (10.0, 11.0),
                (10.0, 9.0),
                (10.0, 9.0),
                (10.0, 9.0),
            ],
            1,
        );
        let result = BacktestEvaluator::new(1).unwrap().evaluate(&series, &[0, 2, 3]);
        assert_eq!(result.signal_count, 3);
        assert_eq!(result.win_rate, 33.3);
        assert!((result.best_return - 10.0).abs() < 1e-9);
        assert!((result.worst_return + 10.0).abs() < 1e-9);
    }

    #[test]
    fn no_signals_is_zero() {
        let series = series_from(&[(10.0, 10.0); 5], 1);
        let result = BacktestEvaluator::new(3).unwrap().evaluate(&series, &[]);
        assert_eq!(result, BacktestResult::empty(3));
    }

    #[test]
    fn insufficient_series_is_empty() {
        let series = series_from(&[(10.0, 11.0); 15], 20);
        let result = BacktestEvaluator::new(3).unwrap().evaluate(&series, &[2, 3]);
        assert_eq!(result.signal_count, 0);
        assert_eq!(result.win_rate, 0.0);
    }
}
