//! TwLab Core — bar normalization, indicators, breakout signal, backtest, market scan.
//!
//! This crate contains the computational heart of the dashboard:
//! - Domain types (bars, series, instruments)
//! - Data feed traits plus the FinMind and synthetic feeds
//! - Normalizer that turns raw provider records into a canonical series
//! - Indicator engine (SMA/EMA, RSI, MACD, Bollinger, stochastic K/D)
//! - Volume-price breakout detector and its forward-hold backtest
//! - Market-wide scanner with date lookback and ranking
//!
//! Everything except the feeds is pure: same input, same output, no I/O.

pub mod backtest;
pub mod data;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod scanner;
pub mod signal;

pub use error::AnalysisError;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: the types handed across the scanner's worker pool
    /// and the runner's cache are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Series>();
        require_sync::<domain::Series>();
        require_send::<domain::InstrumentInfo>();
        require_sync::<domain::InstrumentInfo>();

        require_send::<indicators::IndicatorSet>();
        require_sync::<indicators::IndicatorSet>();
        require_send::<signal::BreakoutSignal>();
        require_sync::<signal::BreakoutSignal>();
        require_send::<backtest::BacktestResult>();
        require_sync::<backtest::BacktestResult>();
        require_send::<scanner::ScanCandidate>();
        require_sync::<scanner::ScanCandidate>();
        require_send::<scanner::ScanOutcome>();
        require_sync::<scanner::ScanOutcome>();

        require_send::<data::SyntheticFeed>();
        require_sync::<data::SyntheticFeed>();
        require_send::<data::FinMindFeed>();
        require_sync::<data::FinMindFeed>();
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();
    }

    #[test]
    fn error_messages_name_the_problem() {
        let e = AnalysisError::InsufficientHistory {
            valid: 15,
            required: 20,
        };
        assert_eq!(
            e.to_string(),
            "insufficient history: 15 valid bars, 20 required"
        );
        let e = AnalysisError::InvalidConfig("hold_days must be > 0".into());
        assert!(e.to_string().contains("hold_days"));
    }
}
