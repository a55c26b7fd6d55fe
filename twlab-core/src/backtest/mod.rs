//! Forward-hold backtest of signal indices.
//!
//! Each signal buys the next bar's open and sells the close `hold_days` bars
//! after the signal. Signals too close to the end of history are excluded,
//! not counted as losses.

pub mod evaluator;
pub mod trade;

pub use evaluator::{BacktestEvaluator, BacktestResult, DEFAULT_HOLD_DAYS};
pub use trade::TradeDetail;
