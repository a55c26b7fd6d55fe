//! Signal detection: pure market-timing logic on bars only.
//!
//! Signals are deterministic for a given bar sequence and never look at
//! bars after the one being flagged.

pub mod breakout;

pub use breakout::{BreakoutConfig, BreakoutDetector, BreakoutSignal};
