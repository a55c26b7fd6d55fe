//! Domain types for TwLab

pub mod bar;
pub mod instrument;
pub mod series;

pub use bar::Bar;
pub use instrument::{CapitalTier, InstrumentInfo};
pub use series::{Series, SeriesStatus};

/// Instrument identifier (TWSE/TPEx stock code, e.g. "2330").
pub type InstrumentId = String;
