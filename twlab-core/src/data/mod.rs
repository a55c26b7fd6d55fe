//! Data feeds and normalization.
//!
//! Feeds (`DataFeed`, `InstrumentDirectory`) are the only impure part of the
//! core. Everything they return passes through `normalize` before any
//! computation sees it.

pub mod circuit_breaker;
pub mod directory;
pub mod finmind;
pub mod normalize;
pub mod provider;
pub mod rate_limit;
pub mod synthetic;

pub use circuit_breaker::CircuitBreaker;
pub use directory::StaticDirectory;
pub use finmind::{FinMindConfig, FinMindFeed};
pub use normalize::{
    normalize, normalize_snapshot, normalize_with_report, Field, NormalizeOptions, NormalizeReport, SnapshotRow,
    DEFAULT_MIN_BARS, FIELD_ALIASES,
};
pub use provider::{
    fetch_or_empty, DataError, DataFeed, Dataset, FeedRequest, InstrumentDirectory, RawRecord,
};
pub use rate_limit::RateLimiter;
pub use synthetic::SyntheticFeed;
