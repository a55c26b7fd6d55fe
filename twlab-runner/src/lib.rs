//! TwLab Runner — configuration, fetch cache, diagnosis and scan pipelines, export.
//!
//! This crate builds on `twlab-core` to provide:
//! - TOML application config with env overrides and fail-fast validation
//! - A caller-owned TTL cache and a caching `DataFeed` wrapper
//! - The single-stock diagnosis pipeline (normalize → indicators → breakout → backtest)
//! - The market scan pipeline
//! - CSV and JSON export

pub mod cache;
pub mod config;
pub mod diagnose;
pub mod export;
pub mod scan;

pub use cache::{CacheKey, CachedFeed, FetchCache};
pub use config::{AppConfig, CacheSettings, ConfigError, ConfigId, DirectorySettings, FeedSettings};
pub use diagnose::{diagnose, Diagnosis, DiagnosisConfig, RunError};
pub use export::{export_candidates_csv, export_json, export_trades_csv};
pub use scan::{scan, scan_configured};
