//! Scan filter and ranking configuration.

use serde::{Deserialize, Serialize};

use crate::domain::CapitalTier;
use crate::error::AnalysisError;

pub const MAX_LOOKBACK_DAYS: u32 = 31;
pub const MAX_WORKERS: usize = 32;

/// Ranking metric, always descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankBy {
    #[default]
    Return,
    Volume,
}

impl RankBy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "return" | "pct_change" => Some(Self::Return),
            "volume" => Some(Self::Volume),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Minimum intraday change, in percent.
    pub min_return_pct: f64,
    /// Minimum traded volume, in shares.
    pub min_volume: f64,
    /// Calendar days to walk back from the requested date.
    pub lookback_days: u32,
    pub rank_by: RankBy,
    pub capital_tier: Option<CapitalTier>,
    pub limit: Option<usize>,
    /// Threads in the enrichment pool.
    pub workers: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_return_pct: 3.0,
            min_volume: 2_000_000.0,
            lookback_days: 7,
            rank_by: RankBy::Return,
            capital_tier: None,
            limit: None,
            workers: 10,
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !self.min_return_pct.is_finite() {
            return Err(AnalysisError::invalid("min_return_pct must be finite"));
        }
        if !self.min_volume.is_finite() || self.min_volume < 0.0 {
            return Err(AnalysisError::invalid(format!(
                "min_volume must be >= 0, got {}",
                self.min_volume
            )));
        }
        if self.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(AnalysisError::invalid(format!(
                "lookback_days must be in 0..={MAX_LOOKBACK_DAYS}, got {}",
                self.lookback_days
            )));
        }
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(AnalysisError::invalid(format!(
                "workers must be in 1..={MAX_WORKERS}, got {}",
                self.workers
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = ScanConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.lookback_days, 7);
        assert_eq!(c.workers, 10);
    }

    #[test]
    fn bounds() {
        let bad = [
            ScanConfig {
                lookback_days: 32,
                ..Default::default()
            },
            ScanConfig {
                workers: 0,
                ..Default::default()
            },
            ScanConfig {
                workers: 33,
                ..Default::default()
            },
            ScanConfig {
                min_volume: -1.0,
                ..Default::default()
            },
            ScanConfig {
                min_return_pct: f64::NAN,
                ..Default::default()
            },
        ];
        for c in bad {
            assert!(c.validate().is_err(), "{c:?}");
        }
        let edge = ScanConfig {
            lookback_days: 0,
            workers: 32,
            min_volume: 0.0,
            ..Default::default()
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn rank_by_parse() {
        assert_eq!(RankBy::parse("Volume"), Some(RankBy::Volume));
        assert_eq!(RankBy::parse("return"), Some(RankBy::Return));
        assert_eq!(RankBy::parse("sharpe"), None);
    }

    #[test]
    fn toml_section() {
        let c: ScanConfig =
            toml::from_str("rank_by = \"volume\"\ncapital_tier = \"large\"\nlimit = 20").unwrap();
        assert_eq!(c.rank_by, RankBy::Volume);
        assert_eq!(c.capital_tier, Some(CapitalTier::Large));
        assert_eq!(c.limit, Some(20));
        assert_eq!(c.min_return_pct, 3.0);
    }
}
