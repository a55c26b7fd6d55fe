//! Instrument metadata from the instrument directory.

use serde::{Deserialize, Serialize};

/// One listed instrument as reported by the instrument directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentInfo {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub industry: Option<String>,
    /// Paid-in capital in TWD, when the directory knows it.
    #[serde(default)]
    pub capital: Option<f64>,
}

impl InstrumentInfo {
    pub fn tier(&self) -> Option<CapitalTier> {
        self.capital.map(CapitalTier::from_capital)
    }
}

/// Capitalization tier on paid-in capital.
///
/// - Large: >= 10 billion TWD
/// - Mid: >= 1 billion TWD
/// - Small: below that
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapitalTier {
    Large,
    Mid,
    Small,
}

impl CapitalTier {
    pub const LARGE_THRESHOLD: f64 = 10_000_000_000.0;
    pub const MID_THRESHOLD: f64 = 1_000_000_000.0;

    pub fn from_capital(capital: f64) -> Self {
        if capital >= Self::LARGE_THRESHOLD {
            Self::Large
        } else if capital >= Self::MID_THRESHOLD {
            Self::Mid
        } else {
            Self::Small
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "large" => Some(Self::Large),
            "mid" | "medium" => Some(Self::Mid),
            "small" => Some(Self::Small),
            _ => None,
        }
    }
}
