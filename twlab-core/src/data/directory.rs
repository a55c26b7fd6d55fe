//! Instrument directories: id to display name (and capital) lookups.
//!
//! `StaticDirectory` is stored as TOML:
//!
//! ```toml
//! [[instruments]]
//! id = "2330"
//! display_name = "台積電"
//! industry = "半導體業"
//! capital = 259303804580
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::provider::{DataError, InstrumentDirectory, RawRecord};
use crate::domain::InstrumentInfo;

const ID_KEYS: &[&str] = &["stock_id", "id", "symbol", "code"];
const NAME_KEYS: &[&str] = &["stock_name", "display_name", "name"];
const INDUSTRY_KEYS: &[&str] = &["industry_category", "industry"];
const CAPITAL_KEYS: &[&str] = &["capital", "paid_in_capital"];

/// Directory backed by an in-memory list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticDirectory {
    pub instruments: Vec<InstrumentInfo>,
}

impl StaticDirectory {
    pub fn new(instruments: Vec<InstrumentInfo>) -> Self {
        Self { instruments }
    }

    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("read directory file: {e}"))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("parse directory TOML: {e}"))
    }

    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("serialize directory: {e}"))
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// A handful of TWSE large caps. Capital figures are approximate.
    pub fn default_tw() -> Self {
        let rows: [(&str, &str, &str, f64); 12] = [
            ("1301", "台塑", "塑膠工業", 63.7e9),
            ("2002", "中鋼", "鋼鐵工業", 157.7e9),
            ("2303", "聯電", "半導體業", 125.0e9),
            ("2308", "台達電", "電子零組件業", 26.0e9),
            ("2317", "鴻海", "其他電子業", 138.6e9),
            ("2330", "台積電", "半導體業", 259.3e9),
            ("2412", "中華電", "通信網路業", 77.6e9),
            ("2454", "聯發科", "半導體業", 16.0e9),
            ("2603", "長榮", "航運業", 21.2e9),
            ("2881", "富邦金", "金融保險業", 136.0e9),
            ("2882", "國泰金", "金融保險業", 146.7e9),
            ("3008", "大立光", "光電業", 1.34e9),
        ];
        Self {
            instruments: rows
                .iter()
                .map(|(id, name, industry, capital)| InstrumentInfo {
                    id: id.to_string(),
                    display_name: name.to_string(),
                    industry: Some(industry.to_string()),
                    capital: Some(*capital),
                })
                .collect(),
        }
    }
}

impl InstrumentDirectory for StaticDirectory {
    fn list_instruments(&self) -> Result<Vec<InstrumentInfo>, DataError> {
        Ok(self.instruments.clone())
    }
}

/// Build directory entries from raw provider records.
///
/// Records without an id are skipped. FinMind lists some instruments once
/// per industry category; the first listing wins. Output is sorted by id.
pub fn instruments_from_records(records: &[RawRecord]) -> Vec<InstrumentInfo> {
    let mut by_id: BTreeMap<String, InstrumentInfo> = BTreeMap::new();
    for record in records {
        let Some(id) = first_text(record, ID_KEYS) else {
            continue;
        };
        by_id.entry(id.clone()).or_insert_with(|| InstrumentInfo {
            display_name: first_text(record, NAME_KEYS).unwrap_or_else(|| id.clone()),
            industry: first_text(record, INDUSTRY_KEYS),
            capital: CAPITAL_KEYS.iter().find_map(|k| match record.get(*k)? {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.replace(',', "").trim().parse().ok(),
                _ => None,
            }),
            id,
        });
    }
    by_id.into_values().collect()
}

fn first_text(record: &RawRecord, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match record.get(*k)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
