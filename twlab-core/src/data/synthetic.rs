//! Synthetic feed for offline development and tests.
//!
//! Produces a deterministic random walk per instrument (seeded from the id with
//! BLAKE3), with occasional volume-price surges so the breakout detector has
//! something to find. Records use FinMind field names (`max`, `min`,
//! `Trading_Volume`) so they exercise the same normalization path as live data.
//! Weekends have no bars.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use super::directory::StaticDirectory;
use super::provider::{DataError, DataFeed, Dataset, FeedRequest, InstrumentDirectory, RawRecord};
use crate::domain::InstrumentInfo;

#[derive(Debug, Clone)]
pub struct SyntheticFeed {
    directory: StaticDirectory,
    epoch: NaiveDate,
    surge_probability: f64,
}

impl Default for SyntheticFeed {
    fn default() -> Self {
        Self::new(StaticDirectory::default_tw())
    }
}

impl SyntheticFeed {
    pub fn new(directory: StaticDirectory) -> Self {
        Self {
            directory,
            // Walks always start here so any date range sees the same prices.
            epoch: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or(NaiveDate::MIN),
            surge_probability: 0.05,
        }
    }

    pub fn with_surge_probability(mut self, p: f64) -> Self {
        self.surge_probability = p.clamp(0.0, 1.0);
        self
    }

    fn is_trading_day(date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Records for `instrument_id` on trading days within `[start, end]`.
    fn walk(&self, instrument_id: &str, start: NaiveDate, end: NaiveDate) -> Vec<RawRecord> {
        if instrument_id.is_empty() || end < self.epoch || end < start {
            return Vec::new();
        }

        let seed: [u8; 32] = *blake3::hash(instrument_id.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);
        let mut price: f64 = rng.gen_range(20.0..600.0);
        let base_volume: f64 = rng.gen_range(500_000.0..5_000_000.0);

        let mut records = Vec::new();
        let mut current = self.epoch;
        while current <= end {
            if !Self::is_trading_day(current) {
                current += chrono::Duration::days(1);
                continue;
            }

            let surge = rng.gen_bool(self.surge_probability);
            let daily_return: f64 = if surge {
                rng.gen_range(0.04..0.09)
            } else {
                rng.gen_range(-0.025..0.025)
            };
            let volume_factor: f64 = if surge {
                rng.gen_range(3.0..5.0)
            } else {
                rng.gen_range(0.6..1.4)
            };

            let open = price * (1.0 + rng.gen_range(-0.005..0.005));
            let close = (price * (1.0 + daily_return)).max(0.01);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume = (base_volume * volume_factor).round() as u64;

            if current >= start {
                let row = json!({
                    "date": current.to_string(),
                    "stock_id": instrument_id,
                    "Trading_Volume": volume,
                    "Trading_money": (volume as f64 * close).round() as u64,
                    "open": round2(open),
                    "max": round2(high),
                    "min": round2(low),
                    "close": round2(close),
                    "spread": round2(close - price),
                    "Trading_turnover": volume / 1_000,
                });
                if let serde_json::Value::Object(map) = row {
                    records.push(map);
                }
            }

            price = close;
            current += chrono::Duration::days(1);
        }
        records
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl DataFeed for SyntheticFeed {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, request: &FeedRequest) -> Result<Vec<RawRecord>, DataError> {
        match request.dataset {
            Dataset::InstrumentInfo => Ok(self
                .directory
                .instruments
                .iter()
                .filter_map(|i| {
                    json!({"stock_id": i.id, "stock_name": i.display_name})
                        .as_object()
                        .cloned()
                })
                .collect()),
            Dataset::DailyPrice => {
                let end = request.end.unwrap_or(request.start);
                match &request.instrument_id {
                    Some(id) => Ok(self.walk(id, request.start, end)),
                    None => Ok(self
                        .directory
                        .instruments
                        .iter()
                        .flat_map(|i| self.walk(&i.id, request.start, end))
                        .collect()),
                }
            }
        }
    }
}

impl InstrumentDirectory for SyntheticFeed {
    fn list_instruments(&self) -> Result<Vec<InstrumentInfo>, DataError> {
        self.directory.list_instruments()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::normalize::{normalize, normalize_snapshot, NormalizeOptions};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn deterministic_per_instrument() {
        let feed = SyntheticFeed::default();
        let req = FeedRequest::history("2330", d(2024, 1, 1), d(2024, 3, 31));
        assert_eq!(feed.fetch(&req).unwrap(), feed.fetch(&req).unwrap());
    }

    #[test]
    fn range_does_not_change_prices() {
        let feed = SyntheticFeed::default();
        let wide = feed
            .fetch(&FeedRequest::history("2330", d(2024, 1, 1), d(2024, 3, 31)))
            .unwrap();
        let narrow = feed
            .fetch(&FeedRequest::history("2330", d(2024, 3, 1), d(2024, 3, 31)))
            .unwrap();
        assert_eq!(wide[wide.len() - narrow.len()..], narrow[..]);
    }

    #[test]
    fn weekend_snapshot_is_empty() {
        let feed = SyntheticFeed::default();
        // 2024-03-02 is a Saturday.
        let rows = feed.fetch(&FeedRequest::snapshot(d(2024, 3, 2))).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn weekday_snapshot_covers_directory() {
        let feed = SyntheticFeed::default();
        let rows = feed.fetch(&FeedRequest::snapshot(d(2024, 3, 1))).unwrap();
        assert_eq!(normalize_snapshot(&rows).len(), 12);
    }

    #[test]
    fn history_normalizes_ready() {
        let feed = SyntheticFeed::default();
        let rows = feed
            .fetch(&FeedRequest::history("2330", d(2024, 1, 1), d(2024, 6, 30)))
            .unwrap();
        let series = normalize("2330", &rows, &NormalizeOptions::default());
        assert!(series.is_ready());
        assert!(series.len() > 100);
    }

    #[test]
    fn before_epoch_is_empty() {
        let feed = SyntheticFeed::default();
        let rows = feed
            .fetch(&FeedRequest::history("2330", d(2010, 1, 1), d(2010, 6, 30)))
            .unwrap();
        assert!(rows.is_empty());
    }
}
