//! MarketScanner — snapshot lookback, filter, enrichment pool, ranking.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::config::{RankBy, ScanConfig};
use super::{ScanCandidate, ScanOutcome, ScanStatus};
use crate::data::{
    fetch_or_empty, normalize_snapshot, DataFeed, FeedRequest, InstrumentDirectory, SnapshotRow,
};
use crate::domain::InstrumentInfo;
use crate::error::AnalysisError;

pub struct MarketScanner<'a> {
    feed: &'a dyn DataFeed,
    directory: &'a dyn InstrumentDirectory,
}

impl<'a> MarketScanner<'a> {
    pub fn new(feed: &'a dyn DataFeed, directory: &'a dyn InstrumentDirectory) -> Self {
        Self { feed, directory }
    }

    /// Scan the market as of `requested`.
    ///
    /// Only an invalid `config` is an error; it is reported before any fetch.
    /// Feed failures count as empty days.
    pub fn scan(
        &self,
        requested: NaiveDate,
        config: &ScanConfig,
    ) -> Result<ScanOutcome, AnalysisError> {
        config.validate()?;

        let Some((date, rows)) = self.resolve_snapshot(requested, config.lookback_days) else {
            info!(
                requested = %requested,
                lookback_days = config.lookback_days,
                "no snapshot within lookback"
            );
            return Ok(ScanOutcome {
                requested,
                status: ScanStatus::NoDataFound {
                    searched_from: requested,
                    days_searched: config.lookback_days + 1,
                },
                snapshot_size: 0,
                matched: 0,
                candidates: Vec::new(),
            });
        };

        let snapshot_size = rows.len();
        let movers: Vec<SnapshotRow> = rows
            .into_iter()
            .filter(|row| {
                row.bar.intraday_change_pct() >= config.min_return_pct
                    && row.bar.volume as f64 >= config.min_volume
            })
            .collect();
        debug!(date = %date, snapshot_size, movers = movers.len(), "filtered snapshot");

        let mut candidates = if movers.is_empty() {
            Vec::new()
        } else {
            self.enrich(movers, config)
        };

        rank(&mut candidates, config.rank_by);
        let matched = candidates.len();
        if let Some(limit) = config.limit {
            candidates.truncate(limit);
        }

        info!(
            requested = %requested,
            date = %date,
            matched,
            candidates = candidates.len(),
            "scan complete"
        );
        Ok(ScanOutcome {
            requested,
            status: ScanStatus::Found { date },
            snapshot_size,
            matched,
            candidates,
        })
    }

    /// Walk back from `requested` one calendar day at a time, up to
    /// `lookback_days` days, until a snapshot has rows.
    fn resolve_snapshot(
        &self,
        requested: NaiveDate,
        lookback_days: u32,
    ) -> Option<(NaiveDate, Vec<SnapshotRow>)> {
        (0..=lookback_days).find_map(|offset| {
            let date = requested.checked_sub_signed(Duration::days(i64::from(offset)))?;
            let records = fetch_or_empty(self.feed, &FeedRequest::snapshot(date));
            let rows = normalize_snapshot(&records);
            if rows.is_empty() {
                debug!(date = %date, "empty snapshot, stepping back");
                None
            } else {
                Some((date, rows))
            }
        })
    }

    /// Label movers and apply the capital-tier filter on a bounded pool.
    fn enrich(&self, movers: Vec<SnapshotRow>, config: &ScanConfig) -> Vec<ScanCandidate> {
        let listing = match self.directory.list_instruments() {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "instrument directory unavailable, using ids as names");
                Vec::new()
            }
        };
        let by_id: HashMap<&str, &InstrumentInfo> =
            listing.iter().map(|i| (i.id.as_str(), i)).collect();

        let label = |row: &SnapshotRow| -> Option<ScanCandidate> {
            let info = by_id.get(row.instrument_id.as_str()).copied();
            if let Some(tier) = config.capital_tier {
                if info.and_then(InstrumentInfo::tier) != Some(tier) {
                    return None;
                }
            }
            Some(ScanCandidate {
                instrument_id: row.instrument_id.clone(),
                display_name: info
                    .map(|i| i.display_name.clone())
                    .unwrap_or_else(|| row.instrument_id.clone()),
                close: row.bar.close,
                pct_change: row.bar.intraday_change_pct(),
                volume: row.bar.volume,
            })
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()
        {
            Ok(pool) => pool.install(|| movers.par_iter().filter_map(label).collect::<Vec<_>>()),
            Err(e) => {
                warn!(error = %e, "failed to build enrichment pool, labeling sequentially");
                movers.iter().filter_map(label).collect()
            }
        }
    }
}

/// Descending by metric; ties by instrument id ascending.
fn rank(candidates: &mut [ScanCandidate], rank_by: RankBy) {
    candidates.sort_by(|a, b| {
        let primary = match rank_by {
            RankBy::Return => b.pct_change.total_cmp(&a.pct_change),
            RankBy::Volume => b.volume.cmp(&a.volume),
        };
        match primary {
            Ordering::Equal => a.instrument_id.cmp(&b.instrument_id),
            other => other,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataError, RawRecord, StaticDirectory};
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves one fixed snapshot on `date` and records every date asked for.
    struct OneDayFeed {
        date: NaiveDate,
        rows: Vec<RawRecord>,
        asked: Mutex<Vec<NaiveDate>>,
    }

    impl OneDayFeed {
        fn new(date: NaiveDate, rows: Vec<serde_json::Value>) -> Self {
            Self {
                date,
                rows: rows.into_iter().filter_map(|v| v.as_object().cloned()).collect(),
                asked: Mutex::new(Vec::new()),
            }
        }
    }

    impl DataFeed for OneDayFeed {
        fn name(&self) -> &str {
            "one-day"
        }

        fn fetch(&self, request: &FeedRequest) -> Result<Vec<RawRecord>, DataError> {
            self.asked.lock().unwrap().push(request.start);
            if request.start == self.date {
                Ok(self.rows.clone())
            } else {
                Ok(Vec::new())
            }
        }
    }

    struct BrokenDirectory;

    impl InstrumentDirectory for BrokenDirectory {
        fn list_instruments(&self) -> Result<Vec<InstrumentInfo>, DataError> {
            Err(DataError::NetworkUnreachable("offline".into()))
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn row(id: &str, date: &str, open: f64, close: f64, volume: u64) -> serde_json::Value {
        json!({"stock_id": id, "date": date, "open": open, "max": close.max(open),
               "min": close.min(open), "close": close, "Trading_Volume": volume})
    }

    fn friday_feed() -> OneDayFeed {
        OneDayFeed::new(
            d(2024, 3, 1),
            vec![
                row("2330", "2024-03-01", 100.0, 105.0, 30_000_000),
                row("2317", "2024-03-01", 100.0, 104.0, 50_000_000),
                row("2454", "2024-03-01", 100.0, 103.0, 1_000_000),
                row("2603", "2024-03-01", 100.0, 101.0, 90_000_000),
                row("3008", "2024-03-01", 100.0, 105.0, 2_000_000),
            ],
        )
    }

    #[test]
    fn weekend_request_resolves_to_friday() {
        let feed = friday_feed();
        let dir = StaticDirectory::default_tw();
        let scanner = MarketScanner::new(&feed, &dir);

        let out = scanner.scan(d(2024, 3, 3), &ScanConfig::default()).unwrap();
        assert_eq!(out.status, ScanStatus::Found { date: d(2024, 3, 1) });
        assert_eq!(out.snapshot_size, 5);
        assert_eq!(*feed.asked.lock().unwrap(), vec![d(2024, 3, 3), d(2024, 3, 2), d(2024, 3, 1)]);

        // 2454 fails volume, 2603 fails return. 3008 ties 2330 on return.
        let ids: Vec<&str> = out.candidates.iter().map(|c| c.instrument_id.as_str()).collect();
        assert_eq!(ids, vec!["2330", "3008", "2317"]);
        assert_eq!(out.candidates[0].display_name, "台積電");
    }

    #[test]
    fn rank_by_volume_and_limit() {
        let feed = friday_feed();
        let dir = StaticDirectory::default_tw();
        let config = ScanConfig {
            rank_by: RankBy::Volume,
            limit: Some(2),
            ..Default::default()
        };
        let out = MarketScanner::new(&feed, &dir).scan(d(2024, 3, 1), &config).unwrap();
        let ids: Vec<&str> = out.candidates.iter().map(|c| c.instrument_id.as_str()).collect();
        assert_eq!(ids, vec!["2317", "2330"]);
        // Three movers passed; the limit hides one.
        assert_eq!(out.matched, 3);
    }

    #[test]
    fn lookback_exhausted_reports_no_data() {
        let feed = friday_feed();
        let dir = StaticDirectory::default_tw();
        let config = ScanConfig {
            lookback_days: 1,
            ..Default::default()
        };
        let out = MarketScanner::new(&feed, &dir).scan(d(2024, 3, 3), &config).unwrap();
        assert_eq!(
            out.status,
            ScanStatus::NoDataFound {
                searched_from: d(2024, 3, 3),
                days_searched: 2
            }
        );
        assert!(out.is_empty());
        assert_eq!(out.matched, 0);
        assert_eq!(out.resolved_date(), None);
    }

    #[test]
    fn capital_tier_filter() {
        let feed = friday_feed();
        let dir = StaticDirectory::default_tw();
        let config = ScanConfig {
            capital_tier: Some(crate::domain::CapitalTier::Mid),
            ..Default::default()
        };
        let out = MarketScanner::new(&feed, &dir).scan(d(2024, 3, 1), &config).unwrap();
        // Only 3008 has mid-tier capital in the default directory.
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.candidates[0].instrument_id, "3008");
    }

    #[test]
    fn directory_failure_falls_back_to_ids() {
        let feed = friday_feed();
        let out = MarketScanner::new(&feed, &BrokenDirectory)
            .scan(d(2024, 3, 1), &ScanConfig::default())
            .unwrap();
        assert_eq!(out.candidates.len(), 3);
        assert!(out.candidates.iter().all(|c| c.display_name == c.instrument_id));
    }

    #[test]
    fn invalid_config_fails_before_fetch() {
        let feed = friday_feed();
        let dir = StaticDirectory::default_tw();
        let config = ScanConfig {
            workers: 0,
            ..Default::default()
        };
        let err = MarketScanner::new(&feed, &dir).scan(d(2024, 3, 1), &config);
        assert!(matches!(err, Err(AnalysisError::InvalidConfig(_))));
        assert!(feed.asked.lock().unwrap().is_empty());
    }
}
