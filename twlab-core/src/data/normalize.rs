//! Normalizer: raw provider records in, canonical `Series` out.
//!
//! Providers spell the same column differently (`max`/`high`,
//! `Trading_Volume`/`volume`, ...). All spellings live in one alias table
//! that is consulted per record, so a batch stitched together from several
//! sources still normalizes. Records that fail coercion are dropped one by
//! one; the batch as a whole never fails.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::provider::RawRecord;
use crate::domain::{Bar, Series};

/// Minimum bars for a ready series: the longest default indicator window.
pub const DEFAULT_MIN_BARS: usize = 20;

/// Canonical columns the normalizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Instrument,
    Date,
    Open,
    High,
    Low,
    Close,
    Volume,
}

/// Provider spellings per canonical field, in priority order.
/// Matching is ASCII case-insensitive.
pub const FIELD_ALIASES: &[(Field, &[&str])] = &[
    (Field::Instrument, &["stock_id", "symbol", "code", "data_id"]),
    (Field::Date, &["date", "trading_date", "timestamp"]),
    (Field::Open, &["open", "open_price"]),
    (Field::High, &["high", "max", "high_price"]),
    (Field::Low, &["low", "min", "low_price"]),
    (Field::Close, &["close", "close_price", "price"]),
    (Field::Volume, &["volume", "trading_volume", "vol"]),
];

const BAR_FIELDS: [Field; 6] = [
    Field::Date,
    Field::Open,
    Field::High,
    Field::Low,
    Field::Close,
    Field::Volume,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeOptions {
    /// Fewer valid bars than this yields an `Insufficient` series.
    pub min_bars: usize,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            min_bars: DEFAULT_MIN_BARS,
        }
    }
}

/// Bookkeeping for one normalization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeReport {
    pub received: usize,
    /// Records that failed coercion or had non-positive open/close.
    pub dropped: usize,
    /// Records tagged with a different instrument than requested.
    pub foreign: usize,
    /// Valid records superseded by a later record with the same date.
    pub duplicates: usize,
}

/// One instrument's bar from a whole-market snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub instrument_id: String,
    pub bar: Bar,
}

/// Canonical fields present in a batch. Values are looked up per record, so
/// records within one batch may spell their columns differently.
#[derive(Debug, Clone, Default)]
struct ColumnMap {
    present: HashSet<Field>,
}

impl ColumnMap {
    fn resolve(records: &[RawRecord]) -> Self {
        let present = FIELD_ALIASES
            .iter()
            .filter(|(_, aliases)| records.iter().any(|r| lookup(r, aliases).is_some()))
            .map(|(field, _)| *field)
            .collect();
        Self { present }
    }

    fn get<'r>(&self, record: &'r RawRecord, field: Field) -> Option<&'r Value> {
        if !self.present.contains(&field) {
            return None;
        }
        let (_, aliases) = FIELD_ALIASES.iter().find(|(f, _)| *f == field)?;
        lookup(record, aliases)
    }

    fn missing(&self, fields: &[Field]) -> Vec<Field> {
        fields
            .iter()
            .filter(|f| !self.present.contains(*f))
            .copied()
            .collect()
    }

    fn bar(&self, record: &RawRecord) -> Option<Bar> {
        let bar = Bar {
            date: parse_date(self.get(record, Field::Date)?)?,
            open: coerce_f64(self.get(record, Field::Open)?)?,
            high: coerce_f64(self.get(record, Field::High)?)?,
            low: coerce_f64(self.get(record, Field::Low)?)?,
            close: coerce_f64(self.get(record, Field::Close)?)?,
            volume: coerce_volume(self.get(record, Field::Volume)?)?,
        };
        bar.is_tradable().then_some(bar)
    }

    fn instrument(&self, record: &RawRecord) -> Option<String> {
        match self.get(record, Field::Instrument)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Normalize one instrument's history into a `Series`.
pub fn normalize(instrument_id: &str, records: &[RawRecord], opts: &NormalizeOptions) -> Series {
    normalize_with_report(instrument_id, records, opts).0
}

/// Same as `normalize`, also returning what was dropped along the way.
pub fn normalize_with_report(
    instrument_id: &str,
    records: &[RawRecord],
    opts: &NormalizeOptions,
) -> (Series, NormalizeReport) {
    let mut report = NormalizeReport {
        received: records.len(),
        ..Default::default()
    };

    if records.is_empty() {
        debug!(instrument = instrument_id, "no records to normalize");
        return (Series::unavailable(instrument_id), report);
    }

    let columns = ColumnMap::resolve(records);
    let missing = columns.missing(&BAR_FIELDS);
    if !missing.is_empty() {
        warn!(
            instrument = instrument_id,
            missing = ?missing,
            "records lack required columns"
        );
        report.dropped = records.len();
        return (Series::unavailable(instrument_id), report);
    }

    let mut bars = Vec::with_capacity(records.len());
    for record in records {
        if let Some(tagged) = columns.instrument(record) {
            if tagged != instrument_id {
                report.foreign += 1;
                continue;
            }
        }
        match columns.bar(record) {
            Some(bar) => bars.push(bar),
            None => report.dropped += 1,
        }
    }

    let valid = bars.len();
    let series = Series::new(instrument_id, bars, opts.min_bars);
    report.duplicates = valid - series.len();

    debug!(
        instrument = instrument_id,
        received = report.received,
        dropped = report.dropped,
        foreign = report.foreign,
        duplicates = report.duplicates,
        bars = series.len(),
        status = ?series.status(),
        "normalized series"
    );
    (series, report)
}

/// Normalize a whole-market snapshot into one row per instrument, sorted by id.
///
/// Rows without an instrument id are dropped along with rows that fail
/// coercion. When an instrument appears more than once, the row with the
/// latest date wins, and among equal dates the later occurrence.
pub fn normalize_snapshot(records: &[RawRecord]) -> Vec<SnapshotRow> {
    if records.is_empty() {
        return Vec::new();
    }

    let columns = ColumnMap::resolve(records);
    let mut required = vec![Field::Instrument];
    required.extend_from_slice(&BAR_FIELDS);
    let missing = columns.missing(&required);
    if !missing.is_empty() {
        warn!(missing = ?missing, "snapshot lacks required columns");
        return Vec::new();
    }

    let mut latest: BTreeMap<String, Bar> = BTreeMap::new();
    let mut dropped = 0usize;
    for record in records {
        let (Some(id), Some(bar)) = (columns.instrument(record), columns.bar(record)) else {
            dropped += 1;
            continue;
        };
        match latest.get(&id) {
            Some(existing) if existing.date > bar.date => {}
            _ => {
                latest.insert(id, bar);
            }
        }
    }

    debug!(
        received = records.len(),
        dropped,
        instruments = latest.len(),
        "normalized snapshot"
    );
    latest
        .into_iter()
        .map(|(instrument_id, bar)| SnapshotRow { instrument_id, bar })
        .collect()
}

/// First alias, in priority order, that this record carries.
fn lookup<'r>(record: &'r RawRecord, aliases: &[&str]) -> Option<&'r Value> {
    aliases.iter().find_map(|alias| {
        record
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(alias))
            .map(|(_, value)| value)
    })
}

/// Numbers, or numeric strings with optional thousands separators.
fn coerce_f64(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

fn coerce_volume(value: &Value) -> Option<u64> {
    let v = coerce_f64(value)?;
    (v >= 0.0).then(|| v.round() as u64)
}

fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_date_str(s.trim()),
        Value::Number(n) => {
            let n = n.as_i64()?;
            if (19_000_101..=29_991_231).contains(&n) {
                parse_compact(&n.to_string())
            } else if n >= 100_000_000_000 {
                DateTime::from_timestamp_millis(n).map(|dt| dt.date_naive())
            } else {
                DateTime::from_timestamp(n, 0).map(|dt| dt.date_naive())
            }
        }
        _ => None,
    }
}

/// `YYYY-MM-DD`, `YYYY/MM/DD`, ROC `YYY/MM/DD`, `YYYYMMDD`, or a timestamp
/// whose first ten characters are a date.
fn parse_date_str(s: &str) -> Option<NaiveDate> {
    if let Some(d) = parse_delimited(s) {
        return Some(d);
    }
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        return parse_compact(s);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    match s.as_bytes().get(10) {
        Some(b'T') | Some(b' ') => parse_delimited(s.get(..10)?),
        _ => None,
    }
}

fn parse_delimited(s: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.split(['-', '/']).collect();
    let [y, m, d] = parts.as_slice() else {
        return None;
    };
    if ![y, m, d].iter().all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }
    let mut year: i32 = y.parse().ok()?;
    // Minguo calendar: year 1 is 1912.
    if y.len() <= 3 {
        year += 1911;
    }
    NaiveDate::from_ymd_opt(year, m.parse().ok()?, d.parse().ok()?)
}

fn parse_compact(s: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        s.get(0..4)?.parse().ok()?,
        s.get(4..6)?.parse().ok()?,
        s.get(6..8)?.parse().ok()?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SeriesStatus;
    use serde_json::json;

    fn record(v: Value) -> RawRecord {
        match v {
            Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        }
    }

    fn finmind_row(date: &str, open: f64, close: f64, volume: u64) -> RawRecord {
        record(json!({
            "date": date,
            "stock_id": "2330",
            "Trading_Volume": volume,
            "Trading_money": 0,
            "open": open,
            "max": open.max(close) + 1.0,
            "min": open.min(close) - 1.0,
            "close": close,
            "spread": close - open,
            "Trading_turnover": 100,
        }))
    }

    fn day(i: usize) -> String {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (base + chrono::Duration::days(i as i64)).to_string()
    }

    #[test]
    fn resolves_finmind_aliases() {
        let records: Vec<RawRecord> = (0..25)
            .map(|i| finmind_row(&day(i), 100.0, 101.0, 1_000))
            .collect();
        let series = normalize("2330", &records, &NormalizeOptions::default());
        assert!(series.is_ready());
        assert_eq!(series.len(), 25);
        let b = series.bars()[0];
        assert_eq!(b.high, 102.0);
        assert_eq!(b.low, 99.0);
        assert_eq!(b.volume, 1_000);
    }

    #[test]
    fn resolves_capitalized_aliases() {
        let r = record(json!({
            "Date": "2024-01-02", "Open": "580", "High": "590",
            "Low": "575", "Close": "588", "Volume": "32,123,456"
        }));
        let opts = NormalizeOptions { min_bars: 1 };
        let series = normalize("2330", &[r], &opts);
        assert!(series.is_ready());
        assert_eq!(series.bars()[0].volume, 32_123_456);
        assert_eq!(series.bars()[0].close, 588.0);
    }

    #[test]
    fn aliases_resolved_per_record() {
        let mut records: Vec<RawRecord> = (0..10)
            .map(|i| finmind_row(&day(i), 100.0, 101.0, 1_000))
            .collect();
        records.push(record(json!({
            "Date": day(10), "OPEN": 100.0, "High": 103.0,
            "low": 98.0, "Close": 102.0, "Volume": 2_000
        })));
        let (series, report) =
            normalize_with_report("2330", &records, &NormalizeOptions { min_bars: 1 });
        assert_eq!(report.dropped, 0);
        assert_eq!(series.len(), 11);
        assert_eq!(series.bars()[10].high, 103.0);
        assert_eq!(series.bars()[10].volume, 2_000);
    }

    #[test]
    fn earlier_alias_wins_within_a_record() {
        let r = record(json!({
            "date": "2024-01-02", "open": 10.0, "high": 12.0, "low": 9.0,
            "price": 99.0, "close": 11.0, "volume": 5
        }));
        let series = normalize("2330", &[r], &NormalizeOptions { min_bars: 1 });
        assert_eq!(series.closes(), vec![11.0]);
    }

    #[test]
    fn drops_bad_bars_individually() {
        let mut records: Vec<RawRecord> = (0..22)
            .map(|i| finmind_row(&day(i), 100.0, 101.0, 1_000))
            .collect();
        records[3].insert("open".into(), json!(0.0));
        records[5].insert("close".into(), json!("--"));
        records[7].insert("date".into(), json!("not a date"));
        let (series, report) =
            normalize_with_report("2330", &records, &NormalizeOptions::default());
        assert_eq!(report.dropped, 3);
        assert_eq!(series.len(), 19);
        assert_eq!(
            series.status(),
            SeriesStatus::Insufficient {
                valid: 19,
                required: 20
            }
        );
    }

    #[test]
    fn sorts_and_keeps_latest_duplicate() {
        let records = vec![
            finmind_row("2024-01-03", 100.0, 101.0, 1_000),
            finmind_row("2024-01-01", 100.0, 102.0, 1_000),
            finmind_row("2024-01-03", 100.0, 105.0, 1_000),
            finmind_row("2024-01-02", 100.0, 103.0, 1_000),
        ];
        let (series, report) =
            normalize_with_report("2330", &records, &NormalizeOptions { min_bars: 1 });
        assert_eq!(report.duplicates, 1);
        let closes = series.closes();
        assert_eq!(closes, vec![102.0, 103.0, 105.0]);
    }

    #[test]
    fn empty_batch_is_unavailable() {
        let series = normalize("2330", &[], &NormalizeOptions::default());
        assert_eq!(series.status(), SeriesStatus::Unavailable);
    }

    #[test]
    fn missing_column_is_unavailable() {
        let r = record(json!({"date": "2024-01-02", "open": 1.0, "close": 1.0}));
        let series = normalize("2330", &[r], &NormalizeOptions { min_bars: 1 });
        assert_eq!(series.status(), SeriesStatus::Unavailable);
    }

    #[test]
    fn foreign_instrument_rows_skipped() {
        let mut other = finmind_row("2024-01-02", 50.0, 51.0, 10);
        other.insert("stock_id".into(), json!("2317"));
        let records = vec![finmind_row("2024-01-01", 100.0, 101.0, 1_000), other];
        let (series, report) =
            normalize_with_report("2330", &records, &NormalizeOptions { min_bars: 1 });
        assert_eq!(report.foreign, 1);
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 2);
        for s in [
            "2024-01-02",
            "2024/01/02",
            "20240102",
            "113/01/02",
            "2024-01-02T00:00:00Z",
            "2024-01-02 00:00:00",
        ] {
            assert_eq!(parse_date(&json!(s)), expected, "format {s}");
        }
        assert_eq!(parse_date(&json!(20240102)), expected);
        assert_eq!(parse_date(&json!(1704153600000i64)), expected);
        assert_eq!(parse_date(&json!("2024-13-02")), None);
        assert_eq!(parse_date(&json!(true)), None);
    }

    #[test]
    fn numeric_coercion() {
        assert_eq!(coerce_f64(&json!("1,234.5")), Some(1234.5));
        assert_eq!(coerce_f64(&json!(" 12 ")), Some(12.0));
        assert_eq!(coerce_f64(&json!("")), None);
        assert_eq!(coerce_f64(&json!("NaN")), None);
        assert_eq!(coerce_f64(&json!(null)), None);
        assert_eq!(coerce_volume(&json!(-5)), None);
    }

    #[test]
    fn snapshot_one_row_per_instrument() {
        let mut a = finmind_row("2024-03-01", 100.0, 104.0, 3_000_000);
        a.insert("stock_id".into(), json!("2330"));
        let mut b = finmind_row("2024-03-01", 50.0, 49.0, 10_000);
        b.insert("stock_id".into(), json!("2317"));
        let mut c = finmind_row("2024-03-01", 100.0, 106.0, 3_000_000);
        c.insert("stock_id".into(), json!("2330"));
        let mut broken = finmind_row("2024-03-01", 0.0, 10.0, 1);
        broken.insert("stock_id".into(), json!("9999"));

        let rows = normalize_snapshot(&[a, b, c, broken]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].instrument_id, "2317");
        assert_eq!(rows[1].instrument_id, "2330");
        assert_eq!(rows[1].bar.close, 106.0);
    }
}
