//! End-to-end: raw records → normalize → breakout → backtest.

use serde_json::{json, Value};
use twlab_core::backtest::BacktestEvaluator;
use twlab_core::data::{normalize, NormalizeOptions, RawRecord};
use twlab_core::domain::SeriesStatus;
use twlab_core::indicators::{IndicatorParams, IndicatorSet};
use twlab_core::signal::{BreakoutConfig, BreakoutDetector};
use twlab_core::AnalysisError;

fn records(values: Vec<Value>) -> Vec<RawRecord> {
    values
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect()
}

/// `n` flat bars at 100 on volume 1000, starting 2024-01-01.
fn flat_rows(n: usize) -> Vec<Value> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    (0..n)
        .map(|i| {
            let date = base + chrono::Duration::days(i as i64);
            json!({"date": date.to_string(), "stock_id": "2330", "open": 100.0,
                   "max": 101.0, "min": 99.0, "close": 100.0, "Trading_Volume": 1000})
        })
        .collect()
}

#[test]
fn twenty_five_bar_breakout_wins() {
    let mut rows = flat_rows(25);
    // Bar 20: +3.5% on 3x its trailing 5-bar average.
    rows[20]["close"] = json!(103.5);
    rows[20]["max"] = json!(104.0);
    rows[20]["Trading_Volume"] = json!(3000);
    // Entry at open[21], exit at close[23] above it.
    rows[21]["open"] = json!(103.5);
    rows[21]["close"] = json!(104.0);
    rows[21]["max"] = json!(104.5);
    rows[22]["open"] = json!(104.0);
    rows[22]["close"] = json!(104.5);
    rows[22]["max"] = json!(105.0);
    rows[23]["open"] = json!(104.5);
    rows[23]["close"] = json!(106.0);
    rows[23]["max"] = json!(106.5);

    let series = normalize("2330", &records(rows), &NormalizeOptions::default());
    assert_eq!(series.status(), SeriesStatus::Ready);
    assert_eq!(series.len(), 25);

    let detector = BreakoutDetector::new(BreakoutConfig::default()).unwrap();
    let signal = detector.detect(series.bars());
    assert_eq!(signal.indices, vec![20]);

    let result = BacktestEvaluator::new(3)
        .unwrap()
        .evaluate(&series, &signal.indices);
    assert_eq!(result.signal_count, 1);
    assert_eq!(result.win_rate, 100.0);
    assert_eq!(result.details[0].entry_date.to_string(), "2024-01-22");
    assert!(result.details[0].return_pct > 0.0);

    // Indicators come out aligned with the series.
    let set = IndicatorSet::compute(&series, &IndicatorParams::default()).unwrap();
    assert_eq!(set.len(), 25);
}

#[test]
fn fifteen_bars_is_insufficient_not_an_error() {
    let series = normalize("2330", &records(flat_rows(15)), &NormalizeOptions::default());
    assert_eq!(
        series.status(),
        SeriesStatus::Insufficient {
            valid: 15,
            required: 20
        }
    );
    assert_eq!(
        series.status_error(),
        Some(AnalysisError::InsufficientHistory {
            valid: 15,
            required: 20
        })
    );

    let detector = BreakoutDetector::new(BreakoutConfig::default()).unwrap();
    let signal = detector.detect(series.bars());
    let result = BacktestEvaluator::new(3)
        .unwrap()
        .evaluate(&series, &signal.indices);
    assert_eq!(result.signal_count, 0);
    assert_eq!(result.win_rate, 0.0);
}

#[test]
fn signal_near_end_is_excluded() {
    let mut rows = flat_rows(22);
    rows[20]["close"] = json!(104.0);
    rows[20]["max"] = json!(104.0);
    rows[20]["Trading_Volume"] = json!(5000);

    let series = normalize("2330", &records(rows), &NormalizeOptions::default());
    let signal = BreakoutDetector::new(BreakoutConfig::default())
        .unwrap()
        .detect(series.bars());
    assert_eq!(signal.indices, vec![20]);

    // 20 + 3 = 23 is past the last bar (21).
    let result = BacktestEvaluator::new(3)
        .unwrap()
        .evaluate(&series, &signal.indices);
    assert_eq!(result.signal_count, 0);
    assert_eq!(result.win_rate, 0.0);

    // With a one-day hold the trade is realizable.
    let result = BacktestEvaluator::new(1)
        .unwrap()
        .evaluate(&series, &signal.indices);
    assert_eq!(result.signal_count, 1);
}

#[test]
fn zero_hold_days_rejected_up_front() {
    assert!(matches!(
        BacktestEvaluator::new(0),
        Err(AnalysisError::InvalidConfig(_))
    ));
}
