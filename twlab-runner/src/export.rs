//! Export: CSV for scan candidates and trade tapes, pretty JSON for anything
//! serializable (diagnoses, scan outcomes).

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use twlab_core::backtest::TradeDetail;
use twlab_core::scanner::ScanCandidate;

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: rank, instrument_id, name, close, pct_change, volume
pub fn export_candidates_csv(candidates: &[ScanCandidate]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["rank", "instrument_id", "name", "close", "pct_change", "volume"])?;

    for (i, c) in candidates.iter().enumerate() {
        wtr.write_record([
            &(i + 1).to_string(),
            &c.instrument_id,
            &c.display_name,
            &format!("{:.2}", c.close),
            &format!("{:.2}", c.pct_change),
            &c.volume.to_string(),
        ])?;
    }

    finish(wtr)
}

/// Columns: signal_date, entry_date, entry_price, exit_date, exit_price,
/// return_pct, win, bars_held
pub fn export_trades_csv(trades: &[TradeDetail]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "signal_date",
        "entry_date",
        "entry_price",
        "exit_date",
        "exit_price",
        "return_pct",
        "win",
        "bars_held",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.signal_date.to_string(),
            &t.entry_date.to_string(),
            &format!("{:.2}", t.entry_price),
            &t.exit_date.to_string(),
            &format!("{:.2}", t.exit_price),
            &format!("{:.4}", t.return_pct),
            &t.win.to_string(),
            &t.bars_held().to_string(),
        ])?;
    }

    finish(wtr)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

// ─── File output ────────────────────────────────────────────────────

/// Write `content` to `path`, creating parent directories.
pub fn save_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

pub fn save_candidates_csv(path: &Path, candidates: &[ScanCandidate]) -> Result<()> {
    save_text(path, &export_candidates_csv(candidates)?)
}

pub fn save_trades_csv(path: &Path, trades: &[TradeDetail]) -> Result<()> {
    save_text(path, &export_trades_csv(trades)?)
}
