//! CSV bar loading with a fixed column mapping.
//!
//! Expected header: `date,open,high,low,close,volume` with ISO dates.
//! Rows must be strictly increasing by date; the loader fails fast on
//! disorder or insane OHLC rather than letting a bad feed reach the engine.

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use serde::Deserialize;

use swinglab_core::domain::Bar;

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Load bars for one symbol from a CSV file.
pub fn load_bars_csv(path: &Path, symbol: &str) -> anyhow::Result<Vec<Bar>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening bar data {}", path.display()))?;
    load_bars_from_reader(file, symbol)
        .with_context(|| format!("loading bar data {}", path.display()))
}

/// Load bars from any CSV reader (fixed column mapping).
pub fn load_bars_from_reader<R: Read>(reader: R, symbol: &str) -> anyhow::Result<Vec<Bar>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut bars: Vec<Bar> = Vec::new();

    for (line, row) in csv_reader.deserialize::<CsvRow>().enumerate() {
        let row = row.with_context(|| format!("row {}", line + 1))?;
        let bar = Bar {
            symbol: symbol.to_string(),
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume.max(0.0) as u64,
        };

        if !bar.is_sane() {
            bail!("row {} ({}): insane OHLC values", line + 1, bar.date);
        }
        if let Some(last) = bars.last() {
            if bar.date <= last.date {
                bail!(
                    "row {} ({}): dates must be strictly increasing (previous {})",
                    line + 1,
                    bar.date,
                    last.date
                );
            }
        }
        bars.push(bar);
    }

    if bars.is_empty() {
        bail!("no bars in input");
    }
    Ok(bars)
}
