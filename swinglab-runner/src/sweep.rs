//! Parameter sweep utilities for optimization runs.
//!
//! Each distinct parameter set produces one tagged row (parameter values
//! plus the run's ending value), appended to a CSV — the optimization
//! artifact downstream tooling reads.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use swinglab_core::domain::Bar;

use crate::config::RunConfig;
use crate::runner::run_single_backtest;

/// Parameter grid specification over the indicator set.
#[derive(Debug, Clone)]
pub struct ParamGrid {
    /// Shared stochastic/Bollinger/Donchian window lengths to test.
    pub periods: Vec<usize>,
    /// Bollinger standard-deviation multipliers to test.
    pub dev_factors: Vec<f64>,
    /// ADX periods to test.
    pub adx_periods: Vec<usize>,
}

impl ParamGrid {
    /// Default grid: windows 10-30, 1.5-2.5 deviations, 7/14 ADX.
    pub fn default_grid() -> Self {
        Self {
            periods: vec![10, 14, 20, 30],
            dev_factors: vec![1.5, 2.0, 2.5],
            adx_periods: vec![7, 14],
        }
    }

    /// Returns the total number of configurations in this grid.
    pub fn size(&self) -> usize {
        self.periods.len() * self.dev_factors.len() * self.adx_periods.len()
    }

    /// Generates all configurations in the grid from a base config.
    pub fn generate_configs(&self, base: &RunConfig) -> Vec<RunConfig> {
        let mut configs = Vec::with_capacity(self.size());
        for &period in &self.periods {
            for &dev_factor in &self.dev_factors {
                for &adx_period in &self.adx_periods {
                    let mut config = base.clone();
                    config.indicators.period = period;
                    config.indicators.dev_factor = dev_factor;
                    config.indicators.adx_period = adx_period;
                    configs.push(config);
                }
            }
        }
        configs
    }
}

/// One parameter-tagged result row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepRow {
    pub run_id: String,
    pub params: BTreeMap<String, f64>,
    pub ending_value: f64,
    pub pnl: f64,
    pub trade_count: usize,
}

/// Run every configuration in the grid against the same bar history, in
/// parallel. Row order follows the grid, independent of scheduling.
pub fn sweep(base: &RunConfig, grid: &ParamGrid, bars: &[Bar]) -> Result<Vec<SweepRow>> {
    let configs = grid.generate_configs(base);

    configs
        .par_iter()
        .map(|config| {
            let result = run_single_backtest(config, bars)?;
            let mut params = BTreeMap::new();
            params.insert("period".to_string(), config.indicators.period as f64);
            params.insert("dev_factor".to_string(), config.indicators.dev_factor);
            params.insert("adx_period".to_string(), config.indicators.adx_period as f64);
            Ok(SweepRow {
                run_id: result.run_id,
                params,
                ending_value: result.summary.ending_value,
                pnl: result.summary.pnl,
                trade_count: result.trades.len(),
            })
        })
        .collect()
}

/// Write sweep rows as CSV: one row per parameter set tested.
pub fn write_rows_csv(rows: &[SweepRow], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    writer.write_record([
        "run_id",
        "period",
        "dev_factor",
        "adx_period",
        "ending_value",
        "pnl",
        "trade_count",
    ])?;
    for row in rows {
        writer.write_record([
            row.run_id.clone(),
            format!("{}", row.params.get("period").copied().unwrap_or(f64::NAN)),
            format!(
                "{}",
                row.params.get("dev_factor").copied().unwrap_or(f64::NAN)
            ),
            format!(
                "{}",
                row.params.get("adx_period").copied().unwrap_or(f64::NAN)
            ),
            format!("{}", row.ending_value),
            format!("{}", row.pnl),
            format!("{}", row.trade_count),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
