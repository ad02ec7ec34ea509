//! Single-run orchestration: config + bars in, result out.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use swinglab_core::domain::{Bar, ClosedTrade};
use swinglab_core::engine::{run_backtest, RunSummary};
use swinglab_core::indicators::snapshot::IndicatorSet;

use crate::config::{RunConfig, RunId};

/// Everything a completed run reports.
#[derive(Debug, Serialize, Deserialize)]
pub struct BacktestResult {
    pub run_id: RunId,
    pub symbol: String,
    pub summary: RunSummary,
    pub trades: Vec<ClosedTrade>,
    pub bar_count: usize,
    pub warmup_bars: usize,
}

/// Run one backtest from a parsed config over preloaded bars.
pub fn run_single_backtest(config: &RunConfig, bars: &[Bar]) -> anyhow::Result<BacktestResult> {
    let set = IndicatorSet::new(config.indicator_params());
    let policy = config.build_policy();
    let engine_config = config.engine_config();

    let result = run_backtest(bars, &set, policy.as_ref(), &engine_config)
        .with_context(|| format!("backtest for {}", config.backtest.symbol))?;

    info!(
        symbol = %config.backtest.symbol,
        trades = result.trades.len(),
        pnl = result.summary.pnl,
        "backtest complete"
    );

    Ok(BacktestResult {
        run_id: config.run_id(),
        symbol: config.backtest.symbol.clone(),
        summary: result.summary,
        trades: result.trades,
        bar_count: result.bar_count,
        warmup_bars: result.warmup_bars,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn oscillating_bars(n: usize) -> Vec<Bar> {
        let base_date = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
        (0..n)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.35).sin() * 8.0;
                let open = if i == 0 {
                    close
                } else {
                    100.0 + ((i - 1) as f64 * 0.35).sin() * 8.0
                };
                Bar {
                    symbol: "BTC".to_string(),
                    date: base_date + chrono::Duration::days(i as i64),
                    open,
                    high: open.max(close) + 1.0,
                    low: open.min(close) - 1.0,
                    close,
                    volume: 1000,
                }
            })
            .collect()
    }

    fn sample_config() -> RunConfig {
        RunConfig::from_toml(
            r#"
[backtest]
symbol = "BTC"
initial_cash = 100000.0
commission_rate = 0.001
order_size = 10

[indicators]
period = 5
fast_smoothing = 2
slow_smoothing = 2
dev_factor = 2.0
adx_period = 5

[strategy]
type = "stochastic_sr"
upper_limit = 80.0
lower_limit = 20.0
stop_offset = 1.0
"#,
        )
        .unwrap()
    }

    #[test]
    fn runs_end_to_end() {
        let config = sample_config();
        let bars = oscillating_bars(160);
        let result = run_single_backtest(&config, &bars).unwrap();

        assert_eq!(result.symbol, "BTC");
        assert_eq!(result.bar_count, 160);
        assert_eq!(result.run_id, config.run_id());
        assert!(
            (result.summary.pnl
                - (result.summary.ending_value - result.summary.starting_value))
                .abs()
                < 1e-9
        );
    }
}
