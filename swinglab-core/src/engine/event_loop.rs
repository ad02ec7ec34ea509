//! Bar-by-bar event loop — the heart of the backtest.
//!
//! Strictly ordered, single-threaded: for each bar the simulated broker's
//! notifications are dispatched first (order manager, then ledger), and only
//! then does the strategy policy see the bar. The decision is skipped
//! entirely during warmup and while an order is outstanding. Replaying the
//! same bar sequence yields identical orders and P/L.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, ClosedTrade, IdGen, OrderKind, OrderSide};
use crate::engine::ledger::{RunSummary, TradeLedger};
use crate::engine::order_manager::OrderManager;
use crate::engine::sim::SimBroker;
use crate::error::EngineError;
use crate::indicators::snapshot::IndicatorSet;
use crate::strategy::{Action, StrategyPolicy};

/// Configuration for a single backtest run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub initial_cash: f64,
    /// Commission rate per fill, as a fraction of notional.
    pub commission_rate: f64,
    /// Quantity for strategy entries.
    pub order_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_cash: 100_000.0,
            commission_rate: 0.001,
            order_size: 10,
        }
    }
}

/// Result of a complete backtest run.
#[derive(Debug)]
pub struct RunResult {
    pub summary: RunSummary,
    pub trades: Vec<ClosedTrade>,
    pub bar_count: usize,
    pub warmup_bars: usize,
}

/// Run a backtest over one symbol's bar history.
pub fn run_backtest(
    bars: &[Bar],
    indicator_set: &IndicatorSet,
    policy: &dyn StrategyPolicy,
    config: &EngineConfig,
) -> Result<RunResult, EngineError> {
    let warmup_bars = indicator_set.warmup_bars();

    let mut broker = SimBroker::with_cash(config.commission_rate, config.initial_cash);
    let mut ledger = TradeLedger::new(broker.starting_value());

    if bars.is_empty() {
        let starting = broker.starting_value();
        return Ok(RunResult {
            summary: ledger.summary(starting),
            trades: Vec::new(),
            bar_count: 0,
            warmup_bars,
        });
    }

    let values = indicator_set.precompute(bars);
    let mut manager = OrderManager::new(bars[0].symbol.clone());
    let mut id_gen = IdGen::new();
    let mut last_close = bars[0].close;

    for (t, bar) in bars.iter().enumerate() {
        // Phase 1: deliver every notification for this bar.
        for event in broker.process_bar(bar, t) {
            manager.on_event(&mut broker, &mut id_gen, &event, t)?;
            ledger.on_event(&event);
        }

        if !bar.close.is_nan() {
            last_close = bar.close;
        }

        // Phase 2: the decision — skipped during warmup and while an order
        // is in flight.
        if t < warmup_bars || manager.outstanding_order_id().is_some() {
            continue;
        }

        let snapshot = indicator_set.snapshot(&values, t);
        let action = policy.evaluate(bars, t, &snapshot, manager.position_state());

        match action {
            Action::EnterLong(plan) => {
                manager.submit_entry(
                    &mut broker,
                    &mut id_gen,
                    OrderSide::Buy,
                    OrderKind::Market,
                    config.order_size,
                    Some(plan.protection),
                    t,
                )?;
            }
            Action::EnterShort(plan) => {
                manager.submit_entry(
                    &mut broker,
                    &mut id_gen,
                    OrderSide::Sell,
                    OrderKind::Market,
                    config.order_size,
                    Some(plan.protection),
                    t,
                )?;
            }
            Action::ExitPosition => {
                manager.submit_exit(&mut broker, &mut id_gen, t)?;
            }
            Action::NoAction => {}
        }
    }

    let ending_value = broker.account_value(last_close);
    Ok(RunResult {
        summary: ledger.summary(ending_value),
        trades: ledger.trades().to_vec(),
        bar_count: bars.len(),
        warmup_bars,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::snapshot::IndicatorParams;
    use crate::strategy::StochasticCrossover;

    fn oscillating_bars(n: usize) -> Vec<Bar> {
        // A slow sine wave gives the stochastic clean overbought/oversold
        // swings.
        let closes: Vec<f64> = (0..n)
            .map(|i| 100.0 + (i as f64 * 0.35).sin() * 8.0)
            .collect();
        crate::indicators::make_bars(&closes)
    }

    fn small_params() -> IndicatorParams {
        IndicatorParams {
            period: 5,
            fast_smoothing: 2,
            slow_smoothing: 2,
            dev_factor: 2.0,
            adx_period: 5,
        }
    }

    #[test]
    fn empty_history_yields_flat_summary() {
        let set = IndicatorSet::new(small_params());
        let policy = StochasticCrossover::default_params();
        let result = run_backtest(&[], &set, &policy, &EngineConfig::default()).unwrap();
        assert_eq!(result.bar_count, 0);
        assert_eq!(result.summary.pnl, 0.0);
    }

    #[test]
    fn run_produces_trades_on_oscillating_series() {
        let bars = oscillating_bars(160);
        let set = IndicatorSet::new(small_params());
        let policy = StochasticCrossover::new(80.0, 20.0, 1.0);
        let result = run_backtest(&bars, &set, &policy, &EngineConfig::default()).unwrap();

        assert_eq!(result.bar_count, 160);
        assert!(
            !result.trades.is_empty(),
            "oscillating series should complete at least one round trip"
        );
        let expected_pnl = result.summary.ending_value - result.summary.starting_value;
        assert!((result.summary.pnl - expected_pnl).abs() < 1e-10);
    }

    #[test]
    fn replay_is_deterministic() {
        let bars = oscillating_bars(160);
        let set = IndicatorSet::new(small_params());
        let policy = StochasticCrossover::new(80.0, 20.0, 1.0);
        let config = EngineConfig::default();

        let a = run_backtest(&bars, &set, &policy, &config).unwrap();
        let b = run_backtest(&bars, &set, &policy, &config).unwrap();

        assert_eq!(a.summary.ending_value, b.summary.ending_value);
        assert_eq!(a.trades.len(), b.trades.len());
        for (x, y) in a.trades.iter().zip(b.trades.iter()) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.net_pnl, y.net_pnl);
            assert_eq!(x.close_date, y.close_date);
        }
    }
}
