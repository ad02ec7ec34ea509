//! swinglab core — event-driven trading decision and order-lifecycle engine.
//!
//! - Domain types (bars, orders, positions, trades, OCO bracket groups)
//! - Indicator precompute (stochastic, Bollinger, ADX, Donchian) with a
//!   per-bar snapshot view
//! - Pure strategy policies mapping (position state, snapshot, bars) to
//!   actions, selected at construction
//! - Per-symbol order manager with single-outstanding-order discipline
//! - Bracket/OCO table resolved by group-id lookup
//! - Position-target reconciliation (backtest-pure and live drivers)
//! - Deterministic simulated broker and the bar-by-bar event loop

pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod strategy;

pub use error::EngineError;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types that cross thread boundaries are Send+Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Order>();
        require_sync::<domain::Order>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::ClosedTrade>();
        require_sync::<domain::ClosedTrade>();

        require_send::<engine::BrokerEvent>();
        require_sync::<engine::BrokerEvent>();
        require_send::<engine::RunSummary>();
        require_sync::<engine::RunSummary>();

        require_send::<strategy::StochasticCrossover>();
        require_sync::<strategy::StochasticCrossover>();
        require_send::<strategy::BollingerAdxMeanReversion>();
        require_sync::<strategy::BollingerAdxMeanReversion>();

        require_send::<indicators::IndicatorValues>();
        require_sync::<indicators::IndicatorValues>();
    }

    /// Architecture contract: StrategyPolicy does NOT see orders or broker
    /// handles — `evaluate` takes bars, an indicator snapshot, and a bare
    /// position state. The type system enforces it; this test documents it.
    #[test]
    fn strategy_policy_sees_position_state_only() {
        fn _check_trait_object_builds(
            policy: &dyn strategy::StrategyPolicy,
            bars: &[domain::Bar],
            snapshot: &indicators::IndicatorSnapshot,
        ) -> strategy::Action {
            policy.evaluate(bars, 0, snapshot, strategy::PositionState::Flat)
        }
    }
}
