//! Strategy policies — map (position state, indicator snapshot, bar pair)
//! to a trading action.
//!
//! Policies are pure: same inputs, same action, no side effects. They never
//! see orders or broker state; the caller skips evaluation entirely while an
//! order is outstanding. Concrete policies are selected at construction, not
//! via inheritance.

pub mod bollinger_adx;
pub mod stochastic_sr;

pub use bollinger_adx::BollingerAdxMeanReversion;
pub use stochastic_sr::StochasticCrossover;

use crate::domain::Bar;
use crate::indicators::IndicatorSnapshot;

/// Which way the position points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Flat,
    Long,
    Short,
}

impl PositionState {
    pub fn from_quantity(quantity: i64) -> Self {
        match quantity {
            q if q > 0 => PositionState::Long,
            q if q < 0 => PositionState::Short,
            _ => PositionState::Flat,
        }
    }
}

/// How an entry is protected once it fills.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Protection {
    /// Two opposing stops linked one-cancels-other: a fixed max-loss stop
    /// offset from the entry fill price, and a support/resistance stop at a
    /// channel level captured at decision time.
    OcoStops { loss_offset: f64, channel_stop: f64 },
    /// A single protective stop at a fixed price.
    SingleStop { stop_price: f64 },
}

/// Everything the order path needs to place an entry and its protection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryPlan {
    pub protection: Protection,
}

/// Per-bar decision output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    EnterLong(EntryPlan),
    EnterShort(EntryPlan),
    ExitPosition,
    NoAction,
}

impl Action {
    pub fn is_entry(&self) -> bool {
        matches!(self, Action::EnterLong(_) | Action::EnterShort(_))
    }
}

/// Trait for strategy policies.
///
/// # Architecture invariant
/// Policies receive position *state* (flat/long/short), never the order
/// table or broker handles. A not-ready snapshot field must yield
/// `NoAction`.
pub trait StrategyPolicy: Send + Sync {
    /// Human-readable name (e.g., "stochastic_sr").
    fn name(&self) -> &str;

    /// Evaluate the policy on the bar at `bar_index`.
    ///
    /// The implementation must only use data from `bars[0..=bar_index]`.
    fn evaluate(
        &self,
        bars: &[Bar],
        bar_index: usize,
        snapshot: &IndicatorSnapshot,
        state: PositionState,
    ) -> Action;
}
