//! Stochastic oscillator entries with Donchian support/resistance stops.
//!
//! Entries fade overbought/oversold crossings of the %D line:
//! - Flat -> Short when %D crosses back down through the upper limit
//! - Flat -> Long when %D crosses back up through the lower limit
//!
//! Exits close at the softer 70/30 levels. Each entry carries an OCO stop
//! plan: a fixed max-loss stop offset from the entry fill price plus a stop
//! at the Donchian level captured at decision time (lowest low protects a
//! long, highest high protects a short).

use crate::domain::Bar;
use crate::indicators::IndicatorSnapshot;

use super::{Action, EntryPlan, PositionState, Protection, StrategyPolicy};

#[derive(Debug, Clone)]
pub struct StochasticCrossover {
    /// %D level whose downward recross triggers a short entry.
    pub upper_limit: f64,
    /// %D level whose upward recross triggers a long entry.
    pub lower_limit: f64,
    /// %D level at or above which a long is closed.
    pub long_exit: f64,
    /// %D level at or below which a short is closed.
    pub short_exit: f64,
    /// Absolute price offset for the fixed max-loss stop.
    pub stop_offset: f64,
}

impl StochasticCrossover {
    pub fn new(upper_limit: f64, lower_limit: f64, stop_offset: f64) -> Self {
        assert!(
            upper_limit > lower_limit,
            "upper_limit must exceed lower_limit"
        );
        assert!(stop_offset > 0.0, "stop_offset must be positive");
        Self {
            upper_limit,
            lower_limit,
            long_exit: 70.0,
            short_exit: 30.0,
            stop_offset,
        }
    }

    pub fn default_params() -> Self {
        Self::new(80.0, 20.0, 0.002)
    }
}

impl StrategyPolicy for StochasticCrossover {
    fn name(&self) -> &str {
        "stochastic_sr"
    }

    fn evaluate(
        &self,
        bars: &[Bar],
        bar_index: usize,
        snapshot: &IndicatorSnapshot,
        state: PositionState,
    ) -> Action {
        let bar = &bars[bar_index];
        if bar.close.is_nan() {
            return Action::NoAction;
        }

        let (curr_d, prev_d) = match (snapshot.stoch_d, snapshot.stoch_d_prev) {
            (Some(c), Some(p)) => (c, p),
            _ => return Action::NoAction,
        };

        match state {
            PositionState::Flat => {
                if prev_d >= self.upper_limit && curr_d <= self.upper_limit {
                    // Short entry: resistance stop at the highest high of
                    // the trailing window.
                    let channel_stop = match snapshot.donchian_high {
                        Some(level) => level,
                        None => return Action::NoAction,
                    };
                    Action::EnterShort(EntryPlan {
                        protection: Protection::OcoStops {
                            loss_offset: self.stop_offset,
                            channel_stop,
                        },
                    })
                } else if prev_d <= self.lower_limit && curr_d >= self.lower_limit {
                    // Long entry: support stop at the lowest low.
                    let channel_stop = match snapshot.donchian_low {
                        Some(level) => level,
                        None => return Action::NoAction,
                    };
                    Action::EnterLong(EntryPlan {
                        protection: Protection::OcoStops {
                            loss_offset: self.stop_offset,
                            channel_stop,
                        },
                    })
                } else {
                    Action::NoAction
                }
            }
            PositionState::Long => {
                if curr_d >= self.long_exit {
                    Action::ExitPosition
                } else {
                    Action::NoAction
                }
            }
            PositionState::Short => {
                if curr_d <= self.short_exit {
                    Action::ExitPosition
                } else {
                    Action::NoAction
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn snapshot_with_d(prev: f64, curr: f64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            stoch_d: Some(curr),
            stoch_d_prev: Some(prev),
            donchian_high: Some(110.0),
            donchian_low: Some(90.0),
            ..Default::default()
        }
    }

    #[test]
    fn short_entry_on_downward_cross() {
        let policy = StochasticCrossover::default_params();
        let bars = make_bars(&[100.0, 101.0]);
        let snap = snapshot_with_d(85.0, 78.0);

        let action = policy.evaluate(&bars, 1, &snap, PositionState::Flat);
        match action {
            Action::EnterShort(plan) => {
                assert_eq!(
                    plan.protection,
                    Protection::OcoStops {
                        loss_offset: 0.002,
                        channel_stop: 110.0,
                    }
                );
            }
            other => panic!("expected EnterShort, got {other:?}"),
        }
    }

    #[test]
    fn long_entry_on_upward_cross() {
        let policy = StochasticCrossover::default_params();
        let bars = make_bars(&[100.0, 101.0]);
        let snap = snapshot_with_d(15.0, 22.0);

        let action = policy.evaluate(&bars, 1, &snap, PositionState::Flat);
        match action {
            Action::EnterLong(plan) => {
                assert_eq!(
                    plan.protection,
                    Protection::OcoStops {
                        loss_offset: 0.002,
                        channel_stop: 90.0,
                    }
                );
            }
            other => panic!("expected EnterLong, got {other:?}"),
        }
    }

    #[test]
    fn cross_at_exact_limit_counts() {
        let policy = StochasticCrossover::default_params();
        let bars = make_bars(&[100.0, 101.0]);
        // prevD == 80 and currD == 80 satisfies both >= and <=.
        let snap = snapshot_with_d(80.0, 80.0);
        assert!(policy
            .evaluate(&bars, 1, &snap, PositionState::Flat)
            .is_entry());
    }

    #[test]
    fn no_entry_without_cross() {
        let policy = StochasticCrossover::default_params();
        let bars = make_bars(&[100.0, 101.0]);
        // Both below the upper limit: no downward recross.
        let snap = snapshot_with_d(75.0, 78.0);
        assert_eq!(
            policy.evaluate(&bars, 1, &snap, PositionState::Flat),
            Action::NoAction
        );
    }

    #[test]
    fn long_exits_at_seventy() {
        let policy = StochasticCrossover::default_params();
        let bars = make_bars(&[100.0, 101.0]);
        let snap = snapshot_with_d(60.0, 71.0);
        assert_eq!(
            policy.evaluate(&bars, 1, &snap, PositionState::Long),
            Action::ExitPosition
        );
    }

    #[test]
    fn short_exits_at_thirty() {
        let policy = StochasticCrossover::default_params();
        let bars = make_bars(&[100.0, 101.0]);
        let snap = snapshot_with_d(40.0, 28.0);
        assert_eq!(
            policy.evaluate(&bars, 1, &snap, PositionState::Short),
            Action::ExitPosition
        );
    }

    #[test]
    fn not_ready_snapshot_is_no_action() {
        let policy = StochasticCrossover::default_params();
        let bars = make_bars(&[100.0, 101.0]);
        let snap = IndicatorSnapshot::default();
        assert_eq!(
            policy.evaluate(&bars, 1, &snap, PositionState::Flat),
            Action::NoAction
        );
    }

    #[test]
    fn missing_channel_level_blocks_entry() {
        let policy = StochasticCrossover::default_params();
        let bars = make_bars(&[100.0, 101.0]);
        let mut snap = snapshot_with_d(85.0, 78.0);
        snap.donchian_high = None;
        assert_eq!(
            policy.evaluate(&bars, 1, &snap, PositionState::Flat),
            Action::NoAction
        );
    }
}
