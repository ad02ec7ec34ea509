//! Bollinger Band mean reversion gated by trend strength.
//!
//! Active only while ADX is below `adx_max` (range-bound market). Entries
//! fade band crossings back inside the envelope:
//! - Flat -> Short when the close crosses back down through the upper band
//! - Flat -> Long when the close crosses back up through the lower band
//!
//! Positions close when the close crosses the middle band against them. Each
//! entry carries a single protective stop at the crossed band's current
//! value.

use crate::domain::Bar;
use crate::indicators::IndicatorSnapshot;

use super::{Action, EntryPlan, PositionState, Protection, StrategyPolicy};

#[derive(Debug, Clone)]
pub struct BollingerAdxMeanReversion {
    /// ADX at or above this value disables the policy for the bar.
    pub adx_max: f64,
}

impl BollingerAdxMeanReversion {
    pub fn new(adx_max: f64) -> Self {
        assert!(adx_max > 0.0, "adx_max must be positive");
        Self { adx_max }
    }

    pub fn default_params() -> Self {
        Self::new(40.0)
    }

    fn prev_close(bars: &[Bar], bar_index: usize) -> Option<f64> {
        let prev = bars.get(bar_index.checked_sub(1)?)?;
        (!prev.close.is_nan()).then_some(prev.close)
    }
}

impl StrategyPolicy for BollingerAdxMeanReversion {
    fn name(&self) -> &str {
        "bollinger_adx"
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
        let prev_close = match Self::prev_close(bars, bar_index) {
            Some(c) => c,
            None => return Action::NoAction,
        };
        let curr_close = bar.close;

        match state {
            PositionState::Flat => {
                let adx = match snapshot.adx {
                    Some(v) => v,
                    None => return Action::NoAction,
                };
                if adx >= self.adx_max {
                    return Action::NoAction;
                }

                let (upper, lower, upper_prev, lower_prev) = match (
                    snapshot.boll_upper,
                    snapshot.boll_lower,
                    snapshot.boll_upper_prev,
                    snapshot.boll_lower_prev,
                ) {
                    (Some(u), Some(l), Some(up), Some(lp)) => (u, l, up, lp),
                    _ => return Action::NoAction,
                };

                if prev_close > upper_prev && curr_close <= upper {
                    Action::EnterShort(EntryPlan {
                        protection: Protection::SingleStop { stop_price: upper },
                    })
                } else if prev_close < lower_prev && curr_close >= lower {
                    Action::EnterLong(EntryPlan {
                        protection: Protection::SingleStop { stop_price: lower },
                    })
                } else {
                    Action::NoAction
                }
            }
            PositionState::Long => {
                let (mid, mid_prev) = match (snapshot.boll_middle, snapshot.boll_middle_prev) {
                    (Some(m), Some(p)) => (m, p),
                    _ => return Action::NoAction,
                };
                if prev_close >= mid_prev && curr_close < mid {
                    Action::ExitPosition
                } else {
                    Action::NoAction
                }
            }
            PositionState::Short => {
                let (mid, mid_prev) = match (snapshot.boll_middle, snapshot.boll_middle_prev) {
                    (Some(m), Some(p)) => (m, p),
                    _ => return Action::NoAction,
                };
                if prev_close <= mid_prev && curr_close > mid {
                    Action::ExitPosition
                } else {
                    Action::NoAction
                }
            }
        }
    }
}
