//! Per-bar snapshot of the indicator set a strategy decides on.
//!
//! Indicators are precomputed as full series; the snapshot is the per-bar
//! view handed to a strategy policy. Fields are `None` until the underlying
//! window has enough bars — a policy must treat a missing field as
//! no-signal.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::indicators::{Adx, Bollinger, Donchian, Indicator, IndicatorValues, Stochastic};

/// Parameters of the full indicator set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    /// Window shared by the stochastic, Bollinger, and Donchian channels.
    pub period: usize,
    /// Fast smoothing applied to raw %K.
    pub fast_smoothing: usize,
    /// Slow smoothing applied to %K to produce %D.
    pub slow_smoothing: usize,
    /// Bollinger standard-deviation multiplier.
    pub dev_factor: f64,
    /// ADX period (Wilder).
    pub adx_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            period: 14,
            fast_smoothing: 3,
            slow_smoothing: 3,
            dev_factor: 2.0,
            adx_period: 14,
        }
    }
}

/// Derived values for one bar. `None` means the window is not ready.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorSnapshot {
    pub stoch_d: Option<f64>,
    pub stoch_d_prev: Option<f64>,
    pub boll_upper: Option<f64>,
    pub boll_middle: Option<f64>,
    pub boll_lower: Option<f64>,
    pub boll_upper_prev: Option<f64>,
    pub boll_middle_prev: Option<f64>,
    pub boll_lower_prev: Option<f64>,
    pub adx: Option<f64>,
    /// Highest high over the trailing window, excluding the current bar.
    pub donchian_high: Option<f64>,
    /// Lowest low over the trailing window, excluding the current bar.
    pub donchian_low: Option<f64>,
}

/// Builds the indicator set for one parameterization and assembles per-bar
/// snapshots from the precomputed series.
#[derive(Debug, Clone)]
pub struct IndicatorSet {
    params: IndicatorParams,
    stoch_key: String,
    upper_key: String,
    middle_key: String,
    lower_key: String,
    adx_key: String,
    donchian_high_key: String,
    donchian_low_key: String,
}

impl IndicatorSet {
    pub fn new(params: IndicatorParams) -> Self {
        let IndicatorParams {
            period,
            fast_smoothing,
            slow_smoothing,
            dev_factor,
            adx_period,
        } = params;
        Self {
            params,
            stoch_key: format!("stoch_d_{period}_{fast_smoothing}_{slow_smoothing}"),
            upper_key: format!("bollinger_upper_{period}_{dev_factor}"),
            middle_key: format!("bollinger_middle_{period}_{dev_factor}"),
            lower_key: format!("bollinger_lower_{period}_{dev_factor}"),
            adx_key: format!("adx_{adx_period}"),
            donchian_high_key: format!("donchian_upper_{period}"),
            donchian_low_key: format!("donchian_lower_{period}"),
        }
    }

    pub fn params(&self) -> IndicatorParams {
        self.params
    }

    /// The concrete indicators backing this set, for precomputation.
    pub fn indicators(&self) -> Vec<Box<dyn Indicator>> {
        let p = &self.params;
        vec![
            Box::new(Stochastic::percent_d(
                p.period,
                p.fast_smoothing,
                p.slow_smoothing,
            )),
            Box::new(Bollinger::upper(p.period, p.dev_factor)),
            Box::new(Bollinger::middle(p.period, p.dev_factor)),
            Box::new(Bollinger::lower(p.period, p.dev_factor)),
            Box::new(Adx::new(p.adx_period)),
            Box::new(Donchian::upper(p.period)),
            Box::new(Donchian::lower(p.period)),
        ]
    }

    /// Precompute all series for a bar history.
    pub fn precompute(&self, bars: &[Bar]) -> IndicatorValues {
        crate::indicators::precompute(bars, &self.indicators())
    }

    /// Bars needed before every field of the snapshot can be ready.
    pub fn warmup_bars(&self) -> usize {
        crate::indicators::max_lookback(&self.indicators()) + 1
    }

    /// Assemble the snapshot for `bar_index`. Previous-bar fields come from
    /// `bar_index - 1` and are `None` on the first bar.
    pub fn snapshot(&self, values: &IndicatorValues, bar_index: usize) -> IndicatorSnapshot {
        let prev = bar_index.checked_sub(1);
        let at = |key: &str, idx: usize| values.get_ready(key, idx);
        let at_prev = |key: &str| prev.and_then(|p| values.get_ready(key, p));

        IndicatorSnapshot {
            stoch_d: at(&self.stoch_key, bar_index),
            stoch_d_prev: at_prev(&self.stoch_key),
            boll_upper: at(&self.upper_key, bar_index),
            boll_middle: at(&self.middle_key, bar_index),
            boll_lower: at(&self.lower_key, bar_index),
            boll_upper_prev: at_prev(&self.upper_key),
            boll_middle_prev: at_prev(&self.middle_key),
            boll_lower_prev: at_prev(&self.lower_key),
            adx: at(&self.adx_key, bar_index),
            donchian_high: at(&self.donchian_high_key, bar_index),
            donchian_low: at(&self.donchian_low_key, bar_index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn snapshot_not_ready_during_warmup() {
        let set = IndicatorSet::new(IndicatorParams::default());
        let bars = make_bars(&[100.0; 10]);
        let values = set.precompute(&bars);
        let snap = set.snapshot(&values, 5);
        assert!(snap.stoch_d.is_none());
        assert!(snap.adx.is_none());
        assert!(snap.donchian_high.is_none());
    }

    #[test]
    fn snapshot_ready_after_warmup() {
        let set = IndicatorSet::new(IndicatorParams {
            period: 3,
            fast_smoothing: 1,
            slow_smoothing: 1,
            dev_factor: 2.0,
            adx_period: 3,
        });
        // Oscillating closes so stochastic windows are non-degenerate.
        let closes: Vec<f64> = (0..20)
            .map(|i| 100.0 + ((i % 4) as f64) * 3.0)
            .collect();
        let bars = make_bars(&closes);
        let values = set.precompute(&bars);

        let t = set.warmup_bars();
        let snap = set.snapshot(&values, t);
        assert!(snap.stoch_d.is_some());
        assert!(snap.stoch_d_prev.is_some());
        assert!(snap.boll_upper.is_some());
        assert!(snap.boll_middle_prev.is_some());
        assert!(snap.adx.is_some());
        assert!(snap.donchian_high.is_some());
        assert!(snap.donchian_low.is_some());
    }

    #[test]
    fn snapshot_first_bar_has_no_prev() {
        let set = IndicatorSet::new(IndicatorParams::default());
        let bars = make_bars(&[100.0, 101.0]);
        let values = set.precompute(&bars);
        let snap = set.snapshot(&values, 0);
        assert!(snap.stoch_d_prev.is_none());
        assert!(snap.boll_upper_prev.is_none());
    }
}
