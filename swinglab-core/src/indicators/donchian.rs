//! Donchian Channel — highest high / lowest low over a trailing window,
//! excluding the bar the value is reported on.
//!
//! Value at bar t covers bars [t-period, t), so a decision made on bar t
//! never sees bar t's own extremes (lookahead guard). Lookback is therefore
//! `period`, one more than an inclusive-window variant.
//!
//! Two series (exposed as separate Indicator instances):
//! - Upper: max(high[t-period..t])
//! - Lower: min(low[t-period..t])

use crate::domain::Bar;
use crate::indicators::Indicator;

/// Which band of the Donchian channel to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonchianBand {
    Upper,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Donchian {
    period: usize,
    band: DonchianBand,
    name: String,
}

impl Donchian {
    pub fn upper(period: usize) -> Self {
        assert!(period >= 1, "Donchian period must be >= 1");
        Self {
            period,
            band: DonchianBand::Upper,
            name: format!("donchian_upper_{period}"),
        }
    }

    pub fn lower(period: usize) -> Self {
        assert!(period >= 1, "Donchian period must be >= 1");
        Self {
            period,
            band: DonchianBand::Lower,
            name: format!("donchian_lower_{period}"),
        }
    }
}

impl Indicator for Donchian {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        if n <= self.period {
            return result;
        }

        for i in self.period..n {
            let window = &bars[(i - self.period)..i];

            match self.band {
                DonchianBand::Upper => {
                    let mut max_val = f64::NEG_INFINITY;
                    let mut has_nan = false;
                    for bar in window {
                        if bar.high.is_nan() {
                            has_nan = true;
                            break;
                        }
                        max_val = max_val.max(bar.high);
                    }
                    if !has_nan {
                        result[i] = max_val;
                    }
                }
                DonchianBand::Lower => {
                    let mut min_val = f64::INFINITY;
                    let mut has_nan = false;
                    for bar in window {
                        if bar.low.is_nan() {
                            has_nan = true;
                            break;
                        }
                        min_val = min_val.min(bar.low);
                    }
                    if !has_nan {
                        result[i] = min_val;
                    }
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};
    use chrono::NaiveDate;

    fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
        let base_date = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| Bar {
                symbol: "TEST".to_string(),
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                volume: 1000,
            })
            .collect()
    }

    #[test]
    fn donchian_upper_excludes_current_bar() {
        let bars = make_ohlc_bars(&[
            (10.0, 12.0, 9.0, 11.0),
            (11.0, 15.0, 10.0, 14.0),
            (14.0, 14.0, 13.0, 13.5),
            (13.5, 16.0, 12.0, 15.0),
            (15.0, 15.5, 14.0, 14.5),
        ]);
        let result = Donchian::upper(3).compute(&bars);

        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert!(result[2].is_nan());
        // [3] = max over bars 0..3 highs (12, 15, 14) = 15 — bar 3's own
        // high of 16 is not visible.
        assert_approx(result[3], 15.0, DEFAULT_EPSILON);
        // [4] = max(15, 14, 16) = 16
        assert_approx(result[4], 16.0, DEFAULT_EPSILON);
    }

    #[test]
    fn donchian_lower_excludes_current_bar() {
        let bars = make_ohlc_bars(&[
            (10.0, 12.0, 9.0, 11.0),
            (11.0, 15.0, 10.0, 14.0),
            (14.0, 14.0, 13.0, 13.5),
            (13.5, 16.0, 8.0, 15.0),
        ]);
        let result = Donchian::lower(3).compute(&bars);

        // [3] = min over bars 0..3 lows (9, 10, 13) = 9 — bar 3's own low
        // of 8 is not visible.
        assert_approx(result[3], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn donchian_nan_propagation() {
        let mut bars = make_ohlc_bars(&[
            (10.0, 12.0, 9.0, 11.0),
            (11.0, 15.0, 10.0, 14.0),
            (14.0, 14.0, 13.0, 13.5),
            (13.5, 16.0, 12.0, 15.0),
        ]);
        bars[1].high = f64::NAN;
        bars[1].low = f64::NAN;

        assert!(Donchian::upper(3).compute(&bars)[3].is_nan());
        assert!(Donchian::lower(3).compute(&bars)[3].is_nan());
    }

    #[test]
    fn donchian_lookback() {
        assert_eq!(Donchian::upper(20).lookback(), 20);
        assert_eq!(Donchian::lower(1).lookback(), 1);
    }
}
