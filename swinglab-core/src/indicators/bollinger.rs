//! Bollinger Bands — moving average +/- standard deviation multiplier.
//!
//! Three bands (separate Indicator instances):
//! - Middle: SMA(close, period)
//! - Upper: middle + dev_factor * stddev(close, period)
//! - Lower: middle - dev_factor * stddev(close, period)
//!
//! Uses population stddev (divide by N).
//! Lookback: period - 1.

use crate::domain::Bar;
use crate::indicators::Indicator;

/// Which band of the Bollinger Bands to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    dev_factor: f64,
    band: BollingerBand,
    name: String,
}

impl Bollinger {
    fn new(period: usize, dev_factor: f64, band: BollingerBand, tag: &str) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        assert!(
            dev_factor > 0.0 && dev_factor.is_finite(),
            "dev_factor must be positive and finite"
        );
        Self {
            period,
            dev_factor,
            band,
            name: format!("bollinger_{tag}_{period}_{dev_factor}"),
        }
    }

    pub fn upper(period: usize, dev_factor: f64) -> Self {
        Self::new(period, dev_factor, BollingerBand::Upper, "upper")
    }

    pub fn middle(period: usize, dev_factor: f64) -> Self {
        Self::new(period, dev_factor, BollingerBand::Middle, "middle")
    }

    pub fn lower(period: usize, dev_factor: f64) -> Self {
        Self::new(period, dev_factor, BollingerBand::Lower, "lower")
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period {
            return result;
        }

        for i in (self.period - 1)..n {
            let window = &bars[(i + 1 - self.period)..=i];

            if window.iter().any(|b| b.close.is_nan()) {
                continue;
            }

            let mean = window.iter().map(|b| b.close).sum::<f64>() / self.period as f64;

            result[i] = match self.band {
                BollingerBand::Middle => mean,
                BollingerBand::Upper | BollingerBand::Lower => {
                    // Population stddev
                    let variance = window
                        .iter()
                        .map(|b| {
                            let diff = b.close - mean;
                            diff * diff
                        })
                        .sum::<f64>()
                        / self.period as f64;
                    let offset = self.dev_factor * variance.sqrt();
                    if self.band == BollingerBand::Upper {
                        mean + offset
                    } else {
                        mean - offset
                    }
                }
            };
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn bollinger_middle_is_sma() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let bb_mid = Bollinger::middle(3, 2.0);
        let result = bb_mid.compute(&bars);

        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        // SMA[2] = mean(10,11,12) = 11.0
        assert_approx(result[2], 11.0, DEFAULT_EPSILON);
        // SMA[3] = mean(11,12,13) = 12.0
        assert_approx(result[3], 12.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bollinger_bands_symmetric() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let upper = Bollinger::upper(3, 2.0).compute(&bars);
        let middle = Bollinger::middle(3, 2.0).compute(&bars);
        let lower = Bollinger::lower(3, 2.0).compute(&bars);

        for i in 2..5 {
            let half_width = upper[i] - middle[i];
            assert_approx(middle[i] - lower[i], half_width, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn bollinger_constant_price_zero_width() {
        let bars = make_bars(&[100.0, 100.0, 100.0, 100.0]);
        let upper = Bollinger::upper(3, 2.0).compute(&bars);
        let lower = Bollinger::lower(3, 2.0).compute(&bars);

        // Constant price: stddev = 0, bands collapse onto the SMA.
        assert_approx(upper[2], 100.0, DEFAULT_EPSILON);
        assert_approx(lower[2], 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bollinger_nan_propagation() {
        let mut bars = make_bars(&[10.0, 11.0, 12.0, 13.0]);
        bars[2].close = f64::NAN;
        let result = Bollinger::upper(3, 2.0).compute(&bars);
        assert!(result[2].is_nan());
        assert!(result[3].is_nan()); // window includes NaN bar 2
    }

    #[test]
    fn bollinger_lookback() {
        assert_eq!(Bollinger::upper(20, 2.0).lookback(), 19);
    }

    #[test]
    #[should_panic(expected = "dev_factor must be positive and finite")]
    fn rejects_nan_dev_factor() {
        Bollinger::upper(20, f64::NAN);
    }
}
