//! Stochastic Oscillator — %K and its double-smoothed %D line.
//!
//! Raw %K[t] = (close[t] - lowestLow(period)) / (highestHigh(period) - lowestLow(period)) * 100
//! over the trailing window including bar t.
//! %K = SMA(raw, fast); %D = SMA(%K, slow) — fast then slow smoothing.
//!
//! The single exposed series is %D; crossover detection reads index t and
//! t-1 from the same series.
//!
//! Lookback: (period - 1) + (fast - 1) + (slow - 1).

use crate::domain::Bar;
use crate::indicators::Indicator;

#[derive(Debug, Clone)]
pub struct Stochastic {
    period: usize,
    fast: usize,
    slow: usize,
    name: String,
}

impl Stochastic {
    pub fn percent_d(period: usize, fast: usize, slow: usize) -> Self {
        assert!(period >= 1, "Stochastic period must be >= 1");
        assert!(fast >= 1 && slow >= 1, "smoothing periods must be >= 1");
        Self {
            period,
            fast,
            slow,
            name: format!("stoch_d_{period}_{fast}_{slow}"),
        }
    }
}

/// Windowed simple moving average over a raw series, NaN-propagating:
/// any NaN in the window yields NaN at that index.
fn sma_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if n < period {
        return result;
    }
    for i in (period - 1)..n {
        let window = &values[(i + 1 - period)..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = window.iter().sum::<f64>() / period as f64;
    }
    result
}

impl Indicator for Stochastic {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        (self.period - 1) + (self.fast - 1) + (self.slow - 1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut raw_k = vec![f64::NAN; n];

        if n < self.period {
            return raw_k;
        }

        for i in (self.period - 1)..n {
            let window = &bars[(i + 1 - self.period)..=i];

            let mut highest = f64::NEG_INFINITY;
            let mut lowest = f64::INFINITY;
            let mut has_nan = false;
            for bar in window {
                if bar.high.is_nan() || bar.low.is_nan() {
                    has_nan = true;
                    break;
                }
                highest = highest.max(bar.high);
                lowest = lowest.min(bar.low);
            }

            let close = bars[i].close;
            if has_nan || close.is_nan() {
                continue;
            }

            let range = highest - lowest;
            if range == 0.0 {
                // Degenerate window (no price movement): no reading.
                continue;
            }
            raw_k[i] = (close - lowest) / range * 100.0;
        }

        let percent_k = sma_series(&raw_k, self.fast);
        sma_series(&percent_k, self.slow)
    }
}
