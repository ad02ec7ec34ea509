//! Serializable run configuration.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use swinglab_core::engine::EngineConfig;
use swinglab_core::indicators::snapshot::IndicatorParams;
use swinglab_core::strategy::{
    BollingerAdxMeanReversion, StochasticCrossover, StrategyPolicy,
};

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

/// Configuration for a single backtest run, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    pub backtest: BacktestSection,
    #[serde(default)]
    pub indicators: IndicatorsSection,
    pub strategy: StrategyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestSection {
    pub symbol: String,
    pub initial_cash: f64,
    /// Commission per fill as a fraction of notional (0.001 = 10 bps).
    pub commission_rate: f64,
    pub order_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndicatorsSection {
    pub period: usize,
    pub fast_smoothing: usize,
    pub slow_smoothing: usize,
    pub dev_factor: f64,
    pub adx_period: usize,
}

impl Default for IndicatorsSection {
    fn default() -> Self {
        let p = IndicatorParams::default();
        Self {
            period: p.period,
            fast_smoothing: p.fast_smoothing,
            slow_smoothing: p.slow_smoothing,
            dev_factor: p.dev_factor,
            adx_period: p.adx_period,
        }
    }
}

/// Strategy policy selection (serializable tagged enum).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// Stochastic %D crossovers with Donchian + fixed-offset OCO stops.
    StochasticSr {
        upper_limit: f64,
        lower_limit: f64,
        stop_offset: f64,
    },
    /// Bollinger mean reversion gated by ADX.
    BollingerAdx { adx_max: f64 },
}

impl RunConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Deterministic hash id for this configuration. Two identical configs
    /// share a RunId, so sweep rows and artifacts are content-addressed.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("RunConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    pub fn indicator_params(&self) -> IndicatorParams {
        IndicatorParams {
            period: self.indicators.period,
            fast_smoothing: self.indicators.fast_smoothing,
            slow_smoothing: self.indicators.slow_smoothing,
            dev_factor: self.indicators.dev_factor,
            adx_period: self.indicators.adx_period,
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            initial_cash: self.backtest.initial_cash,
            commission_rate: self.backtest.commission_rate,
            order_size: self.backtest.order_size,
        }
    }

    pub fn build_policy(&self) -> Box<dyn StrategyPolicy> {
        match &self.strategy {
            StrategyConfig::StochasticSr {
                upper_limit,
                lower_limit,
                stop_offset,
            } => Box::new(StochasticCrossover::new(
                *upper_limit,
                *lower_limit,
                *stop_offset,
            )),
            StrategyConfig::BollingerAdx { adx_max } => {
                Box::new(BollingerAdxMeanReversion::new(*adx_max))
            }
        }
    }
}
