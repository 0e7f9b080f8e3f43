use tracing::info;

use common::{Error, MarketSnapshot, Result};

use crate::config::{FamilyConfig, StrategyFileConfig};
use crate::rules::{LgBands, LgRangeGauge, LrBreakout};
use crate::Strategy;

/// Ordered set of strategies. Position in the registry is priority:
/// the first strategy that fires on a snapshot wins.
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn Strategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// LR-buy, LR-sell, LG-buy, LG-sell.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(LrBreakout::buy()));
        registry.register(Box::new(LrBreakout::sell()));
        registry.register(Box::new(LgRangeGauge::buy(LgBands::default())));
        registry.register(Box::new(LgRangeGauge::sell(LgBands::default())));
        registry
    }

    /// Build the registry from config. Unknown families and invalid
    /// parameters are rejected.
    pub fn from_config(file_cfg: &StrategyFileConfig) -> Result<Self> {
        if file_cfg.families.is_empty() {
            return Err(Error::Config("strategy config declares no families".into()));
        }
        let mut registry = Self::new();
        for cfg in &file_cfg.families {
            let (buy, sell) = build_family(cfg)?;
            registry.register(buy);
            registry.register(sell);
        }
        Ok(registry)
    }

    /// Append a strategy at the lowest priority.
    pub fn register(&mut self, strategy: Box<dyn Strategy>) {
        info!(
            name = %strategy.name(),
            side = %strategy.side(),
            priority = self.strategies.len(),
            "Registered strategy"
        );
        self.strategies.push(strategy);
    }

    /// First strategy, in priority order, that fires on the snapshot.
    /// Later strategies are not evaluated once one fires.
    pub fn first_match(&self, snapshot: &MarketSnapshot) -> Option<&dyn Strategy> {
        self.strategies
            .iter()
            .map(|s| s.as_ref())
            .find(|s| s.evaluate(snapshot))
    }

    /// `(name, side)` labels in priority order, e.g. `"LR-BUY"`.
    pub fn labels(&self) -> Vec<String> {
        self.strategies
            .iter()
            .map(|s| format!("{}-{}", s.name(), s.side()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

// ─── Family builders ──────────────────────────────────────────────────────────

const LOWER_BAND: &str = "lower_band";
const UPPER_BAND: &str = "upper_band";

fn build_family(cfg: &FamilyConfig) -> Result<(Box<dyn Strategy>, Box<dyn Strategy>)> {
    match cfg.family_type.as_str() {
        "lr" => {
            cfg.check_params(&[])?;
            Ok((Box::new(LrBreakout::buy()), Box::new(LrBreakout::sell())))
        }
        "lg" => {
            cfg.check_params(&[LOWER_BAND, UPPER_BAND])?;
            let bands = LgBands::new(
                cfg.param_f64(LOWER_BAND, LgBands::DEFAULT_LOWER)?,
                cfg.param_f64(UPPER_BAND, LgBands::DEFAULT_UPPER)?,
            )?;
            Ok((
                Box::new(LgRangeGauge::buy(bands)),
                Box::new(LgRangeGauge::sell(bands)),
            ))
        }
        other => Err(Error::Config(format!("unknown strategy family '{other}'"))),
    }
}
