pub mod config;
pub mod pipeline;
pub mod registry;
pub mod rules;

pub use config::{FamilyConfig, StrategyFileConfig};
pub use pipeline::DecisionPipeline;
pub use registry::StrategyRegistry;

use common::{MarketSnapshot, OrderSide};

/// All strategy implementations must satisfy this trait.
///
/// Strategies are pure: `evaluate` never reads anything but the snapshot and
/// the strategy's own immutable parameters.
pub trait Strategy: Send + Sync {
    /// Family name reported in decisions, e.g. "LR".
    fn name(&self) -> &str;

    /// The side of the order placed when this strategy fires.
    fn side(&self) -> OrderSide;

    /// Whether the strategy fires on this snapshot.
    fn evaluate(&self, snapshot: &MarketSnapshot) -> bool;
}
