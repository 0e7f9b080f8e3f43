pub mod lg;
pub mod lr;

pub use lg::{LgBands, LgRangeGauge};
pub use lr::LrBreakout;
