use common::{MarketSnapshot, OrderSide};

use crate::Strategy;

/// LR: breakout beyond the prior range, confirmed by above-average volume.
///
/// Buy when price trades above the previous high, sell when it trades below
/// the previous low. Every comparison is strict: touching the level or
/// matching the average volume is not a breakout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LrBreakout {
    side: OrderSide,
}

impl LrBreakout {
    pub const NAME: &'static str = "LR";

    pub fn buy() -> Self {
        Self { side: OrderSide::Buy }
    }

    pub fn sell() -> Self {
        Self { side: OrderSide::Sell }
    }
}

impl Strategy for LrBreakout {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn side(&self) -> OrderSide {
        self.side
    }

    fn evaluate(&self, s: &MarketSnapshot) -> bool {
        let volume_confirmed = s.current_volume() > s.average_volume();
        match self.side {
            OrderSide::Buy => s.current_price() > s.previous_high() && volume_confirmed,
            OrderSide::Sell => s.current_price() < s.previous_low() && volume_confirmed,
        }
    }
}
