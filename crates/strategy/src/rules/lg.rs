use common::{Error, MarketSnapshot, OrderSide, Result};

/// Band positions inside the prior range, as fractions of `high - low`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LgBands {
    pub lower: f64,
    pub upper: f64,
}

impl LgBands {
    pub const DEFAULT_LOWER: f64 = 0.2;
    pub const DEFAULT_UPPER: f64 = 0.8;

    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        let valid = lower.is_finite()
            && upper.is_finite()
            && (0.0..=1.0).contains(&lower)
            && (0.0..=1.0).contains(&upper)
            && lower < upper;
        if !valid {
            return Err(Error::Config(format!(
                "LG bands must satisfy 0 <= lower < upper <= 1, got lower={lower} upper={upper}"
            )));
        }
        Ok(Self { lower, upper })
    }
}

impl Default for LgBands {
    fn default() -> Self {
        Self {
            lower: Self::DEFAULT_LOWER,
            upper: Self::DEFAULT_UPPER,
        }
    }
}

/// LG: range gauge. Fires on where price sits inside the prior range,
/// without any volume condition.
///
/// Buy above `low + upper * (high - low)`, sell below `low + lower * (high - low)`.
/// A zero-width range degenerates to "above the level" / "below the level".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LgRangeGauge {
    side: OrderSide,
    bands: LgBands,
}

impl LgRangeGauge {
    pub const NAME: &'static str = "LG";

    pub fn buy(bands: LgBands) -> Self {
        Self {
            side: OrderSide::Buy,
            bands,
        }
    }

    pub fn sell(bands: LgBands) -> Self {
        Self {
            side: OrderSide::Sell,
            bands,
        }
    }

    pub fn bands(&self) -> LgBands {
        self.bands
    }
}

impl crate::Strategy for LgRangeGauge {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn side(&self) -> OrderSide {
        self.side
    }

    fn evaluate(&self, s: &MarketSnapshot) -> bool {
        let range = s.previous_high() - s.previous_low();
        match self.side {
            OrderSide::Buy => s.current_price() > s.previous_low() + self.bands.upper * range,
            OrderSide::Sell => s.current_price() < s.previous_low() + self.bands.lower * range,
        }
    }
}
