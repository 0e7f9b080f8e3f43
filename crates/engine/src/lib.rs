pub mod candles;
pub mod instruments;
pub mod normalizer;
pub mod smartapi;

pub use candles::{CandleService, SymbolCandles};
pub use instruments::{
    lookup, resolve_token, ScripMasterClient, TokenLookup, TokenQuery, STRIKE_SCALE,
};
pub use normalizer::normalize;
pub use smartapi::SmartApiClient;
