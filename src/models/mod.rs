//! Data models for signals, accounts, candles, and trade outcomes.

mod account;
mod candle;
mod outcome;
mod signal;

pub use account::Account;
pub use candle::{Candle, CandleColor, HeikinAshiCandle, KlineInterval};
pub use outcome::{TradeLogEntry, TradeOutcome, TradeOutcomeState};
pub use signal::{Side, Signal, TradeLevels};
