//! Candlesticks and their Heikin-Ashi derivation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Candle color: green when it closed above its open, red otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandleColor {
    Green,
    Red,
}

impl CandleColor {
    pub fn of(open: Decimal, close: Decimal) -> Self {
        if close > open {
            CandleColor::Green
        } else {
            CandleColor::Red
        }
    }
}

/// Kline granularity used by the strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KlineInterval {
    OneMinute,
    OneHour,
}

impl KlineInterval {
    /// Interval code in the exchange's kline query.
    pub fn as_str(&self) -> &'static str {
        match self {
            KlineInterval::OneMinute => "1",
            KlineInterval::OneHour => "60",
        }
    }
}

/// OHLC candle as fetched from the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(default)]
    pub volume: Decimal,
    #[serde(default)]
    pub turnover: Decimal,
}

impl Candle {
    pub fn color(&self) -> CandleColor {
        CandleColor::of(self.open, self.close)
    }
}

/// Smoothed candle derived from a raw candle and its Heikin-Ashi predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeikinAshiCandle {
    pub time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

impl HeikinAshiCandle {
    pub fn color(&self) -> CandleColor {
        CandleColor::of(self.open, self.close)
    }
}
