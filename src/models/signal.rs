//! Inbound webhook signal and trade direction.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::TradeError;

/// Direction of a trade, spelled the way the exchange expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "Buy",
            Side::Sell => "Sell",
        }
    }

    /// The side that reduces a position opened on `self`.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Parse the exchange's position side. Flat positions report an empty side.
    pub fn from_exchange(s: &str) -> Option<Self> {
        match s {
            "Buy" => Some(Side::Buy),
            "Sell" => Some(Side::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry, stop-loss, and take-profit prices carried by an open-trade signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeLevels {
    pub entry: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
}

/// A parsed webhook signal.
///
/// ```text
/// TRXUSDT
/// buy
/// entry: 0.30
/// sl: 0.29
/// tp: 0.33
/// ```
///
/// A signal without all three price fields asks to close the account's position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub symbol: String,
    pub side: Side,
    pub entry: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
}

impl Signal {
    pub fn parse(body: &str) -> Result<Self, TradeError> {
        let lines: Vec<&str> = body.trim().lines().collect();
        if lines.len() < 2 {
            return Err(TradeError::BadFormat);
        }

        let symbol = lines[0].trim().to_uppercase();
        let side = if lines[1].to_lowercase().contains("buy") {
            Side::Buy
        } else {
            Side::Sell
        };

        let mut entry = None;
        let mut stop_loss = None;
        let mut take_profit = None;

        for line in &lines {
            let lower = line.to_lowercase();
            if lower.contains("entry:") {
                entry = Some(parse_field("entry", line)?);
            } else if lower.contains("sl:") {
                stop_loss = Some(parse_field("sl", line)?);
            } else if lower.contains("tp:") {
                take_profit = Some(parse_field("tp", line)?);
            }
        }

        Ok(Self {
            symbol,
            side,
            entry,
            stop_loss,
            take_profit,
        })
    }

    /// All three price levels, or `None` for a close signal.
    pub fn levels(&self) -> Option<TradeLevels> {
        Some(TradeLevels {
            entry: self.entry?,
            stop_loss: self.stop_loss?,
            take_profit: self.take_profit?,
        })
    }
}

fn parse_field(field: &'static str, line: &str) -> Result<Decimal, TradeError> {
    let value = line.split_once(':').map(|(_, v)| v.trim()).unwrap_or_default();

    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .map_err(|_| TradeError::Parse {
            field,
            value: value.to_string(),
        })
}
