//! Take-profit targeting with the boosted recovery mode.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::TradeError;
use crate::models::{Side, TradeOutcomeState};

use super::TradingConfig;

/// Whether the target was enlarged to recover a previous loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetMode {
    Normal,
    Boosted,
}

impl fmt::Display for TargetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetMode::Normal => "NORMAL",
            TargetMode::Boosted => "BOOSTED",
        })
    }
}

/// Computed take-profit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TakeProfit {
    pub price: Decimal,
    pub mode: TargetMode,
}

/// Derives the take-profit from entry, stop, and the previous trade.
pub struct TargetAdapter {
    config: TradingConfig,
}

impl TargetAdapter {
    pub fn new(config: TradingConfig) -> Self {
        Self { config }
    }

    /// One risk unit past entry normally. After a losing trade in the other
    /// direction the target moves to 1.5R plus a skew proportional to entry.
    ///
    /// Prices that overflow the decimal range are rejected as invalid risk.
    pub fn take_profit(
        &self,
        side: Side,
        entry: Decimal,
        stop_loss: Decimal,
        previous: &TradeOutcomeState,
    ) -> Result<TakeProfit, TradeError> {
        let invalid = || TradeError::InvalidRiskParameters { entry, stop_loss };

        let risk = entry.checked_sub(stop_loss).ok_or_else(invalid)?.abs();

        let (distance, mode) = if previous.boost_applies(side) {
            let stretched = self
                .config
                .boost_risk_multiple
                .checked_mul(risk)
                .ok_or_else(invalid)?;
            let skew = self
                .config
                .boost_entry_skew
                .checked_mul(entry)
                .ok_or_else(invalid)?;
            (stretched.checked_add(skew).ok_or_else(invalid)?, TargetMode::Boosted)
        } else {
            (risk, TargetMode::Normal)
        };

        let price = match side {
            Side::Buy => entry.checked_add(distance),
            Side::Sell => entry.checked_sub(distance),
        }
        .ok_or_else(invalid)?;

        Ok(TakeProfit { price, mode })
    }
}
