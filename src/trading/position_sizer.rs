//! Risk-based position sizing in whole contracts.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::TradeError;

use super::TradingConfig;

/// Turns account equity and stop distance into an order quantity.
pub struct PositionSizer {
    config: TradingConfig,
}

impl PositionSizer {
    pub fn new(config: TradingConfig) -> Self {
        Self { config }
    }

    /// Calculate the order quantity for a new entry.
    ///
    /// # Arguments
    /// * `total_equity` - Combined USDT equity of both accounts
    /// * `account_equity` - USDT equity of the account taking the trade
    /// * `entry` - Entry price
    /// * `stop_loss` - Stop-loss price
    ///
    /// # Returns
    /// The smaller of the risk-based and margin-capped quantity, rounded to a
    /// whole contract and never below one.
    pub fn calculate_quantity(
        &self,
        total_equity: Decimal,
        account_equity: Decimal,
        entry: Decimal,
        stop_loss: Decimal,
    ) -> Result<u64, TradeError> {
        let invalid = || TradeError::InvalidRiskParameters { entry, stop_loss };

        let stop_distance = entry.checked_sub(stop_loss).ok_or_else(invalid)?.abs();
        if entry <= Decimal::ZERO || stop_distance.is_zero() {
            return Err(invalid());
        }

        // Risk a fixed fraction of combined equity over the stop distance
        let risk_qty = (total_equity * self.config.risk_fraction)
            .checked_div(stop_distance)
            .ok_or_else(invalid)?;

        // Leveraged buying power of the trading account
        let max_qty = account_equity
            .checked_mul(self.config.leverage)
            .and_then(|power| power.checked_div(entry))
            .and_then(|qty| qty.checked_mul(self.config.margin_utilization))
            .ok_or_else(invalid)?;

        let qty = risk_qty.min(max_qty).round();
        let qty = qty.to_u64().unwrap_or(0);

        Ok(qty.max(1))
    }
}
