//! Trading configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Risk, sizing, target, and rebalancing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Fraction of combined equity risked per trade (0.0 to 1.0)
    pub risk_fraction: Decimal,

    /// Leverage applied when capping size by margin
    pub leverage: Decimal,

    /// Share of the account's leveraged buying power a single entry may use
    pub margin_utilization: Decimal,

    /// Multiple of the risk distance used for a boosted target
    pub boost_risk_multiple: Decimal,

    /// Extra distance added to a boosted target, as a fraction of entry
    pub boost_entry_skew: Decimal,

    /// Equity difference (USDT) below which the accounts count as balanced
    pub rebalance_tolerance: Decimal,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            risk_fraction: dec!(0.10),        // Risk 10% of combined equity
            leverage: dec!(75),               // 75x
            margin_utilization: dec!(0.9),    // Use at most 90% of buying power
            boost_risk_multiple: dec!(1.5),   // 1.5R after a losing flip
            boost_entry_skew: dec!(0.005),    // Plus 0.5% of entry
            rebalance_tolerance: dec!(0.1),   // 10 cents
        }
    }
}
