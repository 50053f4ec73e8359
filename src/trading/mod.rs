//! Trading logic: sizing, targeting, execution, rebalancing, signal routing.

mod config;
mod executor;
mod position_sizer;
mod price;
mod rebalancer;
mod router;
mod target;
mod tracker;

pub use config::TradingConfig;
pub use executor::TradeExecutor;
pub use position_sizer::PositionSizer;
pub use rebalancer::{FundRebalancer, RebalanceOutcome};
pub use router::{SignalResponse, SignalRouter};
pub use target::{TargetAdapter, TargetMode};
pub use tracker::TradeOutcomeTracker;
