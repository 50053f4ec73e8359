//! Polling strategies driven by market data rather than webhook signals.

mod breakout;
mod heikin_ashi;

pub use breakout::{BreakoutConfig, BreakoutDetector};
pub use heikin_ashi::HeikinAshiClassifier;

use async_trait::async_trait;

/// A strategy evaluated once per tick by [`crate::tasks::run_periodic`].
#[async_trait]
pub trait PollingStrategy: Send {
    fn name(&self) -> &'static str;

    /// One fetch-decide-act pass. Errors are logged by the runner and the
    /// next tick proceeds normally.
    async fn tick(&mut self) -> anyhow::Result<()>;
}
