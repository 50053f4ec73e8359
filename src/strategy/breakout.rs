//! Breakout detection on runs of same-colored one-minute candles, confirmed
//! against the hourly timeframe.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::{AccountPair, OrderRequest};
use crate::models::{Account, Candle, CandleColor, KlineInterval, Side};

use super::PollingStrategy;

/// Breakout detector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakoutConfig {
    /// One-minute candles fetched per tick
    pub lookback: u32,
    /// Shortest run that can break out
    pub min_run_length: usize,
    /// Hourly candles inspected for confirmation
    pub confirmation_candles: u32,
    /// Contracts per breakout order
    pub order_qty: u64,
    pub tick_secs: u64,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self {
            lookback: 20,
            min_run_length: 2,
            confirmation_candles: 3,
            order_qty: 1,
            tick_secs: 60,
        }
    }
}

/// The maximal run of same-colored candles ending at the latest candle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandleRun {
    pub color: CandleColor,
    pub start_time: DateTime<Utc>,
    pub len: usize,
    pub min_low: Decimal,
    pub max_high: Decimal,
}

/// Build the trailing run from candles ordered oldest first.
pub fn trailing_run(candles: &[Candle]) -> Option<CandleRun> {
    let last = candles.last()?;
    let color = last.color();

    let mut run = CandleRun {
        color,
        start_time: last.open_time,
        len: 0,
        min_low: last.low,
        max_high: last.high,
    };

    for candle in candles.iter().rev().take_while(|c| c.color() == color) {
        run.start_time = candle.open_time;
        run.len += 1;
        run.min_low = run.min_low.min(candle.low);
        run.max_high = run.max_high.max(candle.high);
    }

    Some(run)
}

/// Most extreme levels of confirmed breakouts, per direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermarks {
    pub buy_low: Decimal,
    pub sell_high: Decimal,
}

impl Default for Watermarks {
    fn default() -> Self {
        // The first breakout in either direction always qualifies
        Self {
            buy_low: Decimal::ZERO,
            sell_high: Decimal::MAX,
        }
    }
}

impl Watermarks {
    /// Move the watermark for `side` to the run's extreme.
    pub fn confirm(&mut self, side: Side, run: &CandleRun) {
        match side {
            Side::Buy => self.buy_low = run.min_low,
            Side::Sell => self.sell_high = run.max_high,
        }
    }
}

/// Direction of a breakout, if the run forms one.
///
/// A green run breaks out when its lowest low is above the buy watermark; a
/// red run when its highest high is below the sell watermark.
pub fn breakout_side(
    run: &CandleRun,
    watermarks: &Watermarks,
    min_run_length: usize,
) -> Option<Side> {
    if run.len < min_run_length {
        return None;
    }

    match run.color {
        CandleColor::Green if run.min_low > watermarks.buy_low => Some(Side::Buy),
        CandleColor::Red if run.max_high < watermarks.sell_high => Some(Side::Sell),
        _ => None,
    }
}

/// Whether any hourly candle opened at or after `run_start` moved in the
/// breakout direction.
pub fn confirms(side: Side, run_start: DateTime<Utc>, hourly: &[Candle]) -> bool {
    hourly
        .iter()
        .filter(|c| c.open_time >= run_start)
        .any(|c| match side {
            Side::Buy => c.high > c.open,
            Side::Sell => c.low < c.open,
        })
}

/// Places market orders on confirmed breakouts.
///
/// Market data is read through the main account; orders go to the account
/// that owns the breakout's direction.
pub struct BreakoutDetector {
    accounts: AccountPair,
    symbol: String,
    config: BreakoutConfig,
    watermarks: Watermarks,
}

impl BreakoutDetector {
    pub fn new(accounts: AccountPair, symbol: &str, config: BreakoutConfig) -> Self {
        Self {
            accounts,
            symbol: symbol.to_string(),
            config,
            watermarks: Watermarks::default(),
        }
    }

    #[cfg(test)]
    pub fn watermarks(&self) -> Watermarks {
        self.watermarks
    }
}

#[async_trait]
impl PollingStrategy for BreakoutDetector {
    fn name(&self) -> &'static str {
        "breakout"
    }

    async fn tick(&mut self) -> anyhow::Result<()> {
        let market = &self.accounts.main;

        let candles = market
            .klines(&self.symbol, KlineInterval::OneMinute, self.config.lookback)
            .await?;
        let Some(run) = trailing_run(&candles) else {
            debug!(symbol = %self.symbol, "No candles returned, skipping tick");
            return Ok(());
        };

        let Some(side) = breakout_side(&run, &self.watermarks, self.config.min_run_length) else {
            debug!(color = ?run.color, len = run.len, "No breakout");
            return Ok(());
        };

        info!(
            symbol = %self.symbol,
            side = %side,
            len = run.len,
            low = %run.min_low,
            high = %run.max_high,
            "Breakout detected"
        );

        let hourly = market
            .klines(
                &self.symbol,
                KlineInterval::OneHour,
                self.config.confirmation_candles,
            )
            .await?;
        if !confirms(side, run.start_time, &hourly) {
            info!(symbol = %self.symbol, side = %side, "Breakout not confirmed on hourly");
            return Ok(());
        }

        let account = Account::for_side(side);
        let order = OrderRequest::market(&self.symbol, side, Decimal::from(self.config.order_qty));
        let ack = self.accounts.get(account).place_order(&order).await?;

        self.watermarks.confirm(side, &run);

        info!(
            account = %account,
            symbol = %self.symbol,
            side = %side,
            qty = self.config.order_qty,
            order_id = %ack.order_id,
            "Breakout order placed"
        );

        Ok(())
    }
}
