//! Heikin-Ashi candles and a classifier that reports the latest one's color.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::api::{Exchange, ExchangeError};
use crate::models::{Candle, HeikinAshiCandle, KlineInterval};

use super::PollingStrategy;

/// Raw candles fetched per classification.
const WINDOW: u32 = 2;

/// Convert raw candles (oldest first) into Heikin-Ashi candles.
pub fn heikin_ashi(candles: &[Candle]) -> Vec<HeikinAshiCandle> {
    let mut out: Vec<HeikinAshiCandle> = Vec::with_capacity(candles.len());

    for candle in candles {
        let open = match out.last() {
            Some(prev) => (prev.open + prev.close) / Decimal::TWO,
            None => (candle.open + candle.close) / Decimal::TWO,
        };
        let close = (candle.open + candle.high + candle.low + candle.close) / Decimal::from(4);

        out.push(HeikinAshiCandle {
            time: candle.open_time,
            open,
            high: candle.high.max(open).max(close),
            low: candle.low.min(open).min(close),
            close,
        });
    }

    out
}

/// Reports the color of the most recent Heikin-Ashi candle. Observational
/// only; it never places orders.
pub struct HeikinAshiClassifier {
    exchange: Arc<dyn Exchange>,
    symbol: String,
    interval: KlineInterval,
}

impl HeikinAshiClassifier {
    pub fn new(exchange: Arc<dyn Exchange>, symbol: &str) -> Self {
        Self {
            exchange,
            symbol: symbol.to_string(),
            interval: KlineInterval::OneMinute,
        }
    }

    /// Latest Heikin-Ashi candle, or `None` when the exchange returned no data.
    pub async fn classify(&self) -> Result<Option<HeikinAshiCandle>, ExchangeError> {
        let candles = self
            .exchange
            .klines(&self.symbol, self.interval, WINDOW)
            .await?;

        Ok(heikin_ashi(&candles).pop())
    }
}

#[async_trait]
impl PollingStrategy for HeikinAshiClassifier {
    fn name(&self) -> &'static str {
        "heikin-ashi"
    }

    async fn tick(&mut self) -> anyhow::Result<()> {
        match self.classify().await? {
            Some(candle) => info!(
                symbol = %self.symbol,
                color = ?candle.color(),
                open = %candle.open,
                close = %candle.close,
                "Heikin-Ashi candle"
            ),
            None => debug!(symbol = %self.symbol, "No candles returned"),
        }
        Ok(())
    }
}
