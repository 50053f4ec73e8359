//! In-memory exchange used by unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::time::sleep;

use crate::models::{Candle, KlineInterval};

use super::exchange::{
    Exchange, ExchangeError, OrderAck, OrderRequest, PositionInfo, TransferDirection,
};

/// Serves canned data and records every order and transfer it receives.
#[derive(Default)]
pub struct MockExchange {
    /// `None` makes the balance query fail.
    pub equity: Mutex<Option<Decimal>>,
    pub positions: Mutex<Vec<PositionInfo>>,
    pub tick_size: Mutex<Decimal>,
    pub klines: Mutex<HashMap<&'static str, Vec<Candle>>>,
    pub orders: Mutex<Vec<OrderRequest>>,
    pub transfers: Mutex<Vec<(TransferDirection, Decimal, String)>>,
    /// Number of orders accepted before every further order is rejected.
    pub accept_orders: Mutex<Option<usize>>,
    pub fail_transfers: Mutex<bool>,
    /// Pause before answering a balance query or accepting an order.
    pub latency: Mutex<Duration>,
    /// When set, transfers move equity between this account and the peer.
    pub transfer_peer: Mutex<Option<Arc<MockExchange>>>,
}

impl MockExchange {
    pub fn with_equity(equity: Decimal) -> Arc<Self> {
        let mock = Self::default();
        *mock.equity.lock().unwrap() = Some(equity);
        *mock.tick_size.lock().unwrap() = Decimal::new(1, 5);
        Arc::new(mock)
    }

    pub fn set_klines(&self, interval: KlineInterval, candles: Vec<Candle>) {
        self.klines.lock().unwrap().insert(interval.as_str(), candles);
    }

    pub fn orders(&self) -> Vec<OrderRequest> {
        self.orders.lock().unwrap().clone()
    }

    pub fn transfers(&self) -> Vec<(TransferDirection, Decimal, String)> {
        self.transfers.lock().unwrap().clone()
    }

    async fn delay(&self) {
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            sleep(latency).await;
        }
    }

    fn shift_equity(&self, delta: Decimal) {
        if let Some(equity) = self.equity.lock().unwrap().as_mut() {
            *equity += delta;
        }
    }

    fn rejected(message: &str) -> ExchangeError {
        ExchangeError::Api {
            code: 10001,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl Exchange for MockExchange {
    async fn usdt_equity(&self) -> Result<Decimal, ExchangeError> {
        self.delay().await;
        self.equity
            .lock()
            .unwrap()
            .ok_or_else(|| Self::rejected("balance unavailable"))
    }

    async fn positions(&self, symbol: &str) -> Result<Vec<PositionInfo>, ExchangeError> {
        Ok(self
            .positions
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.symbol == symbol)
            .cloned()
            .collect())
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck, ExchangeError> {
        self.delay().await;
        let mut orders = self.orders.lock().unwrap();
        if let Some(limit) = *self.accept_orders.lock().unwrap() {
            if orders.len() >= limit {
                return Err(Self::rejected("order rejected"));
            }
        }

        orders.push(order.clone());
        Ok(OrderAck {
            order_id: format!("order-{}", orders.len()),
            order_link_id: order.order_link_id.clone().unwrap_or_default(),
        })
    }

    async fn tick_size(&self, _symbol: &str) -> Result<Decimal, ExchangeError> {
        Ok(*self.tick_size.lock().unwrap())
    }

    async fn klines(
        &self,
        _symbol: &str,
        interval: KlineInterval,
        limit: u32,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let klines = self.klines.lock().unwrap();
        let candles = klines.get(interval.as_str()).cloned().unwrap_or_default();
        let skip = candles.len().saturating_sub(limit as usize);
        Ok(candles.into_iter().skip(skip).collect())
    }

    async fn sub_member_transfer(
        &self,
        direction: TransferDirection,
        amount: Decimal,
        sub_member_id: &str,
    ) -> Result<(), ExchangeError> {
        if *self.fail_transfers.lock().unwrap() {
            return Err(Self::rejected("insufficient balance"));
        }
        if let Some(peer) = self.transfer_peer.lock().unwrap().as_ref() {
            let delta = match direction {
                TransferDirection::MainToSub => amount,
                TransferDirection::SubToMain => -amount,
            };
            self.shift_equity(-delta);
            peer.shift_equity(delta);
        }
        self.transfers
            .lock()
            .unwrap()
            .push((direction, amount, sub_member_id.to_string()));
        Ok(())
    }
}
