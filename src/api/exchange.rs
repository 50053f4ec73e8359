//! Exchange capability used by the trading core and the strategies.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{Account, Candle, KlineInterval, Side};

/// Failure of a call to the exchange.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The exchange answered with a non-zero return code.
    #[error("exchange rejected request ({code}): {message}")]
    Api { code: i64, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("response is missing {0}")]
    MissingData(&'static str),
}

/// Product category traded: USDT-margined perpetuals.
pub const CATEGORY: &str = "linear";

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderType {
    Market,
    Limit,
}

/// Time in force for resting orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimeInForce {
    #[serde(rename = "GTC")]
    GoodTillCancel,
}

/// Order submission body, serialized in the exchange's wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub category: String,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub qty: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_in_force: Option<TimeInForce>,
    #[serde(skip_serializing_if = "is_false")]
    pub reduce_only: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub close_on_trigger: bool,
    /// One-way position mode.
    pub position_idx: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_link_id: Option<String>,
}

impl OrderRequest {
    /// Market order that may open or add to a position.
    pub fn market(symbol: &str, side: Side, qty: Decimal) -> Self {
        Self {
            category: CATEGORY.to_string(),
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Market,
            qty,
            price: None,
            time_in_force: None,
            reduce_only: false,
            close_on_trigger: false,
            position_idx: 0,
            order_link_id: None,
        }
    }

    /// Market order that can only shrink an existing position.
    pub fn reduce_only_market(symbol: &str, side: Side, qty: Decimal) -> Self {
        Self {
            reduce_only: true,
            ..Self::market(symbol, side, qty)
        }
    }

    /// Resting good-till-cancelled limit order that closes a position when hit.
    pub fn protective_limit(symbol: &str, side: Side, qty: Decimal, price: Decimal) -> Self {
        Self {
            order_type: OrderType::Limit,
            price: Some(price),
            time_in_force: Some(TimeInForce::GoodTillCancel),
            reduce_only: true,
            close_on_trigger: true,
            order_link_id: Some(uuid::Uuid::new_v4().to_string()),
            ..Self::market(symbol, side, qty)
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Acknowledgement of an accepted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAck {
    pub order_id: String,
    pub order_link_id: String,
}

/// An open (or flat) position on one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionInfo {
    pub symbol: String,
    /// `None` when the position is flat.
    pub side: Option<Side>,
    pub size: Decimal,
    pub unrealised_pnl: Decimal,
}

/// Direction of an internal transfer between the two accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    MainToSub,
    SubToMain,
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransferDirection::MainToSub => "MAIN_SUB",
            TransferDirection::SubToMain => "SUB_MAIN",
        })
    }
}

/// Everything the bot needs from an exchange account.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// USDT equity of the unified trading account.
    async fn usdt_equity(&self) -> Result<Decimal, ExchangeError>;

    /// Positions held on `symbol`.
    async fn positions(&self, symbol: &str) -> Result<Vec<PositionInfo>, ExchangeError>;

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck, ExchangeError>;

    /// Minimum price increment of `symbol`.
    async fn tick_size(&self, symbol: &str) -> Result<Decimal, ExchangeError>;

    /// Most recent `limit` candles, oldest first.
    async fn klines(
        &self,
        symbol: &str,
        interval: KlineInterval,
        limit: u32,
    ) -> Result<Vec<Candle>, ExchangeError>;

    /// Move USDT between the main account and the sub account `sub_member_id`.
    /// Must be called with the main account's credentials.
    async fn sub_member_transfer(
        &self,
        direction: TransferDirection,
        amount: Decimal,
        sub_member_id: &str,
    ) -> Result<(), ExchangeError>;
}

/// The main and sub account clients.
#[derive(Clone)]
pub struct AccountPair {
    pub main: Arc<dyn Exchange>,
    pub sub: Arc<dyn Exchange>,
}

impl AccountPair {
    pub fn new(main: Arc<dyn Exchange>, sub: Arc<dyn Exchange>) -> Self {
        Self { main, sub }
    }

    pub fn get(&self, account: Account) -> &Arc<dyn Exchange> {
        match account {
            Account::Main => &self.main,
            Account::Sub => &self.sub,
        }
    }
}
