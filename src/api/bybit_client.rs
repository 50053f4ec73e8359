//! Bybit v5 REST client for one account.
//!
//! Private endpoints are signed with HMAC-SHA256 over
//! `timestamp + api_key + recv_window + payload`, where the payload is the
//! query string for GET requests and the JSON body for POST requests.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha256;
use tracing::debug;

use crate::models::{Candle, KlineInterval, Side};

use super::exchange::{
    Exchange, ExchangeError, OrderAck, OrderRequest, PositionInfo, TransferDirection, CATEGORY,
};
use super::types::*;

type HmacSha256 = Hmac<Sha256>;

pub const MAINNET_URL: &str = "https://api.bybit.com";
pub const TESTNET_URL: &str = "https://api-testnet.bybit.com";

const RECV_WINDOW: u64 = 5000;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const SETTLE_COIN: &str = "USDT";

/// Keyed by the sub member id alone, so the main account UID is not needed.
const SUB_MEMBER_TRANSFER_PATH: &str = "/asset/v3/private/transfer/sub-member-transfer";

/// Signed client bound to a single API key pair.
pub struct BybitClient {
    http: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl BybitClient {
    pub fn new(base_url: &str, api_key: &str, api_secret: &str) -> Result<Self, ExchangeError> {
        let http = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        })
    }

    fn timestamp() -> i64 {
        Utc::now().timestamp_millis()
    }

    fn sign(&self, timestamp: i64, payload: &str) -> Result<String, ExchangeError> {
        let prehash = format!("{}{}{}{}", timestamp, self.api_key, RECV_WINDOW, payload);

        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| ExchangeError::Decode(format!("invalid api secret: {e}")))?;
        mac.update(prehash.as_bytes());

        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn query_string(params: &[(&str, String)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Signed GET. Public endpoints accept the extra headers too.
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ExchangeError> {
        let query = Self::query_string(params);
        let timestamp = Self::timestamp();
        let signature = self.sign(timestamp, &query)?;
        let url = format!("{}{}?{}", self.base_url, path, query);

        debug!(url = %url, "GET");

        let response = self
            .http
            .get(&url)
            .header("X-BAPI-API-KEY", &self.api_key)
            .header("X-BAPI-TIMESTAMP", timestamp.to_string())
            .header("X-BAPI-RECV-WINDOW", RECV_WINDOW.to_string())
            .header("X-BAPI-SIGN", signature)
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ExchangeError> {
        let body = serde_json::to_string(body).map_err(|e| ExchangeError::Decode(e.to_string()))?;
        let timestamp = Self::timestamp();
        let signature = self.sign(timestamp, &body)?;
        let url = format!("{}{}", self.base_url, path);

        debug!(url = %url, body = %body, "POST");

        let response = self
            .http
            .post(&url)
            .header("X-BAPI-API-KEY", &self.api_key)
            .header("X-BAPI-TIMESTAMP", timestamp.to_string())
            .header("X-BAPI-RECV-WINDOW", RECV_WINDOW.to_string())
            .header("X-BAPI-SIGN", signature)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ExchangeError> {
        let status = response.status();
        let text = response.text().await?;

        let envelope: ApiResponse = serde_json::from_str(&text)
            .map_err(|e| ExchangeError::Decode(format!("{status}: {e}: {text}")))?;

        if envelope.ret_code != 0 {
            return Err(ExchangeError::Api {
                code: envelope.ret_code,
                message: envelope.ret_msg,
            });
        }

        serde_json::from_value(envelope.result).map_err(|e| ExchangeError::Decode(e.to_string()))
    }

    fn parse_kline_row(row: &[String]) -> Result<Candle, ExchangeError> {
        if row.len() < 5 {
            return Err(ExchangeError::Decode(format!("short kline row: {row:?}")));
        }

        let number = |i: usize| -> Result<Decimal, ExchangeError> {
            match row.get(i) {
                Some(raw) => Decimal::from_str(raw)
                    .map_err(|e| ExchangeError::Decode(format!("kline field {i}: {e}"))),
                None => Ok(Decimal::ZERO),
            }
        };

        let start_ms: i64 = row[0]
            .parse()
            .map_err(|_| ExchangeError::Decode(format!("kline start time: {}", row[0])))?;
        let open_time = Utc
            .timestamp_millis_opt(start_ms)
            .single()
            .ok_or_else(|| ExchangeError::Decode(format!("kline start time: {start_ms}")))?;

        Ok(Candle {
            open_time,
            open: number(1)?,
            high: number(2)?,
            low: number(3)?,
            close: number(4)?,
            volume: number(5)?,
            turnover: number(6)?,
        })
    }
}

#[async_trait]
impl Exchange for BybitClient {
    async fn usdt_equity(&self) -> Result<Decimal, ExchangeError> {
        let result: WalletBalanceResult = self
            .get(
                "/v5/account/wallet-balance",
                &[("accountType", "UNIFIED".to_string())],
            )
            .await?;

        let account = result
            .list
            .into_iter()
            .next()
            .ok_or(ExchangeError::MissingData("wallet account"))?;

        Ok(account
            .coin
            .into_iter()
            .find(|c| c.coin == SETTLE_COIN)
            .map(|c| c.equity)
            .unwrap_or(Decimal::ZERO))
    }

    async fn positions(&self, symbol: &str) -> Result<Vec<PositionInfo>, ExchangeError> {
        let result: PositionListResult = self
            .get(
                "/v5/position/list",
                &[
                    ("category", CATEGORY.to_string()),
                    ("symbol", symbol.to_string()),
                ],
            )
            .await?;

        Ok(result
            .list
            .into_iter()
            .map(|p| PositionInfo {
                side: Side::from_exchange(&p.side),
                symbol: p.symbol,
                size: p.size,
                unrealised_pnl: p.unrealised_pnl,
            })
            .collect())
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck, ExchangeError> {
        let result: OrderCreateResult = self.post("/v5/order/create", order).await?;

        Ok(OrderAck {
            order_id: result.order_id,
            order_link_id: result.order_link_id,
        })
    }

    async fn tick_size(&self, symbol: &str) -> Result<Decimal, ExchangeError> {
        let result: InstrumentsResult = self
            .get(
                "/v5/market/instruments-info",
                &[
                    ("category", CATEGORY.to_string()),
                    ("symbol", symbol.to_string()),
                ],
            )
            .await?;

        result
            .list
            .into_iter()
            .next()
            .map(|i| i.price_filter.tick_size)
            .ok_or(ExchangeError::MissingData("instrument price filter"))
    }

    async fn klines(
        &self,
        symbol: &str,
        interval: KlineInterval,
        limit: u32,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let result: KlineResult = self
            .get(
                "/v5/market/kline",
                &[
                    ("category", CATEGORY.to_string()),
                    ("symbol", symbol.to_string()),
                    ("interval", interval.as_str().to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        let mut candles = result
            .list
            .iter()
            .map(|row| Self::parse_kline_row(row))
            .collect::<Result<Vec<_>, _>>()?;

        // Newest first on the wire
        candles.reverse();
        Ok(candles)
    }

    async fn sub_member_transfer(
        &self,
        direction: TransferDirection,
        amount: Decimal,
        sub_member_id: &str,
    ) -> Result<(), ExchangeError> {
        let request = transfer_request(direction, amount, sub_member_id);
        let _: serde_json::Value = self
            .post(SUB_MEMBER_TRANSFER_PATH, &request)
            .await?;
        Ok(())
    }
}

/// `IN` moves funds into the sub account, `OUT` back to the main account.
fn transfer_request(
    direction: TransferDirection,
    amount: Decimal,
    sub_member_id: &str,
) -> SubMemberTransferRequest {
    SubMemberTransferRequest {
        transfer_id: uuid::Uuid::new_v4().to_string(),
        coin: SETTLE_COIN.to_string(),
        amount: amount.to_string(),
        sub_member_id: sub_member_id.to_string(),
        transfer_type: match direction {
            TransferDirection::MainToSub => "IN",
            TransferDirection::SubToMain => "OUT",
        }
        .to_string(),
    }
}
