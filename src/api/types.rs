//! Response types for the Bybit v5 REST API.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Common response envelope. `result` is decoded separately once `ret_code`
/// is known to be zero, since error responses carry an empty object.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub ret_code: i64,
    #[serde(default)]
    pub ret_msg: String,
    #[serde(default)]
    pub result: serde_json::Value,
}

/// Result of /v5/account/wallet-balance.
#[derive(Debug, Clone, Deserialize)]
pub struct WalletBalanceResult {
    pub list: Vec<WalletAccount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletAccount {
    #[serde(default)]
    pub coin: Vec<CoinBalance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinBalance {
    pub coin: String,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub equity: Decimal,
}

/// Result of /v5/position/list.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionListResult {
    pub list: Vec<PositionItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionItem {
    pub symbol: String,
    #[serde(default)]
    pub side: String,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub size: Decimal,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub unrealised_pnl: Decimal,
}

/// Result of /v5/order/create.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreateResult {
    pub order_id: String,
    #[serde(default)]
    pub order_link_id: String,
}

/// Result of /v5/market/instruments-info.
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentsResult {
    pub list: Vec<InstrumentItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentItem {
    pub price_filter: PriceFilter,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceFilter {
    #[serde(deserialize_with = "decimal_or_zero")]
    pub tick_size: Decimal,
}

/// Result of /v5/market/kline. Rows are
/// `[startTime, open, high, low, close, volume, turnover]`, newest first.
#[derive(Debug, Clone, Deserialize)]
pub struct KlineResult {
    pub list: Vec<Vec<String>>,
}

/// Body of the sub-member transfer request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubMemberTransferRequest {
    pub transfer_id: String,
    pub coin: String,
    pub amount: String,
    pub sub_member_id: String,
    /// `IN` moves funds into the sub account, `OUT` back to the main account.
    #[serde(rename = "type")]
    pub transfer_type: String,
}

/// Numeric fields arrive as strings and are empty when unset.
fn decimal_or_zero<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if raw.trim().is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(raw.trim())
        .or_else(|_| Decimal::from_scientific(raw.trim()))
        .map_err(serde::de::Error::custom)
}
